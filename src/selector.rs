//! Landing view: city selection and the transition to a dashboard.

use serde::{Deserialize, Serialize};

/// Form body of the landing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CitySelection {
    #[serde(default)]
    pub city: String,
}

/// Which top-level view is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum View {
    #[default]
    Landing,
    Dashboard { city_name: String },
}

impl View {
    /// Submit the landing form. Blank input leaves the view unchanged.
    pub fn submit(self, input: &str) -> Self {
        match select_city(input) {
            Some(city_name) => View::Dashboard { city_name },
            None => self,
        }
    }
}

/// The city to open, or `None` when the input is blank.
///
/// Surrounding whitespace is dropped from the returned name.
pub fn select_city(input: &str) -> Option<String> {
    let city = input.trim();
    (!city.is_empty()).then(|| city.to_string())
}
