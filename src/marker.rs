//! Marker presentation: turns a [`Report`] into its map annotation.
//!
//! The mapping is pure and total. Every report, however malformed, resolves
//! to a color, a short label and an icon kind.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Category, CategoryKind, Report};

/// Marker color for positive reports.
pub const POSITIVE_COLOR: &str = "#10b981";

/// Marker color for everything else.
pub const ALERT_COLOR: &str = "#ef4444";

/// Label used when a report has no category.
pub const FALLBACK_LABEL: &str = "Report";

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("static pattern compiles"));

/// Icon drawn in the marker popup and the recent issues feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    Droplet,
    Bolt,
    Leaf,
    Wind,
    CloudRain,
    GenericAlert,
}

impl IconKind {
    pub fn for_category(category: Option<&Category>) -> Self {
        match category.map(Category::kind) {
            Some(CategoryKind::Water) => IconKind::Droplet,
            Some(CategoryKind::Energy) => IconKind::Bolt,
            Some(CategoryKind::Ecology) | Some(CategoryKind::Tree) => IconKind::Leaf,
            Some(CategoryKind::Air) => IconKind::Wind,
            Some(CategoryKind::Rain) => IconKind::CloudRain,
            Some(CategoryKind::Other) | None => IconKind::GenericAlert,
        }
    }

    /// A text glyph for renderers without an icon font.
    pub fn glyph(&self) -> &'static str {
        match self {
            IconKind::Droplet => "💧",
            IconKind::Bolt => "⚡",
            IconKind::Leaf => "🍃",
            IconKind::Wind => "💨",
            IconKind::CloudRain => "🌧",
            IconKind::GenericAlert => "⚠",
        }
    }
}

/// How a report is drawn on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub label: String,
    pub icon: IconKind,
}

/// Derive the marker style for a report.
pub fn present(report: &Report) -> MarkerStyle {
    let category = report.category.as_ref();
    MarkerStyle {
        color: color_for(report),
        label: label_for(category, report.description.as_deref()),
        icon: IconKind::for_category(category),
    }
}

pub fn color_for(report: &Report) -> &'static str {
    if report.sentiment.is_positive() {
        POSITIVE_COLOR
    } else {
        ALERT_COLOR
    }
}

/// Short tag shown next to the marker dot.
///
/// Air readings pull the first integer out of the description
/// (`"AQI is 123 today"` becomes `"AQI 123"`).
pub fn label_for(category: Option<&Category>, description: Option<&str>) -> String {
    let Some(category) = category else {
        return FALLBACK_LABEL.to_string();
    };

    match category.kind() {
        CategoryKind::Air => match description.and_then(first_integer) {
            Some(digits) => format!("AQI {digits}"),
            None => "AQI".to_string(),
        },
        CategoryKind::Rain => "Rain".to_string(),
        CategoryKind::Water => "Water Lvl".to_string(),
        CategoryKind::Ecology => "Soil Health".to_string(),
        CategoryKind::Energy | CategoryKind::Tree | CategoryKind::Other => {
            capitalize_first(category.as_str())
        }
    }
}

/// First run of ASCII digits in `text`.
pub fn first_integer(text: &str) -> Option<&str> {
    FIRST_INTEGER.find(text).map(|m| m.as_str())
}

/// Upper-case the first character, leave the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
