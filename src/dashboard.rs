//! Dashboard panels and the snapshot served to the page.
//!
//! Each panel is derived from whatever part of the payload is present. Missing
//! data renders as "N/A", zero, or an empty-state message, never as an error.
//!
//! # Usage
//!
//! ```ignore
//! let view = session.view().await;
//! let snapshot = DashboardSnapshot::build(view, &mut map_view);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::map::{MapScene, MapView};
use crate::marker::{IconKind, capitalize_first};
use crate::model::{ChatMessage, CitizenStats, CityPayload, GovData, Report};
use crate::session::{SessionState, SessionView};

/// Shown in place of an AQI value when none is available.
pub const NOT_AVAILABLE: &str = "N/A";

/// Empty state of the government data card.
pub const NO_GOV_DATA_MESSAGE: &str = "No government data available for this city";

/// How many recent issues the feed shows.
pub const RECENT_ISSUES_LIMIT: usize = 5;

/// Top bar summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderStats {
    pub title: String,
    pub aqi: String,
    pub total_reports: u64,
}

impl HeaderStats {
    pub fn new(city: &str, payload: Option<&CityPayload>) -> Self {
        let aqi = payload
            .and_then(|p| p.gov_data.as_ref())
            .and_then(|g| g.aqi.as_ref())
            .and_then(|a| a.value.as_ref())
            .filter(|v| !v.is_blank())
            .map(ToString::to_string)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            title: format!("{city} Ecosystem Twin"),
            aqi,
            total_reports: total_reports(payload),
        }
    }
}

/// Air quality card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiCard {
    pub value: String,
    /// `"<pollutant> at <station>"`
    pub caption: String,
}

/// Government data card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovDataPanel {
    pub aqi: Option<AqiCard>,
    pub rainfall_available: bool,
    pub power_active: bool,
    pub empty_message: Option<&'static str>,
}

impl GovDataPanel {
    pub fn new(gov: Option<&GovData>) -> Self {
        let Some(gov) = gov.filter(|g| !g.is_empty()) else {
            return Self {
                aqi: None,
                rainfall_available: false,
                power_active: false,
                empty_message: Some(NO_GOV_DATA_MESSAGE),
            };
        };

        let aqi = gov.aqi.as_ref().map(|a| AqiCard {
            value: a.value.as_ref().map(ToString::to_string).unwrap_or_default(),
            caption: format!(
                "{} at {}",
                a.pollutant.as_deref().unwrap_or_default(),
                a.station.as_deref().unwrap_or_default()
            ),
        });

        Self {
            aqi,
            rainfall_available: gov.has_rainfall(),
            power_active: gov.has_power(),
            empty_message: None,
        }
    }
}

/// One row of the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Citizen reports card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitizenPanel {
    pub total_reports: u64,
    /// Empty when the backend sent no breakdown.
    pub breakdown: Vec<CategoryCount>,
}

impl CitizenPanel {
    pub fn new(stats: Option<&CitizenStats>) -> Self {
        let breakdown = stats
            .map(|s| {
                s.category_breakdown
                    .iter()
                    .map(|(category, count)| CategoryCount {
                        category: capitalize_first(category),
                        count: *count,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total_reports: stats.map(|s| s.total_reports).unwrap_or(0),
            breakdown,
        }
    }
}

/// One entry of the recent issues feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueCard {
    pub category: String,
    pub icon: IconKind,
    pub glyph: &'static str,
    pub description: String,
    pub location_name: String,
}

impl From<&Report> for IssueCard {
    fn from(report: &Report) -> Self {
        let icon = IconKind::for_category(report.category.as_ref());
        Self {
            category: report
                .category
                .as_ref()
                .map(|c| capitalize_first(c.as_str()))
                .unwrap_or_default(),
            icon,
            glyph: icon.glyph(),
            description: report.description.clone().unwrap_or_default(),
            location_name: report.location_name.clone().unwrap_or_default(),
        }
    }
}

/// Recent issues, most recent first, capped at [`RECENT_ISSUES_LIMIT`].
pub fn recent_issues(payload: Option<&CityPayload>) -> Vec<IssueCard> {
    payload
        .map(|p| {
            p.recent_issues
                .iter()
                .take(RECENT_ISSUES_LIMIT)
                .map(IssueCard::from)
                .collect()
        })
        .unwrap_or_default()
}

fn total_reports(payload: Option<&CityPayload>) -> u64 {
    payload
        .and_then(|p| p.citizen_stats.as_ref())
        .map(|s| s.total_reports)
        .unwrap_or(0)
}

/// Everything the dashboard page renders, in one response.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// When this snapshot was generated.
    pub timestamp: DateTime<Utc>,
    pub city: String,
    pub state: SessionState,
    /// True while the loading screen should be shown.
    pub loading: bool,
    pub header: HeaderStats,
    pub gov_data: GovDataPanel,
    pub citizen_reports: CitizenPanel,
    pub recent_issues: Vec<IssueCard>,
    pub map: MapScene,
    pub transcript: Vec<ChatMessage>,
    pub chat_loading: bool,
}

impl DashboardSnapshot {
    /// Derive all panels from a session view.
    ///
    /// Takes the map view mutably: rendering may consume a pending camera move.
    pub fn build(view: SessionView, map: &mut MapView) -> Self {
        let payload = view.data.as_ref();

        Self {
            timestamp: Utc::now(),
            header: HeaderStats::new(&view.city, payload),
            gov_data: GovDataPanel::new(payload.and_then(|p| p.gov_data.as_ref())),
            citizen_reports: CitizenPanel::new(payload.and_then(|p| p.citizen_stats.as_ref())),
            recent_issues: recent_issues(payload),
            map: map.render(payload),
            loading: view.state.is_pending(),
            state: view.state,
            city: view.city,
            transcript: view.transcript,
            chat_loading: view.chat_loading,
        }
    }
}
