//! Data models for CityTwin.
//!
//! These types mirror the analysis backend's JSON contract. The backend is
//! loose about shapes (numbers arrive as strings, categories may be missing,
//! coordinates may be malformed), so every [`Report`] field and every payload
//! section is read through a lenient deserializer here, at the ingestion
//! boundary. Rendering code only ever sees closed enums and `Option`s.
//!
//! [`GovData`] and [`CitizenStats`] also keep the object exactly as received,
//! because it is forwarded verbatim as chat context.
//!
//! # Wire format
//!
//! ```json
//! {
//!     "city_center": [12.97, 77.59],
//!     "gov_data": { "aqi": { "value": 142, "pollutant": "PM2.5", "station": "Hebbal" } },
//!     "citizen_stats": { "total_reports": 3, "category_breakdown": { "water": 2 } },
//!     "map_markers": [ { "lat": 12.9, "lng": 77.6, "category": "air", "sentiment": "negative" } ],
//!     "recent_issues": []
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A geographic coordinate.
///
/// Serialized as a `[lat, lng]` pair, which is both what the backend sends
/// for `city_center` and what the map renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Read a coordinate from either `[lat, lng]` or `{"lat": .., "lng": ..}`.
    ///
    /// Returns `None` for anything else, including non-finite numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() == 2 => {
                Some(Self::new(finite(&items[0])?, finite(&items[1])?))
            }
            Value::Object(map) => Some(Self::new(
                finite(map.get("lat")?)?,
                finite(map.get("lng")?)?,
            )),
            _ => None,
        }
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.lat, self.lng).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("expected [lat, lng] coordinate"))
    }
}

/// Payload returned by `POST /analyze-city`.
///
/// Received once per analysis request. Every field is optional on the wire;
/// an absent section means "no data for this city", never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityPayload {
    /// Where to center the map.
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub city_center: Option<Coordinate>,

    /// Government sensor summary (AQI, rainfall, power).
    #[serde(default, deserialize_with = "lenient_object")]
    pub gov_data: Option<GovData>,

    /// Aggregate counts over citizen reports.
    #[serde(default, deserialize_with = "lenient_object")]
    pub citizen_stats: Option<CitizenStats>,

    /// Reports to plot on the map.
    #[serde(default, deserialize_with = "lenient_reports")]
    pub map_markers: Vec<Report>,

    /// Most recent reports first.
    #[serde(default, deserialize_with = "lenient_reports")]
    pub recent_issues: Vec<Report>,
}

/// Government sensor data for a city.
///
/// The typed fields are a reading of `raw`, which is the object as received.
/// Serializing a `GovData` writes `raw` back unchanged. A malformed `aqi`
/// reads as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GovData {
    pub aqi: Option<AqiReading>,
    pub rainfall: Option<Value>,
    pub power: Option<Value>,
    raw: Map<String, Value>,
}

impl From<Map<String, Value>> for GovData {
    fn from(raw: Map<String, Value>) -> Self {
        Self {
            aqi: raw
                .get("aqi")
                .filter(|v| v.is_object())
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            rainfall: raw.get("rainfall").cloned(),
            power: raw.get("power").cloned(),
            raw,
        }
    }
}

impl GovData {
    /// Whether a rainfall record is present.
    pub fn has_rainfall(&self) -> bool {
        is_present(self.rainfall.as_ref())
    }

    /// Whether a power grid record is present.
    pub fn has_power(&self) -> bool {
        is_present(self.power.as_ref())
    }

    /// True when none of the panel-relevant sections are present.
    pub fn is_empty(&self) -> bool {
        self.aqi.is_none() && !self.has_rainfall() && !self.has_power()
    }

    /// The object as the backend sent it.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl Serialize for GovData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GovData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

/// A single air quality reading.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AqiReading {
    #[serde(default)]
    pub value: Option<AqiValue>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub pollutant: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub station: Option<String>,

    /// Set by the backend when the reading is unavailable.
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

/// AQI values arrive as numbers, or as text such as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AqiValue {
    Number(serde_json::Number),
    Text(String),
}

impl AqiValue {
    /// Whether the value carries anything worth displaying.
    ///
    /// Zero and the empty string count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            AqiValue::Number(n) => n.as_f64() == Some(0.0),
            AqiValue::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for AqiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AqiValue::Number(n) => write!(f, "{n}"),
            AqiValue::Text(s) => f.write_str(s),
        }
    }
}

/// Aggregate statistics over citizen reports.
///
/// Like [`GovData`], serializes back to the object as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenStats {
    pub total_reports: u64,

    /// Count per category name. Non-integer counts are skipped.
    pub category_breakdown: BTreeMap<String, u64>,

    raw: Map<String, Value>,
}

impl CitizenStats {
    /// The object as the backend sent it.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl From<Map<String, Value>> for CitizenStats {
    fn from(raw: Map<String, Value>) -> Self {
        let category_breakdown = raw
            .get("category_breakdown")
            .and_then(Value::as_object)
            .map(|counts| {
                counts
                    .iter()
                    .filter_map(|(category, n)| Some((category.clone(), n.as_u64()?)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total_reports: raw
                .get("total_reports")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            category_breakdown,
            raw,
        }
    }
}

impl Serialize for CitizenStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CitizenStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from)
    }
}

/// A citizen- or sensor-sourced record of an urban condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub lat: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub lng: Option<f64>,

    /// `None` when the category is missing, empty, or not a string.
    #[serde(
        default,
        deserialize_with = "lenient_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Category>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_name: Option<String>,

    #[serde(default)]
    pub sentiment: Sentiment,

    /// Marker derived from government sensors rather than a citizen report.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_gov_data: bool,
}

impl Report {
    /// The plotting position, if both coordinates are usable.
    pub fn position(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lng?))
    }
}

/// Closed classification of a report category.
///
/// Matching is case-insensitive on the exact string; anything unrecognized
/// lands in [`CategoryKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// `water`
    Water,
    /// `energy`, `power`
    Energy,
    /// `ecology`
    Ecology,
    /// `tree`
    Tree,
    /// `air`, `pollution`
    Air,
    /// `rain`, `flood`
    Rain,
    /// Anything else.
    Other,
}

impl CategoryKind {
    pub fn classify(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "water" => CategoryKind::Water,
            "energy" | "power" => CategoryKind::Energy,
            "ecology" => CategoryKind::Ecology,
            "tree" => CategoryKind::Tree,
            "air" | "pollution" => CategoryKind::Air,
            "rain" | "flood" => CategoryKind::Rain,
            _ => CategoryKind::Other,
        }
    }
}

/// A report category: the string as received plus its classification.
///
/// The raw text is kept because unrecognized categories are displayed
/// verbatim (first letter capitalized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    raw: String,
    kind: CategoryKind,
}

impl Category {
    /// Parse a category. Empty strings are treated as missing.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            kind: CategoryKind::classify(raw),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Report sentiment. Only an exact `"positive"` counts as positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    /// Missing, non-string, or an unrecognized value.
    #[default]
    Unspecified,
}

impl Sentiment {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "neutral" => Sentiment::Neutral,
            _ => Sentiment::Unspecified,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Sentiment::Positive)
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Sentiment::parse(&s),
            _ => Sentiment::Unspecified,
        })
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

/// One entry of a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
        }
    }
}

/// Request body for `POST /analyze-city`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub city: String,
}

/// Request body for `POST /chat`.
///
/// `gov_data` and `citizen_stats` are forwarded as objects; `{}` when the
/// session has no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub city: String,
    pub message: String,
    pub gov_data: Value,
    pub citizen_stats: Value,
}

/// Response body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

// ============================================================================
// Lenient field readers
// ============================================================================

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(finite(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn lenient_category<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Category>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Category::parse(&s),
        _ => None,
    })
}

fn lenient_coordinate<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Coordinate>, D::Error> {
    Ok(Coordinate::from_value(&Value::deserialize(deserializer)?))
}

/// A payload section; anything but an object reads as absent.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<Map<String, Value>>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => Some(T::from(map)),
        _ => None,
    })
}

/// Non-object entries are dropped instead of failing the whole payload.
fn lenient_reports<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Report>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
