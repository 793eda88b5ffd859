//! Map view: camera handling and the marker scene handed to the tile renderer.
//!
//! The browser side only draws what this module derives. Marker styling comes
//! from [`crate::marker`], icon geometry and tiles from an explicit
//! [`MapConfig`].

use serde::Serialize;

use crate::marker::{self, IconKind};
use crate::model::{CityPayload, Coordinate};

/// CartoDB light tiles.
pub const DEFAULT_TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";

pub const DEFAULT_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors &copy; CARTO";

/// Used until a payload provides a city center.
pub const FALLBACK_CENTER: Coordinate = Coordinate::new(20.5937, 78.9629);

pub const DEFAULT_ZOOM: u8 = 13;

/// Geometry of the dot-plus-label marker icon.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerIconConfig {
    /// Width and height of the icon box. Wide enough for the label.
    pub size: [u32; 2],
    /// Anchor at the center of the dot, not the label.
    pub anchor: [i32; 2],
    pub popup_anchor: [i32; 2],
    /// Class applied to the icon container, empty of default styles.
    pub class_name: String,
}

impl Default for MarkerIconConfig {
    fn default() -> Self {
        Self {
            size: [120, 24],
            anchor: [10, 12],
            popup_anchor: [0, -12],
            class_name: "custom-icon-container".to_string(),
        }
    }
}

/// Map rendering configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    pub zoom: u8,
    pub fallback_center: Coordinate,
    pub marker_icon: MarkerIconConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            zoom: DEFAULT_ZOOM,
            fallback_center: FALLBACK_CENTER,
            marker_icon: MarkerIconConfig::default(),
        }
    }
}

/// Instruction to move the map camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraMove {
    pub center: Coordinate,
    pub zoom: u8,
}

/// Popup content shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPopup {
    pub icon: IconKind,
    pub glyph: &'static str,
    pub location_name: String,
    pub description: String,
}

/// A report ready to plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    /// Stable identity: the report's index in `map_markers`.
    pub key: usize,
    pub position: Coordinate,
    pub color: &'static str,
    pub label: String,
    pub icon: IconKind,
    /// Dot plus label markup for a div icon.
    pub icon_html: String,
    pub popup: MarkerPopup,
}

/// Everything the page needs to draw the map.
#[derive(Debug, Clone, Serialize)]
pub struct MapScene {
    pub center: Coordinate,
    pub zoom: u8,
    /// Present only when the center changed since the last render.
    pub camera: Option<CameraMove>,
    pub markers: Vec<MapMarker>,
}

/// Per-dashboard map state.
///
/// Remembers the last center it moved to so that the camera is recentered
/// once per distinct center, not on every render.
#[derive(Debug, Clone)]
pub struct MapView {
    config: MapConfig,
    last_center: Option<Coordinate>,
}

impl MapView {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            last_center: None,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Returns a camera move when `center` differs from the last one seen.
    pub fn recenter(&mut self, center: Option<Coordinate>) -> Option<CameraMove> {
        let center = center?;
        if self.last_center == Some(center) {
            return None;
        }
        self.last_center = Some(center);
        Some(CameraMove {
            center,
            zoom: self.config.zoom,
        })
    }

    /// Derive the scene for the current payload.
    pub fn render(&mut self, payload: Option<&CityPayload>) -> MapScene {
        let center = payload.and_then(|p| p.city_center);
        let camera = self.recenter(center);

        MapScene {
            center: center.unwrap_or(self.config.fallback_center),
            zoom: self.config.zoom,
            camera,
            markers: payload.map(markers).unwrap_or_default(),
        }
    }
}

/// Plot-ready markers for a payload. Reports without usable coordinates are
/// skipped; the rest keep their original index as key.
pub fn markers(payload: &CityPayload) -> Vec<MapMarker> {
    payload
        .map_markers
        .iter()
        .enumerate()
        .filter_map(|(key, report)| {
            let position = report.position()?;
            let style = marker::present(report);
            Some(MapMarker {
                key,
                position,
                color: style.color,
                icon_html: icon_html(style.color, &style.label),
                label: style.label,
                icon: style.icon,
                popup: MarkerPopup {
                    icon: style.icon,
                    glyph: style.icon.glyph(),
                    location_name: report.location_name.clone().unwrap_or_default(),
                    description: report.description.clone().unwrap_or_default(),
                },
            })
        })
        .collect()
}

/// Markup for the colored dot with its white label pill.
pub fn icon_html(color: &str, label: &str) -> String {
    format!(
        concat!(
            r#"<div style="display:flex;align-items:center;width:120px;">"#,
            r#"<div style="background-color:{color};width:20px;height:20px;border-radius:50%;"#,
            r#"border:2px solid white;box-shadow:0 0 10px {color};z-index:10;flex-shrink:0;"></div>"#,
            r#"<span style="background-color:white;color:#334155;padding:2px 6px 2px 12px;"#,
            r#"border-radius:4px;font-size:11px;font-weight:700;margin-left:-8px;"#,
            r#"box-shadow:0 2px 4px rgba(0,0,0,0.1);border:1px solid #e2e8f0;white-space:nowrap;">"#,
            "{label}</span></div>"
        ),
        color = color,
        label = escape_html(label),
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
