//! Runtime configuration, read from the environment once at startup.
//!
//! | variable | default |
//! | --- | --- |
//! | `CITYTWIN_PORT` | `3000` |
//! | `CITYTWIN_BACKEND_URL` | `http://localhost:8000` |
//! | `CITYTWIN_TILE_URL` | CartoDB light tiles |

use std::env;

use crate::client::DEFAULT_BACKEND_URL;
use crate::map::MapConfig;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend_url: String,
    pub map: MapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            map: MapConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = lookup("CITYTWIN_PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(url) = lookup("CITYTWIN_BACKEND_URL").filter(|u| !u.trim().is_empty()) {
            config.backend_url = url;
        }
        if let Some(tiles) = lookup("CITYTWIN_TILE_URL").filter(|t| !t.trim().is_empty()) {
            config.map.tile_url = tiles;
        }

        config
    }
}
