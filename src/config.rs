//! Application configuration.
//!
//! Settings are layered with figment: built-in defaults, then
//! `/etc/dumpship/config.toml`, then `DUMPSHIP_*` environment variables,
//! then command-line overrides.

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_PATH: &str = "/etc/dumpship/config.toml";

/// Default path scanned for the appliance system UUID.
pub const DEFAULT_APPLIANCE_CONF: &str = "/etc/dumpship/appliance.conf";

/// Regional upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Americas,
    Emea,
}

impl Region {
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Americas => "https://upload.us.support.example.com/diagnostics",
            Region::Emea => "https://upload.eu.support.example.com/diagnostics",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which regional endpoint to upload to
    pub region: Region,
    /// Explicit endpoint URL, overriding the regional default
    pub endpoint_url: Option<String>,
    /// Maximum part size, as a size string ("512m", "1g", bare bytes)
    pub chunk_size: String,
    /// Free-space safety multiplier for the pre-split disk check
    pub space_multiplier: u64,
    /// Abort remaining uploads after the first per-artifact failure
    pub abort_on_upload_error: bool,
    /// File scanned for the appliance system UUID
    pub appliance_conf: PathBuf,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: Region::Americas,
            endpoint_url: None,
            chunk_size: "512m".to_string(),
            space_multiplier: 3,
            abort_on_upload_error: false,
            appliance_conf: PathBuf::from(DEFAULT_APPLIANCE_CONF),
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration, layering defaults, the config file, environment
    /// variables and (highest precedence) serialized CLI overrides.
    pub fn new<T: Serialize>(cli_overrides: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_PATH))
            .merge(Env::prefixed("DUMPSHIP_"));

        if let Some(overrides) = cli_overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().context("Failed to load configuration")
    }

    /// Resolved upload base URL for this run.
    pub fn base_url(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.region.base_url().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.chunk_size, "512m");
        assert_eq!(config.space_multiplier, 3);
        assert_eq!(config.region, Region::Americas);
        assert!(!config.abort_on_upload_error);
    }

    #[test]
    fn endpoint_override_wins_over_region() {
        let config = AppConfig {
            endpoint_url: Some("https://lab.example.com/up/".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.base_url(), "https://lab.example.com/up");
    }

    #[test]
    fn region_urls_differ() {
        assert_ne!(Region::Americas.base_url(), Region::Emea.base_url());
    }

    #[test]
    fn cli_overrides_take_precedence() {
        #[derive(Serialize)]
        struct Overrides {
            space_multiplier: u64,
        }
        let config = AppConfig::new(Some(&Overrides {
            space_multiplier: 5,
        }))
        .unwrap();
        assert_eq!(config.space_multiplier, 5);
    }
}
