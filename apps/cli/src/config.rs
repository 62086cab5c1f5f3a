// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI configuration loaded from environment variables.

use anyhow::{Context, Result};
use geartrain_lite_mechanics::EngineConfig;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,geartrain_lite_mechanics=debug";

/// Environment-level settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine tolerance overrides (JSON file), from `GEARTRAIN_CONFIG`.
    pub engine_config_path: Option<String>,
    /// Log filter directive.
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            engine_config_path: std::env::var("GEARTRAIN_CONFIG")
                .ok()
                .filter(|p| !p.is_empty()),
            log_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        }
    }

    /// Engine settings, reading `override_path` in preference to the environment.
    pub fn engine_config(&self, override_path: Option<&str>) -> Result<EngineConfig> {
        match override_path.or(self.engine_config_path.as_deref()) {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path))?;
                EngineConfig::from_json(&json).with_context(|| format!("parsing config {}", path))
            }
            None => Ok(EngineConfig::default()),
        }
    }
}
