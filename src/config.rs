// Configuration loader - some methods reserved for future use
#![allow(dead_code)]

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::ApiLevel;

/// Configuration for apilevels lookups
///
/// Every field is optional; CLI flags override config values, and SDK
/// discovery fills in whatever is still missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Android SDK root to discover the API description under
    pub sdk_root: Option<PathBuf>,

    /// Explicit api-versions.xml path (overrides SDK discovery)
    pub api_file: Option<PathBuf>,

    /// Directory for binary caches; caching is disabled without it
    pub cache_dir: Option<PathBuf>,

    /// Target platform API level
    pub platform: Option<ApiLevel>,
}

impl ApiConfig {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try TOML first, then YAML
                if let Ok(config) = toml::from_str(&contents) {
                    Ok(config)
                } else {
                    serde_yaml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(dir: &Path) -> Result<Self> {
        let default_names = [
            "apilevels.toml",
            ".apilevels.toml",
            "apilevels.yaml",
            ".apilevels.yaml",
            ".apilevels.yml",
        ];

        for name in &default_names {
            let path = dir.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }
}
