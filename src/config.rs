use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "LIFE_COACH_API_URL";

/// Main configuration structure for life_coach
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Coaching service connection
    #[serde(default)]
    pub api: ApiConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the coaching service
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while requests are in flight
    #[serde(default = "default_progress_bars")]
    pub progress_bars: bool,

    /// Output format for headless runs ("terminal" or "json")
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Terminal,
    Json,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_colorful() -> bool { true }
fn default_progress_bars() -> bool { true }
fn default_output_format() -> OutputFormat { OutputFormat::Terminal }

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url() }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colorful: default_colorful(),
            progress_bars: default_progress_bars(),
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            let expanded = shellexpand::tilde(path);
            return Self::from_file(expanded.as_ref());
        }

        let default_paths = [
            "life_coach.toml",
            ".life_coach.toml",
            "~/.config/life_coach/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Apply `LIFE_COACH_API_URL` if set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, api_url: Option<&str>, headless: bool) {
        if let Some(url) = api_url {
            self.api.base_url = url.to_string();
        }
        if headless {
            self.ui.colorful = false;
            self.ui.progress_bars = false;
        }
    }
}
