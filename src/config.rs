//! JSON configuration file
//!
//! One file feeds both the CLI settings (window title, template directory,
//! debug) and the run parameters. The parameter part is re-read on every
//! loop iteration, so edits apply while the bot runs.

use crate::game_automation::params::{
    DEFAULT_SLEEP_BASE, DEFAULT_SLEEP_FAST, ParamMap, ParamProvider, ParamValue,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TEMPLATES_DIR: &str = "./templates";

/// Sleep multiplier applied when `low_power` is set
const LOW_POWER_FACTOR: f64 = 1.5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {description}", path.display())]
    Read { path: PathBuf, description: String },

    #[error("Invalid config {}: {description}", path.display())]
    Parse { path: PathBuf, description: String },
}

/// `~/.maze-runner/config.json`, when a home directory can be determined
pub fn default_config_path() -> Option<PathBuf> {
    homedir::my_home()
        .ok()
        .flatten()
        .map(|home| home.join(".maze-runner").join("config.json"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    #[serde(default)]
    pub debug: bool,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            description: e.to_string(),
        })
    }

    /// Like `load`, but a missing file is simply the default config and a
    /// broken one is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("{e}, using defaults");
            Self::default()
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        description: e.to_string(),
    })
}

/// Read the parameter map from a config file. Values that are not
/// parameters (objects, nulls, mixed lists) are left out.
pub fn read_params(path: &Path) -> Result<ParamMap, ConfigError> {
    let text = read(path)?;
    let root: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            description: e.to_string(),
        })?;

    let mut params: ParamMap = root
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<ParamValue>(value)
                .ok()
                .map(|v| (key, v))
        })
        .collect();

    if params.get("low_power") == Some(&ParamValue::Flag(true)) {
        apply_low_power(&mut params);
    }
    Ok(params)
}

fn apply_low_power(params: &mut ParamMap) {
    for (key, default) in [("sleep_base", DEFAULT_SLEEP_BASE), ("sleep_fast", DEFAULT_SLEEP_FAST)] {
        let current = match params.get(key) {
            None => Some(default),
            Some(ParamValue::Number(n)) => Some(*n),
            Some(ParamValue::Text(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        // Unusable values are left for RunParams to report
        if let Some(value) = current {
            params.insert(key.to_string(), ParamValue::Number(value * LOW_POWER_FACTOR));
        }
    }
}

/// Parameter provider backed by a JSON file. A missing or broken file
/// yields an empty map, i.e. all defaults.
#[derive(Debug, Clone)]
pub struct JsonConfigProvider {
    path: PathBuf,
}

impl JsonConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParamProvider for JsonConfigProvider {
    fn snapshot(&self) -> ParamMap {
        if !self.path.exists() {
            return ParamMap::new();
        }
        read_params(&self.path).unwrap_or_else(|e| {
            // Re-read every iteration, so keep this quiet
            log::debug!("{e}");
            ParamMap::new()
        })
    }
}
