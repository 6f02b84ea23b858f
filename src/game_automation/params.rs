//! Run parameters: tunables pulled from a provider and frozen into a snapshot
//! at the top of every loop iteration.

use super::match_image::clamp01;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_THR_MAIN: f32 = 0.76;
pub const DEFAULT_THR_TAG: f32 = 0.77;
pub const DEFAULT_THR_SKIP_COLOR: f32 = 0.64;
pub const DEFAULT_SLEEP_BASE: f64 = 0.03;
pub const DEFAULT_SLEEP_FAST: f64 = 0.02;
pub const DEFAULT_ROUTE_LEFT_RATIO: f64 = 0.56;
pub const DEFAULT_EVENT_PRIORITY: [&str; 7] = [
    "event_boss",
    "event_risky",
    "event_battle",
    "event_support",
    "event_shop",
    "event_event",
    "event_unknown",
];

/// Shortest sleep the loop will accept, in seconds
const MIN_SLEEP: f64 = 0.006;

/// A raw parameter value as it arrives from a config file or GUI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

pub type ParamMap = HashMap<String, ParamValue>;

/// Anything that can hand the bot a fresh parameter map.
pub trait ParamProvider {
    fn snapshot(&self) -> ParamMap;
}

impl<F> ParamProvider for F
where
    F: Fn() -> ParamMap,
{
    fn snapshot(&self) -> ParamMap {
        self()
    }
}

/// Validated, immutable parameter snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub thr_main: f32,
    pub thr_tag: f32,
    pub thr_skip_color: f32,
    pub sleep_base: Duration,
    pub sleep_fast: Duration,
    pub route_left_ratio: f64,
    pub event_priority: Vec<String>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            thr_main: DEFAULT_THR_MAIN,
            thr_tag: DEFAULT_THR_TAG,
            thr_skip_color: DEFAULT_THR_SKIP_COLOR,
            sleep_base: Duration::from_secs_f64(DEFAULT_SLEEP_BASE),
            sleep_fast: Duration::from_secs_f64(DEFAULT_SLEEP_FAST),
            route_left_ratio: DEFAULT_ROUTE_LEFT_RATIO,
            event_priority: default_priority(),
        }
    }
}

impl RunParams {
    /// Build a snapshot from a raw map. Missing keys take their defaults; bad
    /// values are logged and take their defaults too.
    pub fn from_map(map: &ParamMap) -> Self {
        let threshold = |key: &str, default: f32| clamp01(number(map, key, default as f64)) as f32;
        let sleep = |key: &str, default: f64| {
            let secs = number(map, key, default).max(MIN_SLEEP);
            Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
                log::warn!("Ignoring out of range value for '{key}': {secs}");
                Duration::from_secs_f64(default)
            })
        };

        Self {
            thr_main: threshold("thr_main", DEFAULT_THR_MAIN),
            thr_tag: threshold("thr_tag", DEFAULT_THR_TAG),
            thr_skip_color: threshold("thr_skip_color", DEFAULT_THR_SKIP_COLOR),
            sleep_base: sleep("sleep_base", DEFAULT_SLEEP_BASE),
            sleep_fast: sleep("sleep_fast", DEFAULT_SLEEP_FAST),
            route_left_ratio: clamp01(number(map, "route_left_ratio", DEFAULT_ROUTE_LEFT_RATIO)),
            event_priority: priority(map.get("event_priority")),
        }
    }

    pub fn from_provider(provider: &dyn ParamProvider) -> Self {
        Self::from_map(&provider.snapshot())
    }
}

fn default_priority() -> Vec<String> {
    DEFAULT_EVENT_PRIORITY.iter().map(|s| s.to_string()).collect()
}

fn number(map: &ParamMap, key: &str, default: f64) -> f64 {
    let parsed = match map.get(key) {
        None => return default,
        Some(ParamValue::Number(n)) => Some(*n),
        Some(ParamValue::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(n) if n.is_finite() => n,
        _ => {
            log::warn!("Ignoring unusable value for '{key}': {:?}", map.get(key));
            default
        }
    }
}

fn priority(value: Option<&ParamValue>) -> Vec<String> {
    let items: Vec<String> = match value {
        None => Vec::new(),
        Some(ParamValue::Text(s)) => s.split(',').map(str::to_string).collect(),
        Some(ParamValue::List(items)) => items.clone(),
        Some(other) => {
            log::warn!("Ignoring unusable value for 'event_priority': {other:?}");
            Vec::new()
        }
    };

    let cleaned: Vec<String> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if cleaned.is_empty() {
        default_priority()
    } else {
        cleaned
    }
}
