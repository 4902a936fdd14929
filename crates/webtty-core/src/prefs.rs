#![forbid(unsafe_code)]

//! Terminal preferences and adapter configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ConfigError;
use crate::fit::FitConfig;
use crate::reconcile::DEFAULT_ECHO_WINDOW;

const ACCELERATED_RENDERING_KEY: &str = "EnableAcceleratedRendering";
const LEGACY_ACCELERATED_RENDERING_KEY: &str = "EnableWebGL";
const FONT_SIZE_KEY: &str = "font-size";
const FONT_FAMILY_KEY: &str = "font-family";

/// Overlay timeout used for dimension reports.
pub const DEFAULT_OVERLAY_TIMEOUT: Duration = Duration::from_millis(2000);

/// Bound on bytes queued before an outbound sink is registered.
pub const DEFAULT_MAX_PENDING_OUTBOUND: usize = 4096;

/// Static adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdapterConfig {
    pub overlay_timeout: Duration,
    /// Maximum number of queued chunks; the oldest is dropped beyond it.
    pub max_pending_outbound: usize,
    /// How long an emitted unit absorbs echoes from other input channels.
    pub echo_window: Duration,
    pub fit: FitConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            overlay_timeout: DEFAULT_OVERLAY_TIMEOUT,
            max_pending_outbound: DEFAULT_MAX_PENDING_OUTBOUND,
            echo_window: DEFAULT_ECHO_WINDOW,
            fit: FitConfig::default(),
        }
    }
}

/// Recognized server-provided preferences. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(
        rename = "EnableAcceleratedRendering",
        alias = "EnableWebGL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub accelerated_rendering: Option<bool>,
    #[serde(rename = "font-size", default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(rename = "font-family", default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl Preferences {
    /// Parse preferences key by key.
    ///
    /// A malformed value is skipped with a warning so the remaining keys
    /// still apply. Only a non-object document is an error.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject);
        };
        let mut prefs = Self::default();
        for (key, value) in map {
            if let Err(err) = prefs.apply_entry(key, value) {
                warn!(%err, "ignoring preference");
            }
        }
        Ok(prefs)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(s).map_err(|_| ConfigError::NotAnObject)?;
        Self::from_value(&value)
    }

    fn apply_entry(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        let invalid = |expected| ConfigError::InvalidValue {
            key: key.to_owned(),
            expected,
        };
        match key {
            ACCELERATED_RENDERING_KEY | LEGACY_ACCELERATED_RENDERING_KEY => {
                self.accelerated_rendering = Some(value.as_bool().ok_or_else(|| invalid("boolean"))?);
            }
            FONT_SIZE_KEY => {
                let size = value
                    .as_f64()
                    .filter(|size| size.is_finite() && *size > 0.0)
                    .ok_or_else(|| invalid("positive number"))?;
                self.font_size = Some(size);
            }
            FONT_FAMILY_KEY => {
                let family = value.as_str().ok_or_else(|| invalid("string"))?;
                self.font_family = Some(family.to_owned());
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether applying these preferences changes cell metrics.
    #[must_use]
    pub const fn affects_metrics(&self) -> bool {
        self.font_size.is_some() || self.font_family.is_some()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}
