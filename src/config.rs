//! Toaster configuration.

use crate::error::{Result, ToastError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default auto-dismiss duration for new toasts.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

/// Default number of simultaneously visible toasts.
pub const DEFAULT_LIMIT: usize = 3;

/// Screen corner or edge the viewport is anchored to. Only the renderer
/// reads this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

/// Toaster configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToasterConfig {
    /// Max toasts visible at once. Older ones queue behind them.
    pub limit: usize,

    /// Auto-dismiss duration for toasts that don't request one.
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,

    /// Whether toasts show a close button unless they override it.
    pub close_button: bool,

    pub position: Position,

    /// How many closed toasts `history()` remembers.
    pub history_limit: usize,

    /// Default channel buffer for event subscriptions.
    pub event_buffer_size: usize,
}

impl Default for ToasterConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            duration: DEFAULT_DURATION,
            close_button: false,
            position: Position::default(),
            history_limit: 50,
            event_buffer_size: 256,
        }
    }
}

impl ToasterConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ToasterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(ToastError::InvalidConfig("limit must be at least 1".into()));
        }
        if self.history_limit == 0 {
            return Err(ToastError::InvalidConfig(
                "history_limit must be at least 1".into(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(ToastError::InvalidConfig(
                "event_buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter storing a `Duration` as integer milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
