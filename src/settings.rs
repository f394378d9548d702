//! Runtime configuration for the do-after scheduler.
//!
//! Insert a [`DoAfterSettings`] resource before adding
//! [`DoAfterPlugin`](crate::DoAfterPlugin) to override the defaults, or parse
//! one from JSON with [`DoAfterSettings::from_json_str`]. Durations are written
//! as seconds:
//!
//! ```
//! use do_after::DoAfterSettings;
//! let settings = DoAfterSettings::from_json_str(r#"{"tick_delta": 0.05}"#).unwrap();
//! assert_eq!(settings.tick_delta.as_millis(), 50);
//! ```

use std::time::Duration;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_TICK_SECONDS, EXCESS_TIME_SECONDS, INTERACTION_RANGE};

/// Scheduler tuning shared by every actor.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoAfterSettings {
    /// Simulation time added to [`DoAfterClock`](crate::DoAfterClock) per tick.
    #[serde(with = "seconds")]
    pub tick_delta: Duration,
    /// Grace window a terminal do-after stays queryable for.
    #[serde(with = "seconds")]
    pub excess_time: Duration,
    /// Reach used when a do-after does not set its own distance threshold.
    pub interaction_range: f32,
}

impl Default for DoAfterSettings {
    fn default() -> Self {
        Self {
            tick_delta: Duration::from_secs_f64(DEFAULT_TICK_SECONDS),
            excess_time: Duration::from_secs_f64(EXCESS_TIME_SECONDS),
            interaction_range: INTERACTION_RANGE,
        }
    }
}

/// Failure while loading [`DoAfterSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document was not valid settings JSON.
    #[error("malformed do-after settings: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A value parsed but is unusable.
    #[error("invalid do-after setting `{field}`: {detail}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        detail: String,
    },
}

impl DoAfterSettings {
    /// Parses settings from a JSON document, filling omitted fields with
    /// defaults.
    ///
    /// # Errors
    /// Returns [`SettingsError::Malformed`] for invalid JSON and
    /// [`SettingsError::Invalid`] when the tick delta is zero or the
    /// interaction range is negative or not finite.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_delta.is_zero() {
            return Err(SettingsError::Invalid {
                field: "tick_delta",
                detail: "must be greater than zero".to_owned(),
            });
        }
        if !self.interaction_range.is_finite() || self.interaction_range < 0.0 {
            return Err(SettingsError::Invalid {
                field: "interaction_range",
                detail: format!("{} is not a usable distance", self.interaction_range),
            });
        }
        Ok(())
    }
}

/// Serialises a [`Duration`] as fractional seconds.
mod seconds {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
