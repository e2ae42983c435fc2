//! System configuration parameters
//!
//! Process limits are read once at boot (from storage, or defaults) and
//! stay fixed for the rest of the run.  Bot and WiFi settings live in
//! separate records so `/reconfigure` can drop the network credentials
//! without touching the process limits.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core process configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Process targets ---
    /// Lubrication temperature (Celsius); `Heating` completes at or above it
    pub hot_temp_c: f32,
    /// Cool-down temperature (Celsius); `Cooling` completes at or below it
    pub cool_temp_c: f32,
    /// Hysteresis dead-band below the target (Celsius)
    pub control_delta_c: f32,

    // --- Safety ---
    /// Any reading above this while active forces a shutdown
    pub max_temp_c: f32,
    /// How long the `Lubricating` phase lasts (hours)
    pub lubrication_hours: f32,
    /// Watchdog for every other active phase (hours)
    pub process_timeout_hours: f32,

    // --- Timing ---
    /// Temperature probe resolution (9-12 bits); sets the sampling cadence
    pub sensor_resolution_bits: u8,
    /// Control tick interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Bot API polling interval (milliseconds)
    pub message_poll_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            hot_temp_c: 102.0,
            cool_temp_c: 65.0,
            control_delta_c: 1.0,

            max_temp_c: 120.0,
            lubrication_hours: 1.0,
            process_timeout_hours: 3.0,

            sensor_resolution_bits: 12,
            tick_interval_ms: 50,
            message_poll_interval_ms: 1000,
        }
    }
}

impl SystemConfig {
    /// Length of the `Lubricating` phase.
    pub fn lubrication_duration(&self) -> Duration {
        hours(self.lubrication_hours)
    }

    /// Deadline installed on entry to every other active phase.
    pub fn process_timeout(&self) -> Duration {
        hours(self.process_timeout_hours)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temps = [self.hot_temp_c, self.cool_temp_c, self.max_temp_c, self.control_delta_c];
        if temps.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::ValidationFailed("temperatures must be finite"));
        }
        if self.control_delta_c <= 0.0 {
            return Err(ConfigError::ValidationFailed("control_delta_c must be > 0"));
        }
        if self.cool_temp_c >= self.hot_temp_c {
            return Err(ConfigError::ValidationFailed("cool_temp_c must be < hot_temp_c"));
        }
        if self.hot_temp_c >= self.max_temp_c {
            return Err(ConfigError::ValidationFailed("hot_temp_c must be < max_temp_c"));
        }
        if !(self.lubrication_hours > 0.0 && self.lubrication_hours <= 48.0) {
            return Err(ConfigError::ValidationFailed("lubrication_hours must be in (0, 48]"));
        }
        if !(self.process_timeout_hours > 0.0 && self.process_timeout_hours <= 48.0) {
            return Err(ConfigError::ValidationFailed(
                "process_timeout_hours must be in (0, 48]",
            ));
        }
        if !(9..=12).contains(&self.sensor_resolution_bits) {
            return Err(ConfigError::ValidationFailed("sensor_resolution_bits must be 9-12"));
        }
        if !(10..=1000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be 10-1000"));
        }
        if !(250..=60_000).contains(&self.message_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "message_poll_interval_ms must be 250-60000",
            ));
        }
        Ok(())
    }
}

/// Saturates instead of panicking on overflow; negative and NaN give zero.
fn hours(h: f32) -> Duration {
    Duration::try_from_secs_f32(h.max(0.0) * 3600.0).unwrap_or(Duration::MAX)
}

/// Telegram bot identity and the single chat allowed to drive the process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub token: heapless::String<64>,
    pub operator_chat_id: i64,
}

impl BotConfig {
    pub fn is_provisioned(&self) -> bool {
        !self.token.is_empty() && self.operator_chat_id != 0
    }
}

/// Station-mode network credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}
