//! GPIO / peripheral pin assignments.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Two boards are supported; the `board-th10`
//! feature selects the alternate relay board.

// ---------------------------------------------------------------------------
// Heater relay
// ---------------------------------------------------------------------------

/// Digital output driving the heater relay coil.
#[cfg(feature = "board-th10")]
pub const RELAY_GPIO: i32 = 12;
#[cfg(not(feature = "board-th10"))]
pub const RELAY_GPIO: i32 = 5;

/// Relay modules on both boards energise on a HIGH input.
pub const RELAY_ACTIVE_HIGH: bool = true;

// ---------------------------------------------------------------------------
// Temperature probe, analog (ADC1)
// ---------------------------------------------------------------------------

/// NTC thermistor, 10 kΩ @ 25 °C, voltage-divider to ADC.
#[cfg(feature = "board-th10")]
pub const PROBE_GPIO: i32 = 9;
#[cfg(not(feature = "board-th10"))]
pub const PROBE_GPIO: i32 = 10;

/// ADC1 channel for [`PROBE_GPIO`] (GPIO n is ADC1 channel n-1 on ESP32-S3).
pub const PROBE_ADC_CHANNEL: u32 = (PROBE_GPIO - 1) as u32;
