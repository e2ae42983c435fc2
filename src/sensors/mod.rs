//! Sensor subsystem.
//!
//! Only the process temperature is sensed.  The sampler produces the
//! cached reading that [`SensorPort`](crate::app::ports::SensorPort)
//! exposes to the core each tick.

pub mod temperature;

pub use temperature::{NO_READING, NtcProbe, TemperatureProbe, TemperatureSampler};
