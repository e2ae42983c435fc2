//! Closed-loop heater control.

pub mod relay;

pub use relay::RelayController;
