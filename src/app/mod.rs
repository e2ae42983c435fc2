//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the heat / lubricate / cool
//! process: phase orchestration, safety evaluation, relay control, command
//! parsing, and notification rendering.  All interaction with hardware and
//! the network happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod inbox;
pub mod notifier;
pub mod ports;
pub mod service;
