//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that phase handlers read from and
//! write to: the latest reading, the clock, the phase deadline, and a
//! control request for the relay controller.  Think of it as the
//! "blackboard" in a blackboard architecture.

use crate::config::SystemConfig;

use super::deadline::Deadline;

// ---------------------------------------------------------------------------
// Control request (written by on_enter; consumed by the service)
// ---------------------------------------------------------------------------

/// What a phase's entry action wants the relay controller to do.
///
/// The FSM never touches the relay itself.  The service takes the request
/// right after each transition and applies it through the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlRequest {
    /// Keep the controller as it is (same target, same armed state).
    Hold,
    /// Arm at the given target and evaluate immediately.
    Arm(f32),
    /// Disarm and force the relay off.
    Disarm,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every phase handler function.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic milliseconds since boot, refreshed before each evaluation.
    pub now_ms: u64,
    /// Ticks elapsed since the current phase was entered.
    pub ticks_in_phase: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- Sensor data --
    /// Latest good temperature reading (Celsius).
    pub reading_c: f32,

    // -- Phase bookkeeping --
    /// Deadline of the current phase; `on_enter` installs or clears it.
    pub deadline: Deadline,
    /// Pending relay-controller request from the last `on_enter`.
    pub control: ControlRequest,

    // -- Configuration --
    pub config: SystemConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_phase: 0,
            total_ticks: 0,
            reading_c: crate::sensors::temperature::NO_READING,
            deadline: Deadline::none(),
            control: ControlRequest::Hold,
            config,
        }
    }

    /// Take the pending control request, leaving `Hold` behind.
    pub fn take_control(&mut self) -> ControlRequest {
        core::mem::replace(&mut self.control, ControlRequest::Hold)
    }

    /// Whether the phase deadline has passed.
    pub fn deadline_expired(&self) -> bool {
        self.deadline.expired(self.now_ms)
    }
}
