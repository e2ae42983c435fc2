//! Safety supervisor.
//!
//! The supervisor runs **every tick before the FSM** and decides whether
//! the active process must be aborted.  Two conditions trip it, checked in
//! this order:
//!
//! 1. **Over-temperature**: any active phase with a reading above
//!    `max_temp_c`.
//! 2. **Watchdog**: the phase deadline has passed in any active phase
//!    except `Lubricating`, whose deadline is a normal end of phase
//!    handled by the state table.
//!
//! A trip is not latched: the service forces the FSM to `Idle` (relay
//! off, deadline cleared) and from there nothing can trip again until an
//! operator starts a new process.

use crate::config::SystemConfig;
use crate::error::SafetyFault;
use crate::fsm::context::FsmContext;
use crate::fsm::Phase;
use log::error;

/// Safety supervisor.
pub struct SafetySupervisor {
    max_temp_c: f32,
    /// Total trips since boot, by kind.
    over_temp_trips: u32,
    timeout_trips: u32,
}

impl SafetySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            max_temp_c: config.max_temp_c,
            over_temp_trips: 0,
            timeout_trips: 0,
        }
    }

    /// Evaluate the safety rules for `phase` against the context.
    /// Returns the first fault found, if any.
    pub fn evaluate(&mut self, phase: Phase, ctx: &FsmContext) -> Option<SafetyFault> {
        if !phase.is_active() {
            return None;
        }

        // ── Temperature ───────────────────────────────────────────
        if ctx.reading_c > self.max_temp_c {
            error!(
                "SAFETY FAULT: {} in {}, {:.2} C > {:.2} C",
                SafetyFault::OverTemperature,
                phase,
                ctx.reading_c,
                self.max_temp_c
            );
            self.over_temp_trips = self.over_temp_trips.saturating_add(1);
            return Some(SafetyFault::OverTemperature);
        }

        // ── Watchdog ──────────────────────────────────────────────
        if phase != Phase::Lubricating && ctx.deadline_expired() {
            error!("SAFETY FAULT: {} in {}", SafetyFault::ProcessTimeout, phase);
            self.timeout_trips = self.timeout_trips.saturating_add(1);
            return Some(SafetyFault::ProcessTimeout);
        }

        None
    }

    pub fn max_temp_c(&self) -> f32 {
        self.max_temp_c
    }

    /// Number of trips of `fault` since boot.
    pub fn trip_count(&self, fault: SafetyFault) -> u32 {
        match fault {
            SafetyFault::OverTemperature => self.over_temp_trips,
            SafetyFault::ProcessTimeout => self.timeout_trips,
        }
    }
}
