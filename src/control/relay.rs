//! Two-point hysteresis controller for the heating relay.
//!
//! ```text
//!   reading
//!     ▲
//!     │ ─ ─ ─ ─ ─ ─ target ─ ─ ─ ─ ─   above  → relay OFF
//!     │          dead-band               inside → hold last output
//!     │ ─ ─ ─ ─ target - delta ─ ─ ─    below  → relay ON
//!     └──────────────────────────────▶ time
//! ```
//!
//! The controller only remembers what it last wrote.  Writes go through a
//! [`RelayPort`] and happen on edges only, so every call to `set` is a real
//! toggle and shows up once in the log.

use log::info;

use crate::app::ports::RelayPort;

/// Hysteresis relay controller.
#[derive(Debug, Clone)]
pub struct RelayController {
    delta: f32,
    /// Upper threshold; the relay switches off above it.
    target: f32,
    armed: bool,
    /// Output state last written to the relay.
    heating: bool,
    /// Reading seen by the most recent `start`/`tick`, for log lines.
    last_reading: f32,
    toggles: u32,
}

impl RelayController {
    /// Create a disarmed controller with the relay assumed off.
    pub fn new(delta: f32) -> Self {
        Self {
            delta,
            target: 0.0,
            armed: false,
            heating: false,
            last_reading: f32::NAN,
            toggles: 0,
        }
    }

    /// Arm the controller at `target` and evaluate immediately.
    pub fn start(&mut self, target: f32, reading: f32, relay: &mut impl RelayPort) {
        info!(
            "Relay: start, target={:.2}, current={:.2}",
            target, reading
        );
        self.target = target;
        self.armed = true;
        self.tick(reading, relay);
    }

    /// Disarm and force the output off.
    pub fn stop(&mut self, relay: &mut impl RelayPort) {
        if self.armed {
            info!("Relay: stop, current={:.2}", self.last_reading);
        }
        self.armed = false;
        self.apply(false, relay);
    }

    /// Re-evaluate the output against `reading`.  No-op while disarmed.
    pub fn tick(&mut self, reading: f32, relay: &mut impl RelayPort) {
        self.last_reading = reading;
        if !self.armed {
            return;
        }
        if reading > self.target {
            self.apply(false, relay);
        } else if reading < self.target - self.delta {
            self.apply(true, relay);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Current setpoint, `None` while disarmed.
    pub fn target(&self) -> Option<f32> {
        self.armed.then_some(self.target)
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Number of relay writes since construction.
    pub fn toggle_count(&self) -> u32 {
        self.toggles
    }

    fn apply(&mut self, on: bool, relay: &mut impl RelayPort) {
        if on == self.heating {
            return;
        }
        info!(
            "Relay: heat={}, current={:.2}",
            if on { "ON" } else { "OFF" },
            self.last_reading
        );
        relay.set(on);
        self.heating = on;
        self.toggles = self.toggles.wrapping_add(1);
    }
}
