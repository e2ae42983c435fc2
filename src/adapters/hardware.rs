//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the temperature sampler, the heater relay driver, and the clock,
//! exposing them through [`SensorPort`], [`RelayPort`] and [`ClockPort`].
//! [`AppService::tick`](crate::app::service::AppService::tick) takes one
//! `&mut` to this type for all three.  On non-espidf targets the probe and
//! clock use their cfg-gated simulation backends.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{ClockPort, RelayPort, SensorPort};
use crate::drivers::relay::RelayDriver;
use crate::sensors::{TemperatureProbe, TemperatureSampler};

use super::time::MonotonicClock;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P, Pin> {
    sampler: TemperatureSampler<P>,
    relay: RelayDriver<Pin>,
    clock: MonotonicClock,
}

impl<P: TemperatureProbe, Pin: OutputPin> HardwareAdapter<P, Pin> {
    pub fn new(sampler: TemperatureSampler<P>, relay: RelayDriver<Pin>, clock: MonotonicClock) -> Self {
        Self {
            sampler,
            relay,
            clock,
        }
    }

    pub fn sampler(&self) -> &TemperatureSampler<P> {
        &self.sampler
    }

    pub fn relay(&self) -> &RelayDriver<Pin> {
        &self.relay
    }

    pub fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    /// De-energise the heater regardless of controller state.  Used on the
    /// way to a restart.
    pub fn all_off(&mut self) {
        self.relay.set(false);
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<P: TemperatureProbe, Pin: OutputPin> SensorPort for HardwareAdapter<P, Pin> {
    fn prime(&mut self, now_ms: u64) {
        self.sampler.prime(now_ms);
    }

    fn poll(&mut self, now_ms: u64) {
        self.sampler.poll(now_ms);
    }

    fn current_reading(&self) -> f32 {
        self.sampler.current()
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl<P: TemperatureProbe, Pin: OutputPin> RelayPort for HardwareAdapter<P, Pin> {
    fn set(&mut self, on: bool) {
        self.relay.set(on);
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl<P: TemperatureProbe, Pin: OutputPin> ClockPort for HardwareAdapter<P, Pin> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
