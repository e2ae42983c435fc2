//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every process event to the ESP-IDF
//! logger (which goes to UART / USB-CDC in production).  Runs alongside the
//! chat [`Notifier`](crate::app::notifier::Notifier) through the tuple
//! fan-out, so the serial console also shows events the operator never sees.

use log::{error, info, warn};

use crate::app::events::{ProcessEvent, Severity};
use crate::app::ports::EventSink;

/// Adapter that logs every [`ProcessEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    logged: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { logged: 0 }
    }

    pub fn logged(&self) -> u32 {
        self.logged
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ProcessEvent) {
        self.logged = self.logged.wrapping_add(1);
        let tag = event.name();
        let sev = event.severity();

        macro_rules! emit {
            ($($arg:tt)*) => {
                match sev {
                    Severity::Critical => error!($($arg)*),
                    Severity::Warning => warn!($($arg)*),
                    Severity::Info => info!($($arg)*),
                }
            };
        }

        match event {
            ProcessEvent::Status {
                phase,
                reading,
                heating,
                target,
                remaining,
                ..
            } => {
                emit!(
                    "{} | phase={} | T={:.2}\u{00b0}C | heater={} | target={:?} | remaining_s={:?}",
                    tag,
                    phase,
                    reading,
                    if *heating { "ON" } else { "OFF" },
                    target,
                    remaining.map(|d| d.as_secs()),
                );
            }
            ProcessEvent::Lubricating { reading, warning, .. }
            | ProcessEvent::CoolingDown { reading, warning, .. } => match warning {
                Some(was) => emit!("{} | T={:.2}\u{00b0}C | out of order, was {}", tag, reading, was),
                None => emit!("{} | T={:.2}\u{00b0}C", tag, reading),
            },
            ProcessEvent::OverTemperature { reading, limit } => {
                emit!("{} | T={:.2}\u{00b0}C > max={:.2}\u{00b0}C", tag, reading, limit);
            }
            ProcessEvent::TimeoutExpired { phase, reading } => {
                emit!("{} | phase={} | T={:.2}\u{00b0}C", tag, phase, reading);
            }
            ProcessEvent::PhaseChanged { from, to } => {
                emit!("{} | {} -> {}", tag, from, to);
            }
            ProcessEvent::RelaySwitched { on, reading } => {
                emit!(
                    "{} | heat={} | T={:.2}\u{00b0}C",
                    tag,
                    if *on { "ON" } else { "OFF" },
                    reading
                );
            }
            ProcessEvent::MonitorStarted { reading }
            | ProcessEvent::Starting { reading, .. }
            | ProcessEvent::Stopping { reading, .. }
            | ProcessEvent::LubricationFinished { reading }
            | ProcessEvent::HotReached { reading }
            | ProcessEvent::CoolReached { reading } => {
                emit!("{} | T={:.2}\u{00b0}C", tag, reading);
            }
        }
    }
}
