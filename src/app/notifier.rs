//! Notifier: renders operator-facing events into chat text.
//!
//! The core only ever emits structured [`ProcessEvent`]s.  This adapter sits
//! on the [`EventSink`] side of the boundary, turns the ones an operator
//! cares about into short messages, and hands them to a
//! [`NotificationSink`] together with the message they answer.
//!
//! Texts are bounded to [`MAX_TEXT`] bytes and built without allocation.

use core::fmt::Write;

use log::warn;

use crate::fsm::Phase;

use super::events::ProcessEvent;
use super::ports::{EventSink, NotificationSink};

/// Upper bound on a rendered notification.
pub const MAX_TEXT: usize = 256;

pub type Text = heapless::String<MAX_TEXT>;

/// Render `event` as operator text.  `None` for internal events.
pub fn render(event: &ProcessEvent) -> Option<Text> {
    let mut out = Text::new();
    let res = match event {
        ProcessEvent::MonitorStarted { reading } => {
            write!(out, "Temperature monitor started: [{reading:.2} C]")
        }
        ProcessEvent::Starting { reading, .. } => write!(out, "Starting: [{reading:.2} C]"),
        ProcessEvent::Lubricating { reading, warning, .. } => {
            warn_line(&mut out, Phase::Hot, *warning)
                .and_then(|()| write!(out, "Lubricating. [{reading:.2} C]"))
        }
        ProcessEvent::CoolingDown { reading, warning, .. } => {
            warn_line(&mut out, Phase::Lubricating, *warning)
                .and_then(|()| write!(out, "Cooling down. [{reading:.2} C]"))
        }
        ProcessEvent::Stopping { reading, .. } => write!(out, "Stopping. [{reading:.2} C]"),
        ProcessEvent::OverTemperature { reading, limit } => write!(
            out,
            "Max temperature exceeded, stopping. [{reading:.2} C > {limit:.2} C]"
        ),
        ProcessEvent::TimeoutExpired { phase, reading } => {
            write!(out, "Timeout expired in {phase}, stopping. [{reading:.2} C]")
        }
        ProcessEvent::LubricationFinished { reading } => write!(
            out,
            "Finished lubricating, started cooling down. [{reading:.2} C]"
        ),
        ProcessEvent::HotReached { reading } => {
            write!(out, "Lubrication target temperature reached. [{reading:.2} C]")
        }
        ProcessEvent::CoolReached { reading } => {
            write!(out, "Cooldown temperature reached. [{reading:.2} C]")
        }
        ProcessEvent::Status {
            phase,
            reading,
            heating,
            target,
            remaining,
            ..
        } => {
            let heater = if *heating { "ON" } else { "OFF" };
            let mut res = write!(out, "state={phase} [{reading:.2} C] heater={heater}");
            if let Some(t) = target {
                res = res.and_then(|()| write!(out, " target={t:.2} C"));
            }
            if let Some(left) = remaining {
                let mins = left.as_secs() / 60;
                res = res.and_then(|()| write!(out, " timeout in {}h {:02}m", mins / 60, mins % 60));
            }
            res
        }
        ProcessEvent::PhaseChanged { .. } | ProcessEvent::RelaySwitched { .. } => return None,
    };
    if res.is_err() {
        warn!("Notifier: {} truncated at {} bytes", event.name(), out.len());
    }
    Some(out)
}

fn warn_line(out: &mut Text, expected: Phase, was: Option<Phase>) -> core::fmt::Result {
    match was {
        Some(was) => writeln!(out, "Warning: state is not {expected} (was {was})"),
        None => Ok(()),
    }
}

/// [`EventSink`] that renders and forwards notifications.
pub struct Notifier<S> {
    sink: S,
    sent: u32,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, sent: 0 }
    }

    /// Notifications handed to the sink so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: NotificationSink> EventSink for Notifier<S> {
    fn emit(&mut self, event: &ProcessEvent) {
        if let Some(text) = render(event) {
            self.sink.deliver(event.reply_to(), &text);
            self.sent = self.sent.wrapping_add(1);
        }
    }
}
