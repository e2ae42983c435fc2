//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: the [`Notifier`](super::notifier::Notifier)
//! renders operator-facing ones into chat text, the log sink writes every
//! one to the console.

use core::time::Duration;

use crate::fsm::Phase;

use super::commands::ReplyToken;

/// How loudly an event should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// The service has started; carries the first reading.
    MonitorStarted { reading: f32 },

    /// Answer to `/status`.
    Status {
        reply_to: Option<ReplyToken>,
        phase: Phase,
        reading: f32,
        heating: bool,
        target: Option<f32>,
        remaining: Option<Duration>,
    },

    /// `/start` accepted, heating toward the lubrication target.
    Starting { reply_to: Option<ReplyToken>, reading: f32 },

    /// `/lubricate` accepted.  `warning` carries the phase it was issued
    /// from when that was not `Hot`.
    Lubricating {
        reply_to: Option<ReplyToken>,
        reading: f32,
        warning: Option<Phase>,
    },

    /// `/cooldown` accepted.  `warning` carries the phase it was issued
    /// from when that was not `Lubricating`.
    CoolingDown {
        reply_to: Option<ReplyToken>,
        reading: f32,
        warning: Option<Phase>,
    },

    /// `/stop` accepted.
    Stopping { reply_to: Option<ReplyToken>, reading: f32 },

    /// Safety trip: reading above `max_temp_c` while active.
    OverTemperature { reading: f32, limit: f32 },

    /// Watchdog expired in `phase`; the process was stopped.
    TimeoutExpired { phase: Phase, reading: f32 },

    /// Lubrication time is up; cooling has begun.
    LubricationFinished { reading: f32 },

    /// `Heating` reached the lubrication target.
    HotReached { reading: f32 },

    /// `Cooling` reached the cool-down target.
    CoolReached { reading: f32 },

    /// The FSM moved between phases.
    PhaseChanged { from: Phase, to: Phase },

    /// The heater relay was switched.
    RelaySwitched { on: bool, reading: f32 },
}

impl ProcessEvent {
    /// Message this event answers, if any.
    pub fn reply_to(&self) -> Option<ReplyToken> {
        match self {
            Self::Status { reply_to, .. }
            | Self::Starting { reply_to, .. }
            | Self::Lubricating { reply_to, .. }
            | Self::CoolingDown { reply_to, .. }
            | Self::Stopping { reply_to, .. } => *reply_to,
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::OverTemperature { .. } => Severity::Critical,
            Self::TimeoutExpired { .. } => Severity::Warning,
            Self::Lubricating { warning, .. } | Self::CoolingDown { warning, .. }
                if warning.is_some() =>
            {
                Severity::Warning
            }
            _ => Severity::Info,
        }
    }

    /// Short tag used by the log sink.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MonitorStarted { .. } => "MONITOR_STARTED",
            Self::Status { .. } => "STATUS",
            Self::Starting { .. } => "STARTING",
            Self::Lubricating { .. } => "LUBRICATING",
            Self::CoolingDown { .. } => "COOLING_DOWN",
            Self::Stopping { .. } => "STOPPING",
            Self::OverTemperature { .. } => "OVER_TEMPERATURE",
            Self::TimeoutExpired { .. } => "TIMEOUT",
            Self::LubricationFinished { .. } => "LUBRICATION_FINISHED",
            Self::HotReached { .. } => "HOT_REACHED",
            Self::CoolReached { .. } => "COOL_REACHED",
            Self::PhaseChanged { .. } => "PHASE",
            Self::RelaySwitched { .. } => "RELAY",
        }
    }
}
