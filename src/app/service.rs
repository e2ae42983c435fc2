//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the FSM, safety supervisor, relay controller, and
//! shared context.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!    ClockPort ──▶ │        AppService         │
//! MessageSource ──▶│ Relay · FSM · Safety      │
//!    RelayPort ◀── └──────────────────────────┘
//! ```
//!
//! Every tick runs in a fixed order: sample and regulate, then operator
//! commands, then the safety and phase rules.  A command and a same-tick
//! safety trip therefore resolve deterministically, with the trip last.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::RelayController;
use crate::error::SafetyFault;
use crate::fsm::context::{ControlRequest, FsmContext};
use crate::fsm::deadline::Deadline;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Phase};
use crate::safety::SafetySupervisor;

use super::commands::{ChatId, InboundMessage, ProcessCommand, RemoteCommand, ReplyToken};
use super::events::ProcessEvent;
use super::ports::{ClockPort, EventSink, MessageSource, RelayPort, SensorPort};

// ───────────────────────────────────────────────────────────────
// Results
// ───────────────────────────────────────────────────────────────

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not from the operator, or not a command.
    Ignored,
    /// A process command was executed.
    Handled,
    /// Operator asked for `/reconfigure`; the caller owns that action.
    Reconfigure,
}

/// Summary of one [`AppService::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Process commands executed this tick.
    pub commands: u8,
    /// `/reconfigure` was received from the operator.
    pub reconfigure: bool,
    /// Safety trip raised this tick.
    pub fault: Option<SafetyFault>,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    safety: SafetySupervisor,
    relay: RelayController,
    /// Only messages from this chat are acted on.
    operator: ChatId,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, operator: ChatId) -> Self {
        let safety = SafetySupervisor::new(&config);
        let relay = RelayController::new(config.control_delta_c);
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), Phase::Idle);

        Self {
            fsm,
            ctx,
            safety,
            relay,
            operator,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Take a first sample, enter `Idle`, and announce the monitor.
    ///
    /// Blocks until the sensor has produced its first reading (one
    /// conversion), so the announcement and any early command see a real
    /// temperature.
    pub fn start(
        &mut self,
        hw: &mut (impl SensorPort + RelayPort + ClockPort),
        sink: &mut impl EventSink,
    ) {
        hw.prime(hw.now_ms());
        self.ctx.now_ms = hw.now_ms();
        self.ctx.reading_c = hw.current_reading();
        self.fsm.start(&mut self.ctx);
        self.apply_control(hw, sink);
        sink.emit(&ProcessEvent::MonitorStarted {
            reading: self.ctx.reading_c,
        });
        info!(
            "AppService started in {} at {:.2} C",
            self.fsm.current_phase(),
            self.ctx.reading_c
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full cycle: sample → regulate → commands → rules.
    ///
    /// The `hw` parameter satisfies all three hardware ports, which avoids
    /// a double mutable borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + RelayPort + ClockPort),
        source: &mut impl MessageSource,
        sink: &mut impl EventSink,
    ) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport::default();

        // 1. Sample and run the hysteresis loop on the current target
        self.tick_controller(hw, sink);

        // 2. Drain operator commands
        while let Some(msg) = source.next_message() {
            match self.handle_message(msg, hw, sink) {
                Dispatch::Handled => report.commands = report.commands.saturating_add(1),
                Dispatch::Reconfigure => report.reconfigure = true,
                Dispatch::Ignored => {}
            }
        }

        // 3. Safety, watchdog, and phase completion rules
        report.fault = self.evaluate(hw, sink);
        report
    }

    /// Refresh clock and reading, then let the relay controller react.
    pub fn tick_controller(
        &mut self,
        hw: &mut (impl SensorPort + RelayPort + ClockPort),
        sink: &mut impl EventSink,
    ) {
        self.sample(hw);
        let was_heating = self.relay.is_heating();
        self.relay.tick(self.ctx.reading_c, hw);
        self.note_relay(was_heating, sink);
    }

    /// Evaluate the safety supervisor, then the current phase's update rule.
    ///
    /// At most one transition happens per call.  Returns the safety fault
    /// if one forced the process back to `Idle`.
    pub fn evaluate(
        &mut self,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> Option<SafetyFault> {
        let phase = self.fsm.current_phase();
        let reading = self.ctx.reading_c;

        if let Some(fault) = self.safety.evaluate(phase, &self.ctx) {
            self.transition(Phase::Idle, hw, sink);
            let event = match fault {
                SafetyFault::OverTemperature => ProcessEvent::OverTemperature {
                    reading,
                    limit: self.safety.max_temp_c(),
                },
                SafetyFault::ProcessTimeout => ProcessEvent::TimeoutExpired { phase, reading },
            };
            sink.emit(&event);
            return Some(fault);
        }

        if let Some(from) = self.fsm.tick(&mut self.ctx) {
            let to = self.fsm.current_phase();
            self.apply_control(hw, sink);
            sink.emit(&ProcessEvent::PhaseChanged { from, to });
            let event = match (from, to) {
                (Phase::Heating, Phase::Hot) => Some(ProcessEvent::HotReached { reading }),
                (Phase::Lubricating, Phase::Cooling) => {
                    Some(ProcessEvent::LubricationFinished { reading })
                }
                (Phase::Cooling, Phase::Cool) => Some(ProcessEvent::CoolReached { reading }),
                _ => None,
            };
            if let Some(event) = event {
                sink.emit(&event);
            }
        }
        None
    }

    // ── Command handling ──────────────────────────────────────

    /// Filter by sender and route a message.
    pub fn handle_message(
        &mut self,
        msg: InboundMessage,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> Dispatch {
        if msg.sender != self.operator {
            debug!("Ignoring message from chat {}", msg.sender.0);
            return Dispatch::Ignored;
        }
        match msg.command {
            None => Dispatch::Ignored,
            Some(RemoteCommand::Reconfigure) => {
                info!("Reconfigure requested by operator");
                Dispatch::Reconfigure
            }
            Some(RemoteCommand::Process(cmd)) => {
                self.handle_command(cmd, Some(msg.reply_to), hw, sink);
                Dispatch::Handled
            }
        }
    }

    /// Execute a process command.  Every command is accepted; misordered
    /// ones carry an advisory warning in their event.
    pub fn handle_command(
        &mut self,
        cmd: ProcessCommand,
        reply_to: Option<ReplyToken>,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) {
        let phase = self.fsm.current_phase();
        let reading = self.ctx.reading_c;
        info!("Command {:?} in {}", cmd, phase);

        match cmd {
            ProcessCommand::Status => {
                sink.emit(&ProcessEvent::Status {
                    reply_to,
                    phase,
                    reading,
                    heating: self.relay.is_heating(),
                    target: self.relay.target(),
                    remaining: self.remaining(),
                });
            }
            ProcessCommand::Start => {
                sink.emit(&ProcessEvent::Starting { reply_to, reading });
                self.transition(Phase::Heating, hw, sink);
            }
            ProcessCommand::Lubricate => {
                let warning = (phase != Phase::Hot).then_some(phase);
                if warning.is_some() {
                    warn!("Lubricate issued in {}, expected HOT", phase);
                }
                sink.emit(&ProcessEvent::Lubricating {
                    reply_to,
                    reading,
                    warning,
                });
                self.transition(Phase::Lubricating, hw, sink);
            }
            ProcessCommand::Stop => {
                sink.emit(&ProcessEvent::Stopping { reply_to, reading });
                self.transition(Phase::Idle, hw, sink);
            }
            ProcessCommand::Cooldown => {
                let warning = (phase != Phase::Lubricating).then_some(phase);
                if warning.is_some() {
                    warn!("Cooldown issued in {}, expected LUBRICATING", phase);
                }
                sink.emit(&ProcessEvent::CoolingDown {
                    reply_to,
                    reading,
                    warning,
                });
                self.transition(Phase::Cooling, hw, sink);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current process phase.
    pub fn phase(&self) -> Phase {
        self.fsm.current_phase()
    }

    pub fn deadline(&self) -> Deadline {
        self.ctx.deadline
    }

    /// Time left on the phase deadline as of the last sample.
    pub fn remaining(&self) -> Option<Duration> {
        self.ctx.deadline.remaining(self.ctx.now_ms)
    }

    /// Relay controller setpoint, `None` while disarmed.
    pub fn target(&self) -> Option<f32> {
        self.relay.target()
    }

    pub fn is_heating(&self) -> bool {
        self.relay.is_heating()
    }

    /// Reading used by the last tick.
    pub fn reading(&self) -> f32 {
        self.ctx.reading_c
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of relay writes since startup.
    pub fn relay_toggles(&self) -> u32 {
        self.relay.toggle_count()
    }

    pub fn operator(&self) -> ChatId {
        self.operator
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn sample(&mut self, hw: &mut (impl SensorPort + ClockPort)) {
        let now = hw.now_ms();
        hw.poll(now);
        self.ctx.now_ms = now;
        self.ctx.reading_c = hw.current_reading();
    }

    /// Enter `next` (re-entering if already there) and apply its control
    /// request.  Emits `PhaseChanged` only when the phase actually changed.
    fn transition(&mut self, next: Phase, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        let from = self.fsm.force_transition(next, &mut self.ctx);
        self.apply_control(hw, sink);
        if from != next {
            sink.emit(&ProcessEvent::PhaseChanged { from, to: next });
        }
    }

    /// Translate the FSM's control request into relay controller calls.
    fn apply_control(&mut self, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        let was_heating = self.relay.is_heating();
        match self.ctx.take_control() {
            ControlRequest::Hold => {}
            ControlRequest::Arm(target) => self.relay.start(target, self.ctx.reading_c, hw),
            ControlRequest::Disarm => self.relay.stop(hw),
        }
        self.note_relay(was_heating, sink);
    }

    fn note_relay(&self, was_heating: bool, sink: &mut impl EventSink) {
        let on = self.relay.is_heating();
        if on != was_heating {
            sink.emit(&ProcessEvent::RelaySwitched {
                on,
                reading: self.ctx.reading_c,
            });
        }
    }
}
