//! Concrete phase handler functions and table builder.
//!
//! Each phase is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──/start──▶ HEATING ──[reading ≥ hot]──▶ HOT
//!                                                 │
//!                                            /lubricate
//!                                                 ▼
//!  COOL ◀──[reading ≤ cool]── COOLING ◀──[time up]── LUBRICATING
//!
//!  Any active phase ──[over max | watchdog]──▶ IDLE
//!  Any phase ──/stop──▶ IDLE   (commands may jump anywhere, with a warning)
//! ```
//!
//! The over-temperature and watchdog exits live in
//! [`SafetySupervisor`](crate::safety::SafetySupervisor), which runs before
//! these handlers.  The lubrication timer is not a fault: when it runs out
//! the process moves on to cooling.

use super::context::{ControlRequest, FsmContext};
use super::{Phase, StateDescriptor};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; Phase::COUNT] {
    [
        StateDescriptor {
            id: Phase::Idle,
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: Phase::Heating,
            on_enter: Some(heating_enter),
            on_exit: None,
            on_update: heating_update,
        },
        StateDescriptor {
            id: Phase::Hot,
            on_enter: Some(watchdog_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: Phase::Lubricating,
            on_enter: Some(lubricating_enter),
            on_exit: None,
            on_update: lubricating_update,
        },
        StateDescriptor {
            id: Phase::Cooling,
            on_enter: Some(cooling_enter),
            on_exit: None,
            on_update: cooling_update,
        },
        StateDescriptor {
            id: Phase::Cool,
            on_enter: Some(watchdog_enter),
            on_exit: None,
            on_update: stay,
        },
    ]
}

fn stay(_ctx: &mut FsmContext) -> Option<Phase> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: relay off, nothing pending
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.deadline.clear();
    ctx.control = ControlRequest::Disarm;
    info!("IDLE: heater disarmed at {:.2} C", ctx.reading_c);
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEATING: driving toward the lubrication temperature
// ═══════════════════════════════════════════════════════════════════════════

fn heating_enter(ctx: &mut FsmContext) {
    let timeout = ctx.config.process_timeout();
    ctx.deadline.install(ctx.now_ms, timeout);
    ctx.control = ControlRequest::Arm(ctx.config.hot_temp_c);
    info!(
        "HEATING: target {:.1} C, timeout {}s",
        ctx.config.hot_temp_c,
        timeout.as_secs()
    );
}

fn heating_update(ctx: &mut FsmContext) -> Option<Phase> {
    if ctx.reading_c >= ctx.config.hot_temp_c {
        info!("HEATING: {:.2} C reached target", ctx.reading_c);
        return Some(Phase::Hot);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HOT / COOL: holding a setpoint, guarded by the process watchdog
// ═══════════════════════════════════════════════════════════════════════════

/// Keeps the controller at its current target; only the watchdog is fresh.
fn watchdog_enter(ctx: &mut FsmContext) {
    ctx.deadline.install(ctx.now_ms, ctx.config.process_timeout());
    ctx.control = ControlRequest::Hold;
}

// ═══════════════════════════════════════════════════════════════════════════
//  LUBRICATING: holding the hot target for the configured time
// ═══════════════════════════════════════════════════════════════════════════

fn lubricating_enter(ctx: &mut FsmContext) {
    let duration = ctx.config.lubrication_duration();
    ctx.deadline.install(ctx.now_ms, duration);
    ctx.control = ControlRequest::Arm(ctx.config.hot_temp_c);
    info!("LUBRICATING: holding {:.1} C for {}s", ctx.config.hot_temp_c, duration.as_secs());
}

fn lubricating_update(ctx: &mut FsmContext) -> Option<Phase> {
    if ctx.deadline_expired() {
        info!("LUBRICATING: time up at {:.2} C", ctx.reading_c);
        return Some(Phase::Cooling);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING: relay regulating at the cool-down temperature
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_enter(ctx: &mut FsmContext) {
    ctx.deadline.install(ctx.now_ms, ctx.config.process_timeout());
    ctx.control = ControlRequest::Arm(ctx.config.cool_temp_c);
    info!("COOLING: target {:.1} C", ctx.config.cool_temp_c);
}

fn cooling_update(ctx: &mut FsmContext) -> Option<Phase> {
    if ctx.reading_c <= ctx.config.cool_temp_c {
        info!("COOLING: {:.2} C reached target", ctx.reading_c);
        return Some(Phase::Cool);
    }
    None
}
