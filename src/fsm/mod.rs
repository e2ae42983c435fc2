//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌─────────────┬───────────┬──────────┬──────────────────┐ │
//! │  │ Phase       │ on_enter  │ on_exit  │ on_update        │ │
//! │  ├─────────────┼───────────┼──────────┼──────────────────┤ │
//! │  │ Idle        │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Heating     │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Hot         │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Lubricating │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Cooling     │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Cool        │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  └─────────────┴───────────┴──────────┴──────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.
//! If it returns `Some(next)`, the engine runs `on_exit` for the
//! current phase, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut FsmContext` which
//! holds the reading, clock, deadline, and config.

pub mod context;
pub mod deadline;
pub mod states;

use core::fmt;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Process phase.  Exactly one is current at any time.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Heating = 1,
    Hot = 2,
    Lubricating = 3,
    Cooling = 4,
    Cool = 5,
}

impl Phase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Phase; Self::COUNT] = [
        Self::Idle,
        Self::Heating,
        Self::Hot,
        Self::Lubricating,
        Self::Cooling,
        Self::Cool,
    ];

    /// Convert an index back to `Phase`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release (relay-off fallback).
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(p) => *p,
            None => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Idle
            }
        }
    }

    /// Upper-case display name used in notifications.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Heating => "HEATING",
            Self::Hot => "HOT",
            Self::Lubricating => "LUBRICATING",
            Self::Cooling => "COOLING",
            Self::Cool => "COOL",
        }
    }

    /// Anything but `Idle`.
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<Phase>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Stored in a fixed-size array; no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: Phase,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]); the
/// [`FsmContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `Phase as usize`.
    table: [StateDescriptor; Phase::COUNT],
    /// Index of the current phase.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current phase was entered.
    phase_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; Phase::COUNT], initial: Phase) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting phase.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in phase: {}", self.current_phase());
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current phase.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    ///
    /// Returns the phase that was left, if a transition happened.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<Phase> {
        self.tick_count += 1;
        ctx.ticks_in_phase = self.tick_count - self.phase_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx)?;
        Some(self.transition(next, ctx))
    }

    /// Force an immediate transition (safety trips and operator commands).
    ///
    /// Unlike `tick`, `next` may equal the current phase: the phase is then
    /// exited and re-entered, so entry actions (fresh deadline, re-armed
    /// controller) run again.  Returns the phase that was left.
    pub fn force_transition(&mut self, next: Phase, ctx: &mut FsmContext) -> Phase {
        self.transition(next, ctx)
    }

    /// The current phase.
    pub fn current_phase(&self) -> Phase {
        Phase::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current phase.
    pub fn ticks_in_current_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Phase, ctx: &mut FsmContext) -> Phase {
        let prev = self.current_phase();
        info!("FSM transition: {} -> {}", prev, next);

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next as usize;
        self.phase_entry_tick = self.tick_count;
        ctx.ticks_in_phase = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        prev
    }
}
