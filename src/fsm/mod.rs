//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌──────────────────┬──────────┬──────────┬──────────────────┐ │
//! │  │ LoopPhase        │ on_enter │ on_exit  │ on_update        │ │
//! │  ├──────────────────┼──────────┼──────────┼──────────────────┤ │
//! │  │ Idle             │ fn(ctx)  │ -        │ fn(ctx)->Option  │ │
//! │  │ Debouncing       │ fn(ctx)  │ -        │ fn(ctx)->Option  │ │
//! │  │ AwaitingResult   │ fn(ctx)  │ -        │ fn(ctx)->Option  │ │
//! │  │ Feedback         │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option  │ │
//! │  │ WaitingForRelease│ fn(ctx)  │ -        │ fn(ctx)->Option  │ │
//! │  └──────────────────┴──────────┴──────────┴──────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! phase, stamps the entry time, then runs `on_enter` for the next.  All
//! functions receive `&mut FsmContext`.  Phase timing is wall-time
//! (`ctx.now_ms`), not tick counts, so a slow frame never stretches a
//! debounce or a pulse.

pub mod context;
pub mod states;

use core::fmt;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// The orchestrator's own state.  Exactly one is active at any instant.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoopPhase {
    Idle = 0,
    Debouncing = 1,
    AwaitingResult = 2,
    Feedback = 3,
    WaitingForRelease = 4,
}

impl LoopPhase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `LoopPhase`.  Asserts in debug builds;
    /// returns `Idle` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Debouncing,
            2 => Self::AwaitingResult,
            3 => Self::Feedback,
            4 => Self::WaitingForRelease,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Idle
            }
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Debouncing => "Debouncing",
            Self::AwaitingResult => "AwaitingResult",
            Self::Feedback => "Feedback",
            Self::WaitingForRelease => "WaitingForRelease",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<LoopPhase>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
pub struct StateDescriptor {
    pub id: LoopPhase,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `LoopPhase as usize`.
    table: [StateDescriptor; LoopPhase::COUNT],
    current: usize,
    /// Number of completed ticks (wraps at u64::MAX).
    tick_count: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; LoopPhase::COUNT], initial: LoopPhase) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in phase: {}", self.table[self.current].name);
        ctx.phase_entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick at `ctx.now_ms`.
    ///
    /// At most one transition happens per tick, so every phase is visible
    /// for at least one frame.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count = self.tick_count.wrapping_add(1);

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    pub fn current_phase(&self) -> LoopPhase {
        self.table[self.current].id
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: LoopPhase, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {} at {}ms",
            self.table[self.current].name, self.table[next_idx].name, ctx.now_ms
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.phase_entered_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
