//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that phase handlers read from and
//! write to.  It holds the inputs sampled this frame, the commands the
//! handlers leave for the service to apply, the heartbeat timer, timing,
//! and configuration.  Think of it as the "blackboard" in a blackboard
//! architecture.

use crate::config::SystemConfig;
use crate::drivers::led_patterns::AnimationPattern;
use crate::drivers::trigger::TriggerState;
use crate::heartbeat::HeartbeatScheduler;
use crate::webhook::CallOutcome;

// ---------------------------------------------------------------------------
// Loop inputs (read-only to handlers; written by the service each frame)
// ---------------------------------------------------------------------------

/// Everything the service sampled before this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopInputs {
    /// Current trigger level.
    pub trigger: TriggerState,
    /// The trigger went Low → High since the previous frame.
    pub rising_edge: bool,
    /// Outcome handed back by the worker and not yet consumed.
    pub outcome: Option<CallOutcome>,
    /// The success clip started in this cycle is still playing.
    pub audio_playing: bool,
}

// ---------------------------------------------------------------------------
// Loop commands (written by handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// What the handlers want done after the tick.
///
/// `pattern` persists until a handler replaces it; the flags are one-shot
/// and cleared by the service once applied.
#[derive(Debug, Clone, Copy)]
pub struct LoopCommands {
    /// Pattern to render this frame.
    pub pattern: AnimationPattern,
    /// Monotonic time the pattern's elapsed clock starts from.
    pub pattern_origin_ms: u64,
    /// Hand a new webhook request to the worker.
    pub begin_call: bool,
    /// Pick and start a random success clip.
    pub play_success_clip: bool,
    /// Outcome consumed this tick, for reporting.
    pub call_completed: Option<CallOutcome>,
    /// Heartbeat glow finished and the timer was re-armed.
    pub heartbeat_fired: bool,
    /// Tag removed; the cycle is over and the heartbeat was reset.
    pub cycle_completed: bool,
}

impl Default for LoopCommands {
    fn default() -> Self {
        Self {
            pattern: AnimationPattern::Idle,
            pattern_origin_ms: 0,
            begin_call: false,
            play_success_clip: false,
            call_completed: None,
            heartbeat_fired: false,
            cycle_completed: false,
        }
    }
}

impl LoopCommands {
    /// Switch pattern and restart its clock.
    pub fn set_pattern(&mut self, pattern: AnimationPattern, origin_ms: u64) {
        self.pattern = pattern;
        self.pattern_origin_ms = origin_ms;
    }

    /// Clear every one-shot flag, keeping the pattern.
    pub fn clear_one_shots(&mut self) {
        self.begin_call = false;
        self.play_success_clip = false;
        self.call_completed = None;
        self.heartbeat_fired = false;
        self.cycle_completed = false;
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every phase handler function.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic milliseconds at the start of this frame.
    pub now_ms: u64,
    /// Monotonic milliseconds when the current phase was entered.
    pub phase_entered_ms: u64,

    // -- Frame data --
    pub inputs: LoopInputs,
    pub commands: LoopCommands,

    // -- Cycle state --
    /// Outcome driving the current feedback pulse.
    pub feedback: Option<CallOutcome>,
    /// Idle heartbeat timer.  Survives every cycle.
    pub heartbeat: HeartbeatScheduler,

    // -- Configuration --
    pub config: SystemConfig,
}

impl FsmContext {
    /// Create a new context; the heartbeat interval starts counting at `now_ms`.
    pub fn new(config: SystemConfig, now_ms: u64) -> Self {
        let heartbeat = HeartbeatScheduler::new(
            config.heartbeat_interval_ms,
            config.heartbeat_duration_ms,
            now_ms,
        );
        Self {
            now_ms,
            phase_entered_ms: now_ms,
            inputs: LoopInputs::default(),
            commands: LoopCommands::default(),
            feedback: None,
            heartbeat,
            config,
        }
    }

    /// Milliseconds elapsed since the current phase was entered.
    pub fn ms_in_phase(&self) -> u64 {
        self.now_ms.saturating_sub(self.phase_entered_ms)
    }

    /// Milliseconds elapsed on the current pattern's clock.
    pub fn pattern_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.commands.pattern_origin_ms)
    }
}
