//! Concrete phase handler functions and table builder.
//!
//! Each phase is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[rising edge]──▶ DEBOUNCING ──[debounce elapsed]──▶ AWAITING_RESULT
//!    ▲                                                             │
//!    │                                           [outcome, busy_min elapsed]
//!    │                                                             ▼
//!    └──[tag removed, heartbeat reset]── WAITING_FOR_RELEASE ◀── FEEDBACK
//!                                                        [pulse done, audio done]
//! ```
//!
//! The heartbeat is only evaluated in IDLE.  WAITING_FOR_RELEASE resets
//! its timer on the way out, so the glow never flashes right after a tag
//! is removed.

use super::context::FsmContext;
use super::{LoopPhase, StateDescriptor};
use crate::drivers::led_patterns::AnimationPattern;
use crate::webhook::CallOutcome;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; LoopPhase::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: LoopPhase::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Debouncing
        StateDescriptor {
            id: LoopPhase::Debouncing,
            name: "Debouncing",
            on_enter: Some(debouncing_enter),
            on_exit: None,
            on_update: debouncing_update,
        },
        // Index 2 — AwaitingResult
        StateDescriptor {
            id: LoopPhase::AwaitingResult,
            name: "AwaitingResult",
            on_enter: Some(awaiting_enter),
            on_exit: None,
            on_update: awaiting_update,
        },
        // Index 3 — Feedback
        StateDescriptor {
            id: LoopPhase::Feedback,
            name: "Feedback",
            on_enter: Some(feedback_enter),
            on_exit: Some(feedback_exit),
            on_update: feedback_update,
        },
        // Index 4 — WaitingForRelease
        StateDescriptor {
            id: LoopPhase::WaitingForRelease,
            name: "WaitingForRelease",
            on_enter: Some(waiting_enter),
            on_exit: None,
            on_update: waiting_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE — ring dark, heartbeat glow when due, watching for a tag
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.set_pattern(AnimationPattern::Idle, ctx.now_ms);
    info!("IDLE: waiting for tag");
}

fn idle_update(ctx: &mut FsmContext) -> Option<LoopPhase> {
    if ctx.inputs.rising_edge {
        info!("IDLE: tag detected at {}ms", ctx.now_ms);
        return Some(LoopPhase::Debouncing);
    }

    let now = ctx.now_ms;
    if let Some(opened) = ctx.heartbeat.glow_opened() {
        if ctx.heartbeat.glow_complete(now) {
            ctx.heartbeat.fire(opened);
            ctx.commands.heartbeat_fired = true;
            ctx.commands.set_pattern(AnimationPattern::Idle, now);
        }
    } else if ctx.heartbeat.due(now) {
        // The glow opens on this frame even if the loop ran late; the
        // pattern lights from `interval` past its origin.
        let interval_ms = ctx.config.heartbeat_interval_ms;
        let pattern = AnimationPattern::Heartbeat {
            colour: ctx.config.heartbeat_colour,
            interval_ms,
            duration_ms: ctx.config.heartbeat_duration_ms,
        };
        ctx.heartbeat.open_glow(now);
        ctx.commands
            .set_pattern(pattern, now.saturating_sub(u64::from(interval_ms)));
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DEBOUNCING — short settle after the rising edge
// ═══════════════════════════════════════════════════════════════════════════

fn debouncing_enter(ctx: &mut FsmContext) {
    ctx.commands.set_pattern(AnimationPattern::Idle, ctx.now_ms);
}

fn debouncing_update(ctx: &mut FsmContext) -> Option<LoopPhase> {
    // Proceeds unconditionally; the level is not re-checked.
    if ctx.ms_in_phase() >= u64::from(ctx.config.debounce_ms) {
        return Some(LoopPhase::AwaitingResult);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_RESULT — busy chase while the worker makes the call
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_enter(ctx: &mut FsmContext) {
    let c = &ctx.config;
    let chase = AnimationPattern::Chase {
        colour: c.chase_colour,
        size: c.chase_size,
        spacing: c.chase_spacing,
        step_ms: c.chase_step_ms,
    };
    ctx.commands.set_pattern(chase, ctx.now_ms);
    ctx.commands.begin_call = true;
    ctx.inputs.outcome = None;
    info!("AWAITING_RESULT: calling webhook");
}

fn awaiting_update(ctx: &mut FsmContext) -> Option<LoopPhase> {
    if ctx.ms_in_phase() < u64::from(ctx.config.busy_min_ms) {
        return None;
    }

    let outcome = ctx.inputs.outcome.take()?;
    info!(
        "AWAITING_RESULT: outcome {:?} after {}ms",
        outcome,
        ctx.ms_in_phase()
    );
    ctx.feedback = Some(outcome);
    ctx.commands.call_completed = Some(outcome);
    Some(LoopPhase::Feedback)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FEEDBACK — success or failure pulse, success clip on top
// ═══════════════════════════════════════════════════════════════════════════

fn feedback_enter(ctx: &mut FsmContext) {
    let success = matches!(ctx.feedback, Some(CallOutcome::Success));
    let colour = if success {
        ctx.config.success_colour
    } else {
        ctx.config.failure_colour
    };
    let pulse = AnimationPattern::SinePulse {
        colour,
        duration_ms: ctx.config.pulse_duration_ms,
        steps: ctx.config.pulse_steps,
    };
    ctx.commands.set_pattern(pulse, ctx.now_ms);

    if success {
        ctx.commands.play_success_clip = true;
        info!("FEEDBACK: success pulse");
    } else {
        warn!("FEEDBACK: failure pulse ({:?})", ctx.feedback);
    }
}

fn feedback_exit(ctx: &mut FsmContext) {
    ctx.feedback = None;
    debug!("FEEDBACK: done after {}ms", ctx.ms_in_phase());
}

fn feedback_update(ctx: &mut FsmContext) -> Option<LoopPhase> {
    let pulse_done = ctx.commands.pattern.is_finished(ctx.pattern_elapsed_ms());
    if pulse_done && !ctx.inputs.audio_playing {
        return Some(LoopPhase::WaitingForRelease);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING_FOR_RELEASE — no retrigger until the tag is gone
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_enter(ctx: &mut FsmContext) {
    ctx.commands.set_pattern(AnimationPattern::Idle, ctx.now_ms);
    debug!("WAITING_FOR_RELEASE: waiting for tag removal");
}

fn waiting_update(ctx: &mut FsmContext) -> Option<LoopPhase> {
    if ctx.inputs.trigger.is_high() {
        return None;
    }
    ctx.heartbeat.reset(ctx.now_ms);
    ctx.commands.cycle_completed = true;
    info!("WAITING_FOR_RELEASE: tag removed at {}ms", ctx.now_ms);
    Some(LoopPhase::Idle)
}
