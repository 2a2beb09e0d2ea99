//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The firmware routes them to
//! the serial log; tests collect them to assert on the cycle timeline.

use crate::fsm::LoopPhase;
use crate::webhook::CallOutcome;

use super::ports::AudioError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial phase).
    Started(LoopPhase),

    /// The loop moved between phases.
    PhaseChanged { from: LoopPhase, to: LoopPhase },

    /// A webhook call was handed to the worker.
    CallStarted,

    /// The call's outcome was consumed and feedback begins.
    CallCompleted(CallOutcome),

    /// A success clip started playing.
    AudioStarted(String),

    /// The success clip could not be played; the pulse runs silently.
    AudioSkipped(AudioError),

    /// The idle heartbeat glow finished and the timer was re-armed.
    HeartbeatGlow,

    /// The tag was removed and the loop is back in idle.
    CycleCompleted { heartbeat_reset_ms: u64 },
}
