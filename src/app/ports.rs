//! Port traits: the hexagonal boundary between the trigger loop and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (reader input, pixel ring, speaker, HTTP, clock) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the orchestration logic never touches hardware and
//! runs unchanged against the mocks in `tests/integration/`.
//!
//! ## Error policy
//!
//! - **TriggerPort** and **PixelSink** are infallible from the caller's view:
//!   adapters coerce read errors to `Low` and log write errors themselves.
//! - **AudioPort** errors are returned; the service logs and skips the clip.
//! - **WebhookClient** folds every transport error into
//!   [`CallOutcome::Failure`]; nothing escapes as a `Result`.

use core::fmt;
use std::time::Duration;

use crate::drivers::led_patterns::Rgb;
use crate::drivers::trigger::TriggerState;
use crate::webhook::{CallOutcome, WebhookPayload};

// ───────────────────────────────────────────────────────────────
// Trigger port (driven adapter: reader → domain)
// ───────────────────────────────────────────────────────────────

/// Samples the reader's tag-present line.
pub trait TriggerPort {
    /// Current level.  Never blocks.
    fn read(&mut self) -> TriggerState;
}

// ───────────────────────────────────────────────────────────────
// Pixel sink (driven adapter: domain → ring)
// ───────────────────────────────────────────────────────────────

/// Pushes a full frame to the ring.  Only the main loop calls this.
pub trait PixelSink {
    /// `frame[i]` is the colour of ring position `i`.  Adapters apply the
    /// global brightness cap on the way out.
    fn show(&mut self, frame: &[Rgb]);
}

// ───────────────────────────────────────────────────────────────
// Audio port (driven adapter: domain → speaker)
// ───────────────────────────────────────────────────────────────

/// Opaque handle to one clip playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u32);

/// Why a clip could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioError {
    /// No `<dir>/<clip>.wav` on the filesystem.
    ClipMissing,
    /// File exists but is not PCM WAV the output can play.
    UnsupportedFormat,
    /// Read or output device error.
    Io,
    /// Another clip is still playing.
    Busy,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClipMissing => write!(f, "clip not found"),
            Self::UnsupportedFormat => write!(f, "unsupported audio format"),
            Self::Io => write!(f, "audio I/O error"),
            Self::Busy => write!(f, "audio output busy"),
        }
    }
}

/// Starts clips without blocking the loop.
pub trait AudioPort {
    /// Begin playing `clip` (a bare name, no directory or extension).
    fn play(&mut self, clip: &str) -> Result<PlaybackHandle, AudioError>;

    /// Whether the playback behind `handle` is still running.
    fn is_playing(&self, handle: PlaybackHandle) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Webhook (driven adapters: domain → Home Assistant)
// ───────────────────────────────────────────────────────────────

/// Blocking HTTP client.  Runs on the webhook worker thread only.
pub trait WebhookClient {
    /// POST `payload` and classify the result.  Must return within
    /// roughly `timeout`.
    fn call(&mut self, payload: &WebhookPayload, timeout: Duration) -> CallOutcome;
}

/// Non-blocking view of an in-flight call, used by the main loop.
pub trait CallPort {
    /// Start a call.  Ignored if one is already in flight.
    fn begin(&mut self, payload: WebhookPayload);

    /// Take the outcome if the call has finished.  Returns each outcome
    /// exactly once.
    fn poll(&mut self) -> Option<CallOutcome>;
}

// ───────────────────────────────────────────────────────────────
// Clock, randomness, events
// ───────────────────────────────────────────────────────────────

/// Time source for the loop.
pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Wall-clock seconds since the Unix epoch, or `None` until the clock
    /// has been synchronised.
    fn epoch_secs(&self) -> Option<f64>;

    /// Block the calling thread for `ms`.
    fn sleep_ms(&self, ms: u32);
}

/// Source of clip-selection randomness.
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;
}

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
