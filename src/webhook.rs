//! Webhook call: payload, outcome classification, and the worker handoff.
//!
//! The HTTP POST itself is blocking (up to the client's own timeout), so
//! it runs on a dedicated worker thread while the main loop keeps
//! rendering frames.  Requests and results cross the thread boundary via
//! two `embassy-sync` signals, each with one writer and one reader:
//!
//! ```text
//!  ┌──────────────┐  WebhookPayload  ┌───────────────┐
//!  │  Main loop   │────────────────▶│  Worker thread │──▶ WebhookClient::call
//!  │ (renders px) │◀────────────────│  (blocking)    │
//!  └──────────────┘   CallOutcome    └───────────────┘
//! ```
//!
//! Only the main loop writes pixels; the worker never sees the ring.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{CallPort, WebhookClient};

/// Event name sent in every payload.
pub const EVENT_RFID_SCAN: &str = "rfid_scan";

/// Worker stack size; the ESP-IDF HTTP client and TLS need headroom.
const WORKER_STACK_BYTES: usize = 16 * 1024;

// ───────────────────────────────────────────────────────────────
// Payload
// ───────────────────────────────────────────────────────────────

/// JSON body of the POST: `{"event": "rfid_scan", "ts": <secs>, "device": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub event: &'static str,
    /// Epoch seconds when the clock is synced, otherwise seconds since boot.
    pub ts: f64,
    pub device: String,
}

impl WebhookPayload {
    pub fn scan(device: &str, ts: f64) -> Self {
        Self {
            event: EVENT_RFID_SCAN,
            ts,
            device: device.to_owned(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ───────────────────────────────────────────────────────────────
// Outcome
// ───────────────────────────────────────────────────────────────

/// Why a call did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Server answered with a non-2xx status.
    Status(u16),
    /// Could not connect or the connection broke mid-request.
    Connection,
    /// The client's own timeout expired.
    Timeout,
    /// The worker thread is gone; no call could be made.
    WorkerGone,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Connection => write!(f, "connection error"),
            Self::Timeout => write!(f, "request timed out"),
            Self::WorkerGone => write!(f, "webhook worker unavailable"),
        }
    }
}

/// Result of one webhook invocation, produced once per trigger cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure(FailureReason),
}

impl CallOutcome {
    /// 2xx is success; anything else is a failure carrying the status.
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Self::Success
        } else {
            Self::Failure(FailureReason::Status(status))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// ───────────────────────────────────────────────────────────────
// Worker handoff
// ───────────────────────────────────────────────────────────────

type Slot<T> = Signal<CriticalSectionRawMutex, T>;

/// Runs a blocking [`WebhookClient`] on its own thread and exposes it as
/// a non-blocking [`CallPort`].
///
/// At most one call is in flight.  A `begin` while busy is refused, so a
/// cycle can never produce two outcomes.
pub struct ThreadedWebhook {
    request: Arc<Slot<WebhookPayload>>,
    result: Arc<Slot<CallOutcome>>,
    in_flight: bool,
    worker_alive: bool,
}

impl ThreadedWebhook {
    /// Spawn the worker.  `timeout` is handed to every `call`.
    pub fn spawn<C>(mut client: C, timeout: Duration) -> Self
    where
        C: WebhookClient + Send + 'static,
    {
        let request: Arc<Slot<WebhookPayload>> = Arc::new(Signal::new());
        let result: Arc<Slot<CallOutcome>> = Arc::new(Signal::new());

        let req = Arc::clone(&request);
        let res = Arc::clone(&result);
        let spawned = std::thread::Builder::new()
            .name("webhook".into())
            .stack_size(WORKER_STACK_BYTES)
            .spawn(move || {
                info!("Webhook worker: started");
                loop {
                    let payload = futures_lite::future::block_on(req.wait());
                    let outcome = client.call(&payload, timeout);
                    res.signal(outcome);
                }
            });

        let worker_alive = match spawned {
            Ok(_) => true,
            Err(e) => {
                warn!("Webhook worker: spawn failed ({}), every call will fail", e);
                false
            }
        };

        Self {
            request,
            result,
            in_flight: false,
            worker_alive,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

impl CallPort for ThreadedWebhook {
    fn begin(&mut self, payload: WebhookPayload) {
        if self.in_flight {
            warn!("Webhook: call already in flight, ignoring new request");
            return;
        }
        self.in_flight = true;
        if !self.worker_alive {
            self.result.signal(CallOutcome::Failure(FailureReason::WorkerGone));
            return;
        }
        // Drop any stale result before handing out the request.
        self.result.reset();
        self.request.signal(payload);
    }

    fn poll(&mut self) -> Option<CallOutcome> {
        if !self.in_flight {
            return None;
        }
        let outcome = self.result.try_take()?;
        self.in_flight = false;
        Some(outcome)
    }
}
