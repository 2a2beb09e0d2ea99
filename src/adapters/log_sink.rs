//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    cycles: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cycles completed since boot.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | initial_phase={}", phase);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from, to);
            }
            AppEvent::CallStarted => {
                info!("CALL  | started");
            }
            AppEvent::CallCompleted(outcome) => match outcome {
                crate::webhook::CallOutcome::Success => info!("CALL  | success"),
                crate::webhook::CallOutcome::Failure(reason) => {
                    warn!("CALL  | failed: {}", reason);
                }
            },
            AppEvent::AudioStarted(clip) => {
                info!("AUDIO | playing '{}'", clip);
            }
            AppEvent::AudioSkipped(err) => {
                warn!("AUDIO | skipped: {}", err);
            }
            AppEvent::HeartbeatGlow => {
                log::debug!("HBEAT | glow");
            }
            AppEvent::CycleCompleted { heartbeat_reset_ms } => {
                self.cycles = self.cycles.wrapping_add(1);
                info!(
                    "CYCLE | #{} done, heartbeat reset at {}ms",
                    self.cycles, heartbeat_reset_ms
                );
            }
        }
    }
}
