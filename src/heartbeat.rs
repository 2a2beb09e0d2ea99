//! Idle heartbeat scheduler.
//!
//! Decides when the idle ring should show its brief "still alive" glow.
//! The scheduler keeps the last-fire timestamp and, while a glow is on
//! screen, the time it opened.  The glow itself is rendered by
//! [`AnimationPattern::Heartbeat`](crate::drivers::led_patterns::AnimationPattern).
//!
//! ```text
//!  last_fire        opened (>= last_fire + interval)   + duration
//!      │────── off ──────│──────── glow ────────│── fire(opened) ──▶
//! ```
//!
//! Once the glow has been displayed the orchestrator calls
//! [`fire`](HeartbeatScheduler::fire) with the time it opened, so glows
//! start every `interval` rather than every `interval + duration`.
//! [`reset`](HeartbeatScheduler::reset) runs whenever a trigger cycle
//! completes so the glow does not flash right after a tag is removed.

use log::debug;

/// Heartbeat timing state.  Lives for the whole process.
#[derive(Debug, Clone)]
pub struct HeartbeatScheduler {
    interval_ms: u32,
    duration_ms: u32,
    /// Monotonic time of the last glow (or reset), milliseconds since boot.
    last_fire_ms: u64,
    /// When the glow on screen opened, if one is.
    glow_opened_ms: Option<u64>,
}

impl HeartbeatScheduler {
    pub fn new(interval_ms: u32, duration_ms: u32, now_ms: u64) -> Self {
        Self {
            interval_ms,
            duration_ms,
            last_fire_ms: now_ms,
            glow_opened_ms: None,
        }
    }

    /// `true` iff `now - last_fire >= interval`.
    pub fn due(&self, now_ms: u64) -> bool {
        self.since_fire(now_ms) >= u64::from(self.interval_ms)
    }

    /// Record a heartbeat at `now_ms`; returns the new last-fire time.
    /// Any glow in progress is forgotten.
    pub fn fire(&mut self, now_ms: u64) -> u64 {
        self.last_fire_ms = now_ms;
        self.glow_opened_ms = None;
        self.last_fire_ms
    }

    /// Mark the glow as on screen from `now_ms`.
    pub fn open_glow(&mut self, now_ms: u64) {
        self.glow_opened_ms = Some(now_ms);
    }

    pub fn glow_opened(&self) -> Option<u64> {
        self.glow_opened_ms
    }

    /// Restart the interval from `now_ms` after a trigger cycle.
    pub fn reset(&mut self, now_ms: u64) {
        debug!("Heartbeat: timer reset at {}ms", now_ms);
        self.fire(now_ms);
    }

    /// Whether an opened glow has been on screen for its full duration.
    pub fn glow_complete(&self, now_ms: u64) -> bool {
        self.glow_opened_ms
            .is_some_and(|opened| now_ms.saturating_sub(opened) >= u64::from(self.duration_ms))
    }

    /// Milliseconds since the last fire (saturating).
    pub fn since_fire(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_fire_ms)
    }

    pub fn last_fire(&self) -> u64 {
        self.last_fire_ms
    }
}
