//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the reader's trigger monitor and the pixel ring, exposing them
//! through [`TriggerPort`] and [`PixelSink`].  On non-espidf targets the
//! ring is the in-memory simulation and the pin is whatever the caller
//! passes in.

use embedded_hal::digital::InputPin;

use crate::app::ports::{PixelSink, TriggerPort};
use crate::drivers::led_patterns::Rgb;
use crate::drivers::pixel_ring::PixelRing;
use crate::drivers::trigger::{TriggerMonitor, TriggerState};

/// Concrete adapter that combines the ring and the reader input.
pub struct HardwareAdapter<P: InputPin> {
    trigger: TriggerMonitor<P>,
    ring: PixelRing,
}

impl<P: InputPin> HardwareAdapter<P> {
    pub fn new(trigger: TriggerMonitor<P>, ring: PixelRing) -> Self {
        Self { trigger, ring }
    }

    pub fn ring(&self) -> &PixelRing {
        &self.ring
    }
}

// ── TriggerPort implementation ────────────────────────────────

impl<P: InputPin> TriggerPort for HardwareAdapter<P> {
    fn read(&mut self) -> TriggerState {
        self.trigger.read()
    }
}

// ── PixelSink implementation ──────────────────────────────────

impl<P: InputPin> PixelSink for HardwareAdapter<P> {
    fn show(&mut self, frame: &[Rgb]) {
        self.ring.show(frame);
    }
}

// ── Host simulation input ─────────────────────────────────────

/// Reader line for host runs: a shared flag flipped by the simulation
/// driver in `main`.
#[cfg(not(target_os = "espidf"))]
#[derive(Clone, Default)]
pub struct SimTriggerPin {
    level: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(not(target_os = "espidf"))]
impl SimTriggerPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, high: bool) {
        self.level
            .store(high, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::digital::ErrorType for SimTriggerPin {
    type Error = core::convert::Infallible;
}

#[cfg(not(target_os = "espidf"))]
impl InputPin for SimTriggerPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.load(std::sync::atomic::Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|h| !h)
    }
}
