//! RFID reader trigger input.
//!
//! ## Hardware
//!
//! The reader's `SIG` line is active-high (HIGH = tag present) with a
//! pull-down on the GPIO.  The monitor samples it synchronously; there is
//! no ISR and no internal state beyond the pin itself.
//!
//! A failed read is coerced to [`TriggerState::Low`], the safe value:
//! the worst case is a missed scan, never a spurious webhook call.
//!
//! ## Edge detection
//!
//! [`EdgeDetector`] turns consecutive samples into edges.  It is owned by
//! the orchestrator so the monitor itself stays stateless.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::TriggerPort;

/// Level of the sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Low,
    High,
}

impl TriggerState {
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl From<bool> for TriggerState {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// A change between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Trigger monitor over any `embedded-hal` input pin.
pub struct TriggerMonitor<P: InputPin> {
    pin: P,
    read_errors: u32,
}

impl<P: InputPin> TriggerMonitor<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            read_errors: 0,
        }
    }

    /// Number of failed reads coerced to `Low` since start-up.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }
}

impl<P: InputPin> TriggerPort for TriggerMonitor<P> {
    fn read(&mut self) -> TriggerState {
        match self.pin.is_high() {
            Ok(high) => TriggerState::from(high),
            Err(e) => {
                self.read_errors = self.read_errors.wrapping_add(1);
                // Log the first failure and then every 1000th to avoid flooding at 100 Hz.
                if self.read_errors % 1000 == 1 {
                    warn!("Trigger: read failed ({:?}), treating as Low", e);
                }
                TriggerState::Low
            }
        }
    }
}

/// Remembers the previous sample and reports edges.
///
/// Starts at `Low`, so a tag already present at boot counts as a rising
/// edge on the first sample.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last: TriggerState,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample; returns the edge it completes, if any.
    pub fn update(&mut self, level: TriggerState) -> Option<Edge> {
        let edge = match (self.last, level) {
            (TriggerState::Low, TriggerState::High) => Some(Edge::Rising),
            (TriggerState::High, TriggerState::Low) => Some(Edge::Falling),
            _ => None,
        };
        self.last = level;
        edge
    }
}
