//! Addressable RGB ring driver.
//!
//! Takes a rendered [`Frame`] from the orchestrator, applies the global
//! brightness cap, and pushes it to the LEDs.  Only the main loop holds
//! the ring, so no locking is needed around the pixel buffer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: WS2812 (GRB, 800 kHz) bit-banged through an RMT TX channel.
//! On host/test: keeps the last frame in memory for inspection.
//!
//! | Bit | High  | Low   |
//! |-----|-------|-------|
//! | 0   | 350ns | 800ns |
//! | 1   | 700ns | 600ns |

use log::info;

use crate::app::ports::PixelSink;
use crate::drivers::led_patterns::{Frame, MAX_RING_PIXELS, Rgb};

#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::OutputPin;
#[cfg(target_os = "espidf")]
use esp_idf_hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_hal::rmt::config::TransmitConfig;
#[cfg(target_os = "espidf")]
use esp_idf_hal::rmt::{PinState, Pulse, RmtChannel, TxRmtDriver, VariableLengthSignal};

/// Scale one colour by the brightness cap (0-100 %), truncating.
pub fn apply_brightness(colour: Rgb, percent: u8) -> Rgb {
    let pct = u16::from(percent.min(100));
    let ch = |c: u8| (u16::from(c) * pct / 100) as u8;
    (ch(colour.0), ch(colour.1), ch(colour.2))
}

#[cfg(target_os = "espidf")]
struct Ws2812Timing {
    zero: (Pulse, Pulse),
    one: (Pulse, Pulse),
}

pub struct PixelRing {
    len: usize,
    brightness_percent: u8,
    /// Last frame sent, after the brightness cap.
    last: Frame,
    shown: u64,
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
    #[cfg(target_os = "espidf")]
    timing: Ws2812Timing,
    #[cfg(target_os = "espidf")]
    tx_errors: u32,
}

impl PixelRing {
    /// Claim an RMT channel and data pin for a ring of `len` pixels.
    #[cfg(target_os = "espidf")]
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = impl OutputPin> + 'static,
        len: usize,
        brightness_percent: u8,
    ) -> anyhow::Result<Self> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;
        let hz = tx.counter_clock()?;
        let pulse = |state, ns| Pulse::new_with_duration(hz, state, &Duration::from_nanos(ns));
        let timing = Ws2812Timing {
            zero: (pulse(PinState::High, 350)?, pulse(PinState::Low, 800)?),
            one: (pulse(PinState::High, 700)?, pulse(PinState::Low, 600)?),
        };
        info!(
            "PixelRing: {} pixels on RMT, brightness cap {}%",
            len, brightness_percent
        );
        let mut ring = Self {
            len: len.min(MAX_RING_PIXELS),
            brightness_percent,
            last: Frame::new(),
            shown: 0,
            tx,
            timing,
            tx_errors: 0,
        };
        ring.clear();
        Ok(ring)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(len: usize, brightness_percent: u8) -> Self {
        info!(
            "PixelRing(sim): {} pixels, brightness cap {}%",
            len, brightness_percent
        );
        Self {
            len: len.min(MAX_RING_PIXELS),
            brightness_percent,
            last: Frame::new(),
            shown: 0,
        }
    }

    /// All pixels off.
    pub fn clear(&mut self) {
        let mut off = Frame::new();
        for _ in 0..self.len {
            let _ = off.push((0, 0, 0));
        }
        self.show(&off);
    }

    pub fn last_frame(&self) -> &[Rgb] {
        &self.last
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(target_os = "espidf")]
    fn transmit(&mut self) {
        let mut signal = VariableLengthSignal::with_capacity(self.last.len() * 24 * 2);
        for &(r, g, b) in &self.last {
            // WS2812 wants green first, MSB first.
            let grb = (u32::from(g) << 16) | (u32::from(r) << 8) | u32::from(b);
            for bit in (0..24).rev() {
                let (hi, lo) = if (grb >> bit) & 1 == 1 {
                    &self.timing.one
                } else {
                    &self.timing.zero
                };
                if signal.push([hi, lo]).is_err() {
                    return;
                }
            }
        }
        if let Err(e) = self.tx.start_blocking(&signal) {
            self.tx_errors = self.tx_errors.wrapping_add(1);
            if self.tx_errors % 1000 == 1 {
                log::warn!("PixelRing: RMT transmit failed ({})", e);
            }
        }
    }
}

impl PixelSink for PixelRing {
    fn show(&mut self, frame: &[Rgb]) {
        self.last.clear();
        for &px in frame.iter().take(self.len) {
            let _ = self.last.push(apply_brightness(px, self.brightness_percent));
        }
        // Short frames leave the tail dark.
        while self.last.len() < self.len {
            let _ = self.last.push((0, 0, 0));
        }
        self.shown += 1;

        #[cfg(target_os = "espidf")]
        self.transmit();
    }
}
