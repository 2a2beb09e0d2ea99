//! Frame animator for the addressable ring.
//!
//! Every pattern is a pure function of `(pattern, elapsed_ms, ring_len)`:
//! no state, no I/O, safe to call at any frame rate.  The orchestrator
//! keeps the pattern origin time and hands the elapsed value in; the
//! pixel ring driver takes the resulting [`Frame`] to the hardware.
//!
//! ## Pattern types
//!
//! | Pattern    | Description                                   | Finite |
//! |-----------|-----------------------------------------------|--------|
//! | Idle       | Every pixel off                               | no     |
//! | Chase      | Lit segment rotating one pixel per step       | no     |
//! | Heartbeat  | Brief dim glow once per interval              | no     |
//! | SinePulse  | Whole ring, brightness 0.25 → 1.0 → 0.25      | yes    |

use core::f64::consts::PI;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

pub const OFF: Rgb = (0, 0, 0);

/// Largest ring the frame buffer can hold.
pub const MAX_RING_PIXELS: usize = 64;

/// One colour per ring position, index 0 first.
pub type Frame = heapless::Vec<Rgb, MAX_RING_PIXELS>;

/// Brightness floor for the sine pulse: the ring never goes fully dark
/// mid-pulse.
pub const PULSE_FLOOR: f64 = 0.25;

/// Pattern descriptor.  Durations are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPattern {
    Idle,
    Chase {
        colour: Rgb,
        size: u16,
        spacing: u16,
        step_ms: u32,
    },
    /// `elapsed` is measured from the last heartbeat fire.
    Heartbeat {
        colour: Rgb,
        interval_ms: u32,
        duration_ms: u32,
    },
    SinePulse {
        colour: Rgb,
        duration_ms: u32,
        steps: u16,
    },
}

impl AnimationPattern {
    /// Whether a finite pattern has played out.  Only `SinePulse` ends:
    /// once step `steps` has been held for one step period.
    pub fn is_finished(&self, elapsed_ms: u64) -> bool {
        match *self {
            Self::SinePulse {
                duration_ms, steps, ..
            } => {
                // elapsed >= (steps + 1) * duration / steps, kept in integers.
                let steps = u64::from(steps.max(1));
                elapsed_ms * steps >= u64::from(duration_ms) * (steps + 1)
            }
            _ => false,
        }
    }
}

/// Render one frame of `pattern` at `elapsed_ms` since the pattern origin.
pub fn render(pattern: &AnimationPattern, elapsed_ms: u64, ring_len: usize) -> Frame {
    let len = ring_len.min(MAX_RING_PIXELS);
    let mut frame = Frame::new();

    match *pattern {
        AnimationPattern::Idle => fill(&mut frame, OFF, len),
        AnimationPattern::Chase {
            colour,
            size,
            spacing,
            step_ms,
        } => {
            let head = chase_position(elapsed_ms, step_ms, size, spacing);
            let cycle = usize::from(size) + usize::from(spacing);
            for i in 0..len {
                // Offset of pixel i past the head, wrapped to the chase cycle.
                let offset = (i + cycle - head % cycle.max(1)) % cycle.max(1);
                let lit = offset < usize::from(size);
                let _ = frame.push(if lit { colour } else { OFF });
            }
        }
        AnimationPattern::Heartbeat {
            colour,
            interval_ms,
            duration_ms,
        } => {
            let on = heartbeat_lit(elapsed_ms, interval_ms, duration_ms);
            fill(&mut frame, if on { colour } else { OFF }, len);
        }
        AnimationPattern::SinePulse {
            colour,
            duration_ms,
            steps,
        } => {
            let step = pulse_step(elapsed_ms, duration_ms, steps);
            fill(&mut frame, scale(colour, pulse_brightness(step, steps)), len);
        }
    }
    frame
}

/// Index of the first lit chase pixel:
/// `floor(elapsed / step) mod (size + spacing)`.
pub fn chase_position(elapsed_ms: u64, step_ms: u32, size: u16, spacing: u16) -> usize {
    let cycle = u64::from(size) + u64::from(spacing);
    if cycle == 0 {
        return 0;
    }
    ((elapsed_ms / u64::from(step_ms.max(1))) % cycle) as usize
}

/// Heartbeat window: lit for `duration` once `interval` has passed since
/// the last fire.
pub fn heartbeat_lit(since_fire_ms: u64, interval_ms: u32, duration_ms: u32) -> bool {
    let start = u64::from(interval_ms);
    since_fire_ms >= start && since_fire_ms < start + u64::from(duration_ms)
}

/// Step index in `[0, steps]`, advancing every `duration / steps`.
/// Holds at `steps` once the pulse has run its course.
pub fn pulse_step(elapsed_ms: u64, duration_ms: u32, steps: u16) -> u16 {
    if duration_ms == 0 {
        return steps;
    }
    let step = elapsed_ms * u64::from(steps) / u64::from(duration_ms);
    step.min(u64::from(steps)) as u16
}

/// `k(i) = 0.25 + 0.75 * sin(i / steps * π)`, clamped to `[0.25, 1.0]`.
pub fn pulse_brightness(step: u16, steps: u16) -> f64 {
    if steps == 0 {
        return PULSE_FLOOR;
    }
    let t = (f64::from(step.min(steps)) / f64::from(steps)) * PI;
    (PULSE_FLOOR + (1.0 - PULSE_FLOOR) * t.sin()).clamp(PULSE_FLOOR, 1.0)
}

/// Multiply each channel by `k`, truncating toward zero.
pub fn scale(colour: Rgb, k: f64) -> Rgb {
    let (r, g, b) = colour;
    let ch = |c: u8| (f64::from(c) * k) as u8;
    (ch(r), ch(g), ch(b))
}

fn fill(frame: &mut Frame, colour: Rgb, len: usize) {
    for _ in 0..len {
        let _ = frame.push(colour);
    }
}
