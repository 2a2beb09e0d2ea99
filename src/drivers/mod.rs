//! Peripheral drivers and the pure frame animator.

pub mod led_patterns;
pub mod pixel_ring;
pub mod trigger;
pub mod watchdog;
