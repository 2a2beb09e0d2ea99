//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the trigger loop.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`
//!   (microsecond precision), wall clock from `gettimeofday`.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `SystemTime` for host-side simulation.

use crate::app::ports::ClockPort;

/// Anything earlier than 2020-01-01 means SNTP has not set the clock yet.
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: reads the high-resolution timer; no preconditions.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since start (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn wall_clock(&self) -> Option<(i64, i64)> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some((tv.tv_sec as i64, tv.tv_usec as i64))
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_clock(&self) -> Option<(i64, i64)> {
        let d = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        Some((d.as_secs() as i64, i64::from(d.subsec_micros())))
    }
}

/// Epoch seconds as a float, or `None` if the clock is clearly unsynced.
pub fn synced_epoch_secs(secs: i64, micros: i64) -> Option<f64> {
    if secs < EPOCH_2020 {
        return None;
    }
    Some(secs as f64 + micros as f64 / 1_000_000.0)
}

impl ClockPort for Esp32TimeAdapter {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }

    fn epoch_secs(&self) -> Option<f64> {
        let (secs, micros) = self.wall_clock()?;
        synced_epoch_secs(secs, micros)
    }

    fn sleep_ms(&self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsynced_clock_rejected() {
        assert_eq!(synced_epoch_secs(3_600, 0), None);
        assert_eq!(synced_epoch_secs(EPOCH_2020 - 1, 999_999), None);
    }

    #[test]
    fn synced_clock_has_fraction() {
        let t = synced_epoch_secs(1_700_000_000, 250_000).unwrap();
        assert!((t - 1_700_000_000.25).abs() < 1e-6);
    }

    #[test]
    fn monotonic_now_advances() {
        let clock = Esp32TimeAdapter::new();
        let a = clock.now_ms();
        clock.sleep_ms(5);
        assert!(clock.now_ms() >= a + 5);
    }
}
