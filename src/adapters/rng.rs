//! Random source for success-clip selection.
//!
//! ESP-IDF: the hardware RNG (`esp_random`).  Host: `RandomState`
//! hashing, which is non-cryptographic but varies per call.  Clip choice
//! needs neither cryptographic strength nor reproducibility.

use crate::app::ports::RandomSource;

#[derive(Debug, Default)]
pub struct HardwareRng;

impl HardwareRng {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for HardwareRng {
    #[cfg(target_os = "espidf")]
    fn next_u32(&mut self) -> u32 {
        // SAFETY: esp_random reads the hardware RNG register; no preconditions.
        unsafe { esp_idf_sys::esp_random() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn next_u32(&mut self) -> u32 {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        let s = RandomState::new();
        s.build_hasher().finish() as u32
    }
}
