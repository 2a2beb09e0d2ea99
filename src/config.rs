//! System configuration parameters
//!
//! All tunable parameters for the TagRing device.  Secrets (Wi-Fi and
//! Home Assistant credentials) live in [`Credentials`] and are baked in at
//! build time; everything else has a compiled-in default.
//!
//! Both are validated once at start-up.  A configuration error is fatal:
//! `main` refuses to start the event loop.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::led_patterns::{MAX_RING_PIXELS, Rgb};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `chase_size + chase_spacing` does not cover the ring exactly.
    RingGeometry,
    /// Ring is empty or larger than the frame buffer.
    PixelCount,
    /// A timing field that must be non-zero is zero.
    ZeroDuration(&'static str),
    /// A field is outside its allowed range.
    OutOfRange(&'static str),
    /// A required credential was not provided at build time.
    MissingCredential(&'static str),
    /// A credential is present but malformed.
    InvalidCredential(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RingGeometry => write!(f, "chase size + spacing must equal the ring pixel count"),
            Self::PixelCount => write!(f, "pixel count must be 1-{}", MAX_RING_PIXELS),
            Self::ZeroDuration(field) => write!(f, "{field} must be non-zero"),
            Self::OutOfRange(field) => write!(f, "{field} out of range"),
            Self::MissingCredential(name) => write!(f, "missing credential {name}"),
            Self::InvalidCredential(name) => write!(f, "invalid credential {name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// SystemConfig
// ---------------------------------------------------------------------------

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Ring ---
    /// Number of addressable pixels on the ring.
    pub pixel_count: u16,
    /// Global brightness cap applied at output (0-100%).
    pub brightness_percent: u8,

    // --- Busy chase ---
    pub chase_colour: Rgb,
    /// Lit segment length in pixels.
    pub chase_size: u16,
    /// Dark pixels between segments; `chase_size + chase_spacing == pixel_count`.
    pub chase_spacing: u16,
    /// Time for the segment to advance one pixel (milliseconds).
    pub chase_step_ms: u32,
    /// Minimum time the chase is shown before an outcome is consumed.
    pub busy_min_ms: u32,

    // --- Idle heartbeat ---
    pub heartbeat_interval_ms: u32,
    pub heartbeat_duration_ms: u32,
    pub heartbeat_colour: Rgb,

    // --- Feedback pulse ---
    pub pulse_duration_ms: u32,
    pub pulse_steps: u16,
    pub success_colour: Rgb,
    pub failure_colour: Rgb,

    // --- Audio ---
    /// Directory holding `<clip>.wav` files.
    pub audio_dir: String,
    /// Clips picked uniformly at random on success.  There are no failure clips.
    pub success_clips: Vec<String>,

    // --- Webhook ---
    /// Value of the `device` field in the webhook payload.
    pub device_name: String,
    pub http_timeout_ms: u32,
    /// Skip the network and pretend every call succeeds.
    pub simulate_webhook: bool,
    pub simulated_call_ms: u32,

    // --- Timing ---
    /// Main loop frame / sensor poll interval (milliseconds).
    pub frame_interval_ms: u32,
    /// Settle time after a rising edge before the call starts.
    pub debounce_ms: u32,
    /// Task watchdog timeout (milliseconds).
    pub watchdog_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Ring
            pixel_count: 16,
            brightness_percent: 20,

            // Chase: warm white (less blue, more amber)
            chase_colour: (180, 160, 120),
            chase_size: 4,
            chase_spacing: 12,
            chase_step_ms: 30,
            busy_min_ms: 2000,

            // Heartbeat: very dim warm glow for a moment every 10s
            heartbeat_interval_ms: 10_000,
            heartbeat_duration_ms: 250,
            heartbeat_colour: (8, 6, 3),

            // Pulse
            pulse_duration_ms: 3000,
            pulse_steps: 40,
            success_colour: (0, 120, 0),
            failure_colour: (120, 0, 0),

            // Audio
            audio_dir: String::from("sounds"),
            success_clips: ["chime", "excellent", "hello", "operational", "startours"]
                .into_iter()
                .map(String::from)
                .collect(),

            // Webhook
            device_name: String::from("magicband_v2"),
            http_timeout_ms: 5000,
            simulate_webhook: false,
            simulated_call_ms: 2000,

            // Timing
            frame_interval_ms: 10,
            debounce_ms: 20,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Called once before the loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pixel_count == 0 || self.pixel_count as usize > MAX_RING_PIXELS {
            return Err(ConfigError::PixelCount);
        }
        if self.chase_size == 0
            || u32::from(self.chase_size) + u32::from(self.chase_spacing)
                != u32::from(self.pixel_count)
        {
            return Err(ConfigError::RingGeometry);
        }
        if self.brightness_percent > 100 {
            return Err(ConfigError::OutOfRange("brightness_percent"));
        }

        let non_zero = [
            ("chase_step_ms", self.chase_step_ms),
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("pulse_duration_ms", self.pulse_duration_ms),
            ("pulse_steps", u32::from(self.pulse_steps)),
            ("http_timeout_ms", self.http_timeout_ms),
            ("frame_interval_ms", self.frame_interval_ms),
            ("watchdog_timeout_ms", self.watchdog_timeout_ms),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroDuration(field));
        }

        // The loop must come round often enough to feed the watchdog.
        if self.frame_interval_ms >= self.watchdog_timeout_ms {
            return Err(ConfigError::OutOfRange("frame_interval_ms"));
        }
        Ok(())
    }

    /// Ring length as a `usize` for frame sizing.
    pub fn ring_len(&self) -> usize {
        self.pixel_count as usize
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Network secrets, set in the build environment (e.g. `.cargo/config.toml`).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Home Assistant base URL, e.g. `https://ha.local:8123`.
    pub ha_base_url: String,
    pub webhook_id: String,
}

impl Credentials {
    /// Read the credentials captured at build time.
    pub fn from_build_env() -> Self {
        Self {
            wifi_ssid: option_env!("TAGRING_WIFI_SSID").unwrap_or_default().to_owned(),
            wifi_password: option_env!("TAGRING_WIFI_PASSWORD")
                .unwrap_or_default()
                .to_owned(),
            ha_base_url: option_env!("TAGRING_HA_BASE_URL").unwrap_or_default().to_owned(),
            webhook_id: option_env!("TAGRING_WEBHOOK_ID").unwrap_or_default().to_owned(),
        }
    }

    /// Presence and shape checks.  Wi-Fi SSID/password format is checked
    /// again by the Wi-Fi adapter when the credentials are applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.is_empty() {
            return Err(ConfigError::MissingCredential("TAGRING_WIFI_SSID"));
        }
        if self.ha_base_url.is_empty() {
            return Err(ConfigError::MissingCredential("TAGRING_HA_BASE_URL"));
        }
        if !(self.ha_base_url.starts_with("http://") || self.ha_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidCredential("TAGRING_HA_BASE_URL"));
        }
        if self.webhook_id.is_empty() {
            return Err(ConfigError::MissingCredential("TAGRING_WEBHOOK_ID"));
        }
        if !self.webhook_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            return Err(ConfigError::InvalidCredential("TAGRING_WEBHOOK_ID"));
        }
        Ok(())
    }

    /// Full Home Assistant webhook endpoint.
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/api/webhook/{}",
            self.ha_base_url.trim_end_matches('/'),
            self.webhook_id
        )
    }
}
