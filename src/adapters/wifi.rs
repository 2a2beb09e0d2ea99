//! WiFi station-mode adapter.
//!
//! Brings the station up once at boot (blocking, before the trigger loop
//! starts) and keeps it up afterwards from the loop's idle hook.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: simulation stubs for host-side runs and tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) between attempts.  Reconnect attempts from
//! [`poll`](WifiStation::poll) never block the loop; a webhook call made
//! while the link is down simply fails with a connection error.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Errors and state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

/// Next wait after a failed attempt: doubled, capped at 60 s.
pub fn next_backoff_ms(current_ms: u32) -> u32 {
    current_ms.saturating_mul(2).min(MAX_BACKOFF_MS)
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

pub struct WifiStation {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: u32,
    next_attempt_ms: u64,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiStation {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            next_attempt_ms: 0,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            next_attempt_ms: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Blocking first connect.  On failure the station is left in
    /// `Reconnecting` so `poll` keeps trying.
    pub fn connect(&mut self, now_ms: u64) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.on_connected();
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.next_attempt_ms = now_ms + u64::from(self.backoff_ms);
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    /// Called once per loop iteration.  Detects link loss and retries
    /// on the backoff schedule without blocking.
    pub fn poll(&mut self, now_ms: u64) {
        match self.state {
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.backoff_ms = INITIAL_BACKOFF_MS;
                    self.next_attempt_ms = now_ms + u64::from(self.backoff_ms);
                }
            }
            WifiState::Reconnecting { attempt } => {
                if self.platform_is_connected() {
                    self.on_connected();
                    return;
                }
                if now_ms < self.next_attempt_ms {
                    return;
                }
                info!(
                    "WiFi: reconnect attempt {} (backoff {}ms)",
                    attempt + 1,
                    self.backoff_ms
                );
                if let Err(e) = self.platform_begin_reconnect() {
                    warn!("WiFi: reconnect request failed: {}", e);
                }
                self.backoff_ms = next_backoff_ms(self.backoff_ms);
                self.next_attempt_ms = now_ms + u64::from(self.backoff_ms);
                self.state = WifiState::Reconnecting {
                    attempt: attempt + 1,
                };
            }
            WifiState::Disconnected => {}
        }
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        info!("WiFi: connected to '{}'", self.ssid);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            auth_method,
            ..Default::default()
        });
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(espidf): {}", e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&config).map_err(fail)?;
        if !self.wifi.is_started().map_err(fail)? {
            self.wifi.start().map_err(fail)?;
        }
        self.wifi.connect().map_err(fail)?;
        self.wifi.wait_netif_up().map_err(fail)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    /// Kick off an association without waiting for it.
    #[cfg(target_os = "espidf")]
    fn platform_begin_reconnect(&mut self) -> Result<(), ConnectivityError> {
        self.wifi
            .wifi_mut()
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_reconnect(&mut self) -> Result<(), ConnectivityError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiStation {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
