//! TagRing Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single cooperative trigger loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogEventSink   Esp32Time     HardwareRng   │
//! │  (Trigger+Pixels)   (EventSink)    (ClockPort)   (Random)      │
//! │  ThreadedWebhook    WavClipPlayer  WifiStation                 │
//! │  (CallPort)         (AudioPort)    (link upkeep)               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Heartbeat · Patterns                            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Webhook worker thread · Audio playback thread · Watchdog      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use tagring::adapters::log_sink::LogEventSink;
use tagring::adapters::rng::HardwareRng;
use tagring::adapters::time::Esp32TimeAdapter;
use tagring::adapters::wifi::WifiStation;
use tagring::app::ports::{AudioPort, ClockPort, PixelSink, TriggerPort};
use tagring::app::service::{AppService, Ports};
use tagring::config::{Credentials, SystemConfig};
use tagring::drivers::watchdog::Watchdog;
use tagring::error::Error;
use tagring::webhook::ThreadedWebhook;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Bootstrap ──────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    init_host_logging();

    info!("╔══════════════════════════════════════╗");
    info!("║  TagRing v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    #[allow(unused_mut)]
    let mut config = SystemConfig::default();
    #[cfg(not(target_os = "espidf"))]
    {
        // No HTTP stack on the host.
        config.simulate_webhook = true;
    }
    config.validate().map_err(Error::from)?;

    let credentials = Credentials::from_build_env();
    if config.simulate_webhook {
        warn!("Webhook: simulated ({}ms per call)", config.simulated_call_ms);
    } else {
        credentials.validate().map_err(Error::from)?;
    }

    // ── 3. Platform bring-up and loop ─────────────────────────
    platform::run(config, &credentials)
}

/// Shared tail of both platforms: build the service and loop forever.
fn run_loop<H, A>(
    config: SystemConfig,
    hw: H,
    net: ThreadedWebhook,
    audio: A,
    mut wifi: WifiStation,
) -> Result<()>
where
    H: TriggerPort + PixelSink,
    A: AudioPort,
{
    let mut watchdog = Watchdog::new(config.watchdog_timeout_ms);
    let clock = Esp32TimeAdapter::new();
    let uptime = Esp32TimeAdapter::new();

    let mut app = AppService::new(config, clock.now_ms());
    let mut ports = Ports {
        hw,
        net,
        audio,
        clock,
        rng: HardwareRng::new(),
        sink: LogEventSink::new(),
    };
    app.start(&mut ports.sink);

    info!("System ready. Entering trigger loop.");

    app.run(&mut ports, |_| {
        watchdog.feed();
        wifi.poll(uptime.now_ms());
        true
    });

    Ok(())
}

fn simulated_client(config: &SystemConfig) -> tagring::adapters::http_client::SimulatedWebhookClient {
    tagring::adapters::http_client::SimulatedWebhookClient::new(Duration::from_millis(u64::from(
        config.simulated_call_ms,
    )))
}

// ───────────────────────────────────────────────────────────────
// ESP32-S3
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use std::time::Duration;

    use anyhow::Result;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sntp::EspSntp;
    use log::{info, warn};

    use tagring::adapters::audio::{
        CLIP_STORAGE_MOUNT, I2sPcmOutput, WavClipPlayer, mount_clip_storage,
    };
    use tagring::adapters::hardware::HardwareAdapter;
    use tagring::adapters::http_client::EspHttpWebhookClient;
    use tagring::adapters::time::Esp32TimeAdapter;
    use tagring::adapters::wifi::WifiStation;
    use tagring::app::ports::ClockPort;
    use tagring::config::{Credentials, SystemConfig};
    use tagring::drivers::pixel_ring::PixelRing;
    use tagring::drivers::trigger::TriggerMonitor;
    use tagring::pins;
    use tagring::webhook::ThreadedWebhook;

    pub fn run(config: SystemConfig, credentials: &Credentials) -> Result<()> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // ── Network ───────────────────────────────────────────
        let mut wifi = WifiStation::new(peripherals.modem, sysloop, nvs)?;
        let mut _sntp = None;
        if !config.simulate_webhook {
            wifi.set_credentials(&credentials.wifi_ssid, &credentials.wifi_password)?;
            if let Err(e) = wifi.connect(Esp32TimeAdapter::new().now_ms()) {
                warn!("WiFi: {} (will keep retrying)", e);
            }
            _sntp = Some(EspSntp::new_default()?);
            info!("SNTP: started");
        }

        // ── Reader input ──────────────────────────────────────
        // SAFETY: the pin numbers in `pins` are claimed exactly once, here.
        let mut trigger_pin = PinDriver::input(unsafe { AnyIOPin::new(pins::TRIGGER_GPIO) })?;
        trigger_pin.set_pull(Pull::Down)?;

        // ── Ring ──────────────────────────────────────────────
        let ring = PixelRing::new(
            peripherals.rmt.channel0,
            unsafe { AnyOutputPin::new(pins::PIXEL_DATA_GPIO) },
            config.ring_len(),
            config.brightness_percent,
        )?;
        let hw = HardwareAdapter::new(TriggerMonitor::new(trigger_pin), ring);

        // ── Audio ─────────────────────────────────────────────
        if let Err(e) = mount_clip_storage() {
            warn!("Audio: clip storage unavailable ({}), playing silently", e);
        }
        let output = I2sPcmOutput::new(
            peripherals.i2s0,
            unsafe { AnyIOPin::new(pins::I2S_BCLK_GPIO) },
            unsafe { AnyOutputPin::new(pins::I2S_DOUT_GPIO) },
            unsafe { AnyIOPin::new(pins::I2S_WS_GPIO) },
            pins::AUDIO_SAMPLE_RATE_HZ,
            pins::AUDIO_CHANNELS,
        )?;
        let audio = WavClipPlayer::new(
            format!("{}/{}", CLIP_STORAGE_MOUNT, config.audio_dir),
            output,
        );

        // ── Webhook worker ────────────────────────────────────
        let timeout = Duration::from_millis(u64::from(config.http_timeout_ms));
        let net = if config.simulate_webhook {
            ThreadedWebhook::spawn(super::simulated_client(&config), timeout)
        } else {
            ThreadedWebhook::spawn(EspHttpWebhookClient::new(credentials.webhook_url()), timeout)
        };

        super::run_loop(config, hw, net, audio, wifi)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn init_host_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .with_target(false)
        .init();
}

#[cfg(not(target_os = "espidf"))]
mod platform {
    use std::time::Duration;

    use anyhow::Result;
    use log::{info, warn};

    use tagring::adapters::audio::{SimPcmOutput, WavClipPlayer};
    use tagring::adapters::hardware::{HardwareAdapter, SimTriggerPin};
    use tagring::adapters::wifi::WifiStation;
    use tagring::config::{Credentials, SystemConfig};
    use tagring::drivers::pixel_ring::PixelRing;
    use tagring::drivers::trigger::TriggerMonitor;
    use tagring::error::Error;
    use tagring::webhook::ThreadedWebhook;

    /// Tag held for this long, then removed for `TAG_AWAY`.
    const TAG_HELD: Duration = Duration::from_secs(7);
    const TAG_AWAY: Duration = Duration::from_secs(15);

    pub fn run(config: SystemConfig, credentials: &Credentials) -> Result<()> {
        let mut wifi = WifiStation::new();
        if !credentials.wifi_ssid.is_empty() {
            wifi.set_credentials(&credentials.wifi_ssid, &credentials.wifi_password)?;
            if let Err(e) = wifi.connect(0) {
                warn!("WiFi(sim): {}", e);
            }
        }

        let pin = SimTriggerPin::new();
        spawn_tag_driver(pin.clone())?;

        let ring = PixelRing::new(config.ring_len(), config.brightness_percent);
        let hw = HardwareAdapter::new(TriggerMonitor::new(pin), ring);
        let audio = WavClipPlayer::new(config.audio_dir.clone(), SimPcmOutput::new());

        let timeout = Duration::from_millis(u64::from(config.http_timeout_ms));
        let net = ThreadedWebhook::spawn(super::simulated_client(&config), timeout);

        super::run_loop(config, hw, net, audio, wifi)
    }

    /// Present and remove a tag on a fixed rhythm.
    fn spawn_tag_driver(pin: SimTriggerPin) -> Result<()> {
        std::thread::Builder::new()
            .name("tag-sim".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(TAG_AWAY);
                    info!("Sim: tag presented");
                    pin.set(true);
                    std::thread::sleep(TAG_HELD);
                    info!("Sim: tag removed");
                    pin.set(false);
                }
            })
            .map_err(|_| Error::Init("tag simulator thread"))?;
        Ok(())
    }
}
