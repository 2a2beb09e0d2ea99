//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements          | Connects to                   |
//! |----------------|---------------------|-------------------------------|
//! | `audio`        | AudioPort           | WAV files → I²S amplifier     |
//! | `hardware`     | TriggerPort         | Reader tag-present GPIO       |
//! |                | PixelSink           | WS2812 ring over RMT          |
//! | `http_client`  | WebhookClient       | ESP-IDF HTTP client / sim     |
//! | `log_sink`     | EventSink           | Serial log output             |
//! | `rng`          | RandomSource        | Hardware RNG                  |
//! | `time`         | ClockPort           | ESP32 system timer + SNTP     |
//! | `wifi`         | —                   | ESP-IDF WiFi STA              |

pub mod audio;
pub mod hardware;
pub mod http_client;
pub mod log_sink;
pub mod rng;
pub mod time;
pub mod wifi;
