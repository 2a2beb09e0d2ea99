//! GPIO / peripheral pin assignments for the TagRing reader board
//! (Feather-format ESP32-S3).
//!
//! Every peripheral is claimed in `main` from the numbers below; nothing
//! else hard-codes a pin.

// ---------------------------------------------------------------------------
// RFID reader
// ---------------------------------------------------------------------------

/// Tag-present line from the reader module (header A1).
/// HIGH while a tag is in the field; pulled down on the board.
pub const TRIGGER_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// NeoPixel ring (WS2812B)
// ---------------------------------------------------------------------------

/// Ring data-in (header D6), driven by an RMT channel.
pub const PIXEL_DATA_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Audio amplifier (MAX98357A, I²S)
// ---------------------------------------------------------------------------

pub const I2S_BCLK_GPIO: i32 = 9;
pub const I2S_WS_GPIO: i32 = 10;
pub const I2S_DOUT_GPIO: i32 = 11;

/// Clips are stored as 16-bit mono PCM at this rate.
pub const AUDIO_SAMPLE_RATE_HZ: u32 = 22_050;
pub const AUDIO_CHANNELS: u16 = 1;
