//! WAV clip player.
//!
//! Implements [`AudioPort`]: `play("chime")` opens `<dir>/chime.wav`,
//! checks the RIFF header, and streams the samples to a [`PcmOutput`] on
//! a short-lived playback thread.  Header problems come back from `play`
//! immediately so the orchestrator can skip the sound and keep pulsing.
//!
//! Only 16-bit PCM is accepted.
//!
//! ```text
//!  RIFF <size> WAVE
//!    "fmt " <16+> format=1 channels rate byte_rate align bits
//!    ...        (other chunks skipped)
//!    "data" <n> samples
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::app::ports::{AudioError, AudioPort, PlaybackHandle};

/// Bytes handed to the output per write.
const CHUNK_BYTES: usize = 1024;
#[cfg(target_os = "espidf")]
const PLAYBACK_STACK_BYTES: usize = 8 * 1024;
// Room for the std panic hook on desktop targets.
#[cfg(not(target_os = "espidf"))]
const PLAYBACK_STACK_BYTES: usize = 64 * 1024;

// ───────────────────────────────────────────────────────────────
// WAV parsing
// ───────────────────────────────────────────────────────────────

/// Sample format from the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Bytes per second of audio, `None` if it does not fit a `u32`.
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate
            .checked_mul(u32::from(self.channels))?
            .checked_mul(u32::from(self.bits_per_sample / 8))
    }
}

fn le_u16(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*b.get(at)?, *b.get(at + 1)?]))
}

fn le_u32(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 4)?;
    Some(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

/// Offset just past a chunk body of `size` bytes starting at `body`,
/// including the pad byte that keeps chunks at even offsets.
fn chunk_end(body: usize, size: usize) -> Option<usize> {
    body.checked_add(size)?.checked_add(size & 1)
}

/// Split a WAV file into its format and sample bytes.
pub fn parse_wav(bytes: &[u8]) -> Result<(WavFormat, &[u8]), AudioError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(AudioError::UnsupportedFormat);
    }

    let mut format = None;
    let mut pos: usize = 12;
    while let Some(body) = pos.checked_add(8).filter(|&b| b <= bytes.len()) {
        let id = &bytes[pos..pos + 4];
        let size = le_u32(bytes, pos + 4).ok_or(AudioError::UnsupportedFormat)? as usize;
        match id {
            b"fmt " => {
                let tag = le_u16(bytes, body).ok_or(AudioError::UnsupportedFormat)?;
                if tag != 1 {
                    return Err(AudioError::UnsupportedFormat);
                }
                let fmt = WavFormat {
                    channels: le_u16(bytes, body + 2).ok_or(AudioError::UnsupportedFormat)?,
                    sample_rate: le_u32(bytes, body + 4).ok_or(AudioError::UnsupportedFormat)?,
                    bits_per_sample: le_u16(bytes, body + 14)
                        .ok_or(AudioError::UnsupportedFormat)?,
                };
                if fmt.bits_per_sample != 16
                    || fmt.channels == 0
                    || fmt.sample_rate == 0
                    || fmt.byte_rate().is_none()
                {
                    return Err(AudioError::UnsupportedFormat);
                }
                format = Some(fmt);
            }
            b"data" => {
                let fmt = format.ok_or(AudioError::UnsupportedFormat)?;
                // Tolerate a size field that overruns the file (truncated writes).
                let end = body.saturating_add(size).min(bytes.len());
                return Ok((fmt, &bytes[body..end]));
            }
            _ => {}
        }
        pos = chunk_end(body, size).ok_or(AudioError::UnsupportedFormat)?;
    }
    Err(AudioError::UnsupportedFormat)
}

// ───────────────────────────────────────────────────────────────
// PCM output
// ───────────────────────────────────────────────────────────────

/// Sink for raw 16-bit little-endian PCM.  `write` blocks until the data
/// has been queued, which paces playback.
pub trait PcmOutput {
    fn configure(&mut self, format: &WavFormat) -> Result<(), AudioError>;
    fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError>;
}

/// Host output: discards samples but takes as long as real playback.
#[derive(Debug, Default)]
pub struct SimPcmOutput {
    byte_rate: u32,
    bytes_played: u64,
}

impl SimPcmOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_played(&self) -> u64 {
        self.bytes_played
    }
}

impl PcmOutput for SimPcmOutput {
    fn configure(&mut self, format: &WavFormat) -> Result<(), AudioError> {
        self.byte_rate = format.byte_rate().ok_or(AudioError::UnsupportedFormat)?;
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError> {
        if self.byte_rate == 0 {
            return Err(AudioError::Io);
        }
        self.bytes_played += pcm.len() as u64;
        let micros = pcm.len() as u64 * 1_000_000 / u64::from(self.byte_rate);
        std::thread::sleep(std::time::Duration::from_micros(micros));
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
pub use i2s::I2sPcmOutput;

#[cfg(target_os = "espidf")]
mod i2s {
    use esp_idf_hal::delay::BLOCK;
    use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
    use esp_idf_hal::i2s::config::{
        Config, DataBitWidth, SlotMode, StdClkConfig, StdConfig, StdGpioConfig, StdSlotConfig,
    };
    use esp_idf_hal::i2s::{I2s, I2sDriver, I2sTx};
    use esp_idf_hal::peripheral::Peripheral;
    use log::info;

    use super::{PcmOutput, WavFormat};
    use crate::app::ports::AudioError;

    /// I2S amplifier (e.g. MAX98357A) at a fixed sample rate.
    pub struct I2sPcmOutput {
        driver: I2sDriver<'static, I2sTx>,
        sample_rate: u32,
        channels: u16,
        enabled: bool,
    }

    impl I2sPcmOutput {
        pub fn new<I: I2s>(
            i2s: impl Peripheral<P = I> + 'static,
            bclk: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
            dout: impl Peripheral<P = impl OutputPin> + 'static,
            ws: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
            sample_rate: u32,
            channels: u16,
        ) -> anyhow::Result<Self> {
            let slot_mode = if channels == 1 {
                SlotMode::Mono
            } else {
                SlotMode::Stereo
            };
            let config = StdConfig::new(
                Config::default(),
                StdClkConfig::from_sample_rate_hz(sample_rate),
                StdSlotConfig::philips_slot_default(DataBitWidth::Bits16, slot_mode),
                StdGpioConfig::default(),
            );
            let driver =
                I2sDriver::new_std_tx(i2s, &config, bclk, dout, Option::<AnyIOPin>::None, ws)?;
            info!("Audio: I2S out at {}Hz, {} channel(s)", sample_rate, channels);
            Ok(Self {
                driver,
                sample_rate,
                channels,
                enabled: false,
            })
        }
    }

    impl PcmOutput for I2sPcmOutput {
        fn configure(&mut self, format: &WavFormat) -> Result<(), AudioError> {
            if format.sample_rate != self.sample_rate || format.channels != self.channels {
                return Err(AudioError::UnsupportedFormat);
            }
            if !self.enabled {
                self.driver.tx_enable().map_err(|_| AudioError::Io)?;
                self.enabled = true;
            }
            Ok(())
        }

        fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError> {
            self.driver
                .write_all(pcm, BLOCK)
                .map_err(|_| AudioError::Io)
        }
    }
}

/// Mount point of the clip partition on the device.
pub const CLIP_STORAGE_MOUNT: &str = "/spiffs";

/// Mount the `spiffs` data partition at [`CLIP_STORAGE_MOUNT`].
#[cfg(target_os = "espidf")]
pub fn mount_clip_storage() -> anyhow::Result<()> {
    use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 2,
        format_if_mount_failed: false,
    };
    // SAFETY: `conf` and its strings outlive the call; IDF copies the base path.
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    info!("Audio: clip storage mounted at {}", CLIP_STORAGE_MOUNT);
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Clip player
// ───────────────────────────────────────────────────────────────

/// Clears the playing flag when the playback thread ends, even by panic.
struct PlayingFlag(Arc<AtomicBool>);

impl Drop for PlayingFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ActivePlayback {
    handle: PlaybackHandle,
    playing: Arc<AtomicBool>,
}

/// Plays `<dir>/<clip>.wav` on a background thread, one clip at a time.
pub struct WavClipPlayer<O: PcmOutput + Send + 'static> {
    dir: PathBuf,
    output: Arc<Mutex<O>>,
    next_handle: u32,
    active: Option<ActivePlayback>,
}

impl<O: PcmOutput + Send + 'static> WavClipPlayer<O> {
    pub fn new(dir: impl Into<PathBuf>, output: O) -> Self {
        let dir = dir.into();
        info!("Audio: clips from {}", dir.display());
        Self {
            dir,
            output: Arc::new(Mutex::new(output)),
            next_handle: 1,
            active: None,
        }
    }

    /// Path a clip name resolves to.
    pub fn clip_path(&self, clip: &str) -> PathBuf {
        self.dir.join(format!("{clip}.wav"))
    }

    pub fn output(&self) -> &Arc<Mutex<O>> {
        &self.output
    }

    fn busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.playing.load(Ordering::Acquire))
    }
}

fn read_clip(path: &Path) -> Result<Vec<u8>, AudioError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AudioError::ClipMissing,
        _ => AudioError::Io,
    })
}

fn stream<O: PcmOutput>(output: &Mutex<O>, format: &WavFormat, pcm: &[u8]) -> Result<(), AudioError> {
    let mut out = output.lock().map_err(|_| AudioError::Io)?;
    out.configure(format)?;
    for chunk in pcm.chunks(CHUNK_BYTES) {
        out.write(chunk)?;
    }
    Ok(())
}

impl<O: PcmOutput + Send + 'static> AudioPort for WavClipPlayer<O> {
    fn play(&mut self, clip: &str) -> Result<PlaybackHandle, AudioError> {
        if self.busy() {
            return Err(AudioError::Busy);
        }

        let path = self.clip_path(clip);
        let bytes = read_clip(&path)?;
        let (format, pcm) = parse_wav(&bytes)?;
        let data_start = pcm.as_ptr() as usize - bytes.as_ptr() as usize;
        let data_len = pcm.len();
        debug!(
            "Audio: {} is {}Hz x{} ({} bytes)",
            path.display(),
            format.sample_rate,
            format.channels,
            data_len
        );

        let handle = PlaybackHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let playing = Arc::new(AtomicBool::new(true));

        let flag = PlayingFlag(Arc::clone(&playing));
        let output = Arc::clone(&self.output);
        let name = clip.to_owned();
        std::thread::Builder::new()
            .name("audio".into())
            .stack_size(PLAYBACK_STACK_BYTES)
            .spawn(move || {
                let _flag = flag;
                let pcm = &bytes[data_start..data_start + data_len];
                if let Err(e) = stream(&output, &format, pcm) {
                    warn!("Audio: playback of '{}' failed: {}", name, e);
                }
            })
            .map_err(|_| AudioError::Io)?;

        self.active = Some(ActivePlayback { handle, playing });
        Ok(handle)
    }

    fn is_playing(&self, handle: PlaybackHandle) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.handle == handle && a.playing.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Minimal 16-bit mono PCM WAV with `samples` zero samples.
    fn wav(rate: u32, samples: usize) -> Vec<u8> {
        let data_len = (samples * 2) as u32;
        let mut v = Vec::new();
        v.extend_from_slice(b"RIFF");
        v.extend_from_slice(&(36 + data_len).to_le_bytes());
        v.extend_from_slice(b"WAVE");
        v.extend_from_slice(b"fmt ");
        v.extend_from_slice(&16u32.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&rate.to_le_bytes());
        v.extend_from_slice(&rate.wrapping_mul(2).to_le_bytes());
        v.extend_from_slice(&2u16.to_le_bytes());
        v.extend_from_slice(&16u16.to_le_bytes());
        v.extend_from_slice(b"data");
        v.extend_from_slice(&data_len.to_le_bytes());
        v.resize(v.len() + data_len as usize, 0);
        v
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tagring-audio-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_pcm_header() {
        let bytes = wav(8000, 10);
        let (fmt, pcm) = parse_wav(&bytes).unwrap();
        assert_eq!(
            fmt,
            WavFormat {
                channels: 1,
                sample_rate: 8000,
                bits_per_sample: 16
            }
        );
        assert_eq!(pcm.len(), 20);
        assert_eq!(fmt.byte_rate(), Some(16_000));
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut bytes = wav(8000, 4);
        // Insert a LIST chunk (odd length, padded) before "data".
        let data_at = bytes.len() - 8 - 8;
        let list: &[u8] = b"LIST\x03\x00\x00\x00abc\x00";
        bytes.splice(data_at..data_at, list.iter().copied());
        let (_, pcm) = parse_wav(&bytes).unwrap();
        assert_eq!(pcm.len(), 8);
    }

    #[test]
    fn rejects_non_pcm_and_garbage() {
        assert_eq!(parse_wav(b"not a wav"), Err(AudioError::UnsupportedFormat));
        let mut bytes = wav(8000, 4);
        bytes[20] = 3; // IEEE float
        assert_eq!(parse_wav(&bytes), Err(AudioError::UnsupportedFormat));
    }

    #[test]
    fn rejects_byte_rate_beyond_u32() {
        let mut bytes = wav(u32::MAX, 4);
        bytes[22] = 2; // stereo
        assert_eq!(parse_wav(&bytes), Err(AudioError::UnsupportedFormat));

        let fmt = WavFormat {
            channels: 2,
            sample_rate: u32::MAX,
            bits_per_sample: 16,
        };
        assert_eq!(fmt.byte_rate(), None);
        assert_eq!(
            SimPcmOutput::new().configure(&fmt),
            Err(AudioError::UnsupportedFormat)
        );
    }

    #[test]
    fn oversized_chunk_ends_the_walk() {
        let mut bytes = wav(8000, 4);
        let data_at = bytes.len() - 8 - 8;
        let junk: &[u8] = b"junk\xf0\xff\xff\xff";
        bytes.splice(data_at..data_at, junk.iter().copied());
        assert_eq!(parse_wav(&bytes), Err(AudioError::UnsupportedFormat));

        assert_eq!(chunk_end(usize::MAX - 4, 3), None);
        assert_eq!(chunk_end(usize::MAX - 4, 4), None);
        assert_eq!(chunk_end(20, 3), Some(24));
    }

    #[test]
    fn missing_clip_reported() {
        let dir = temp_dir("missing");
        let mut player = WavClipPlayer::new(&dir, SimPcmOutput::new());
        assert_eq!(player.play("nope"), Err(AudioError::ClipMissing));
    }

    #[test]
    fn plays_in_background_until_done() {
        let dir = temp_dir("play");
        // 8000 Hz mono, 400 samples = 50ms.
        std::fs::write(dir.join("chime.wav"), wav(8000, 400)).unwrap();
        let mut player = WavClipPlayer::new(&dir, SimPcmOutput::new());

        let h = player.play("chime").unwrap();
        assert!(player.is_playing(h));
        assert_eq!(player.play("chime"), Err(AudioError::Busy));

        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_playing(h) {
            assert!(Instant::now() < deadline, "playback never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(player.output().lock().unwrap().bytes_played(), 800);
        assert!(!player.is_playing(PlaybackHandle(h.0 + 1)));
    }

    /// Output whose first write panics.
    struct FaultyOutput;

    impl PcmOutput for FaultyOutput {
        fn configure(&mut self, _format: &WavFormat) -> Result<(), AudioError> {
            Ok(())
        }

        fn write(&mut self, _pcm: &[u8]) -> Result<(), AudioError> {
            panic!("amplifier gone");
        }
    }

    #[test]
    fn playback_panic_clears_playing() {
        let dir = temp_dir("panic");
        std::fs::write(dir.join("chime.wav"), wav(8000, 400)).unwrap();
        let mut player = WavClipPlayer::new(&dir, FaultyOutput);

        let h = player.play("chime").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_playing(h) {
            assert!(Instant::now() < deadline, "flag stuck after panic");
            std::thread::sleep(Duration::from_millis(5));
        }
        // The poisoned output lock now fails the stream, but play is free again.
        let again = player.play("chime").unwrap();
        assert_ne!(again, h);
    }
}
