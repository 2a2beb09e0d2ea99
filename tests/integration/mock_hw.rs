//! Mock adapters for integration tests.
//!
//! Every mock shares one simulated clock.  `sleep_ms` advances it, so a
//! full trigger cycle runs in microseconds of real time and every event
//! carries an exact timestamp.

use std::cell::Cell;
use std::rc::Rc;

use tagring::app::events::AppEvent;
use tagring::app::ports::{
    AudioError, AudioPort, CallPort, ClockPort, EventSink, PixelSink, PlaybackHandle,
    RandomSource, TriggerPort,
};
use tagring::app::service::{AppService, Ports};
use tagring::config::SystemConfig;
use tagring::drivers::led_patterns::Rgb;
use tagring::drivers::trigger::TriggerState;
use tagring::fsm::LoopPhase;
use tagring::webhook::{CallOutcome, WebhookPayload};

pub type SharedClock = Rc<Cell<u64>>;

// ── Clock ─────────────────────────────────────────────────────

pub struct SimClock {
    now: SharedClock,
    epoch: Option<f64>,
}

impl ClockPort for SimClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn epoch_secs(&self) -> Option<f64> {
        self.epoch
    }

    fn sleep_ms(&self, ms: u32) {
        self.now.set(self.now.get() + u64::from(ms));
    }
}

// ── Reader + ring ─────────────────────────────────────────────

/// Tag presence follows a script of `[start, end)` windows.  Every
/// frame shown is recorded with its timestamp.
pub struct MockHw {
    clock: SharedClock,
    tag_windows: Vec<(u64, u64)>,
    pub frames: Vec<(u64, Vec<Rgb>)>,
}

#[allow(dead_code)]
impl MockHw {
    pub fn frame_at(&self, t: u64) -> Option<&[Rgb]> {
        self.frames
            .iter()
            .find(|(ts, _)| *ts == t)
            .map(|(_, f)| f.as_slice())
    }

    /// Number of non-dark pixels in the frame shown at `t`.
    pub fn lit_at(&self, t: u64) -> usize {
        self.frame_at(t)
            .map_or(0, |f| f.iter().filter(|p| **p != (0, 0, 0)).count())
    }
}

impl TriggerPort for MockHw {
    fn read(&mut self) -> TriggerState {
        let now = self.clock.get();
        let present = self
            .tag_windows
            .iter()
            .any(|&(start, end)| now >= start && now < end);
        TriggerState::from(present)
    }
}

impl PixelSink for MockHw {
    fn show(&mut self, frame: &[Rgb]) {
        self.frames.push((self.clock.get(), frame.to_vec()));
    }
}

// ── Webhook ───────────────────────────────────────────────────

/// Returns `outcome` once `latency_ms` has passed since `begin`.
pub struct MockNet {
    clock: SharedClock,
    latency_ms: u64,
    outcome: CallOutcome,
    due: Option<u64>,
    pub begins: Vec<(u64, WebhookPayload)>,
}

impl CallPort for MockNet {
    fn begin(&mut self, payload: WebhookPayload) {
        let now = self.clock.get();
        self.begins.push((now, payload));
        if self.due.is_none() {
            self.due = Some(now + self.latency_ms);
        }
    }

    fn poll(&mut self) -> Option<CallOutcome> {
        let due = self.due?;
        if self.clock.get() < due {
            return None;
        }
        self.due = None;
        Some(self.outcome)
    }
}

// ── Audio ─────────────────────────────────────────────────────

/// Every clip lasts `clip_ms`; `missing` makes every `play` fail.
pub struct MockAudio {
    clock: SharedClock,
    clip_ms: u64,
    missing: bool,
    playing: Option<(PlaybackHandle, u64)>,
    pub plays: Vec<(u64, String)>,
}

impl AudioPort for MockAudio {
    fn play(&mut self, clip: &str) -> Result<PlaybackHandle, AudioError> {
        if self.missing {
            return Err(AudioError::ClipMissing);
        }
        let now = self.clock.get();
        let handle = PlaybackHandle(self.plays.len() as u32 + 1);
        self.plays.push((now, clip.to_owned()));
        self.playing = Some((handle, now + self.clip_ms));
        Ok(handle)
    }

    fn is_playing(&self, handle: PlaybackHandle) -> bool {
        self.playing
            .is_some_and(|(h, until)| h == handle && self.clock.get() < until)
    }
}

// ── RNG + sink ────────────────────────────────────────────────

pub struct FixedRng(pub u32);

impl RandomSource for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.0
    }
}

pub struct RecordingSink {
    clock: SharedClock,
    pub events: Vec<(u64, AppEvent)>,
}

#[allow(dead_code)]
impl RecordingSink {
    /// `(time, to)` for every phase change, in order.
    pub fn transitions(&self) -> Vec<(u64, LoopPhase)> {
        self.events
            .iter()
            .filter_map(|(t, e)| match e {
                AppEvent::PhaseChanged { to, .. } => Some((*t, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|(_, e)| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push((self.clock.get(), event.clone()));
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type MockPorts<A = MockAudio> = Ports<MockHw, MockNet, A, SimClock, FixedRng, RecordingSink>;

/// Knobs for one scenario.  Defaults: tag never present, the call
/// succeeds after 500 ms, clips last 1 s, no wall clock.
pub struct Scenario {
    pub config: SystemConfig,
    pub tag_windows: Vec<(u64, u64)>,
    pub latency_ms: u64,
    pub outcome: CallOutcome,
    pub clip_ms: u64,
    pub clips_missing: bool,
    pub epoch: Option<f64>,
    pub rng: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: SystemConfig::default(),
            tag_windows: Vec::new(),
            latency_ms: 500,
            outcome: CallOutcome::Success,
            clip_ms: 1_000,
            clips_missing: false,
            epoch: None,
            rng: 0,
        }
    }
}

pub struct Rig<A: AudioPort = MockAudio> {
    pub clock: SharedClock,
    pub app: AppService,
    pub ports: MockPorts<A>,
}

impl Rig {
    pub fn new(s: Scenario) -> Self {
        let clock: SharedClock = Rc::new(Cell::new(0));
        let audio = MockAudio {
            clock: Rc::clone(&clock),
            clip_ms: s.clip_ms,
            missing: s.clips_missing,
            playing: None,
            plays: Vec::new(),
        };
        Self::assemble(s, clock, audio)
    }
}

#[allow(dead_code)]
impl<A: AudioPort> Rig<A> {
    /// Mock everything except audio, which is `audio` as given.
    pub fn with_audio(s: Scenario, audio: A) -> Self {
        Self::assemble(s, Rc::new(Cell::new(0)), audio)
    }

    fn assemble(s: Scenario, clock: SharedClock, audio: A) -> Self {
        let ports = Ports {
            hw: MockHw {
                clock: Rc::clone(&clock),
                tag_windows: s.tag_windows,
                frames: Vec::new(),
            },
            net: MockNet {
                clock: Rc::clone(&clock),
                latency_ms: s.latency_ms,
                outcome: s.outcome,
                due: None,
                begins: Vec::new(),
            },
            audio,
            clock: SimClock {
                now: Rc::clone(&clock),
                epoch: s.epoch,
            },
            rng: FixedRng(s.rng),
            sink: RecordingSink {
                clock: Rc::clone(&clock),
                events: Vec::new(),
            },
        };
        let mut rig = Self {
            app: AppService::new(s.config, 0),
            clock,
            ports,
        };
        rig.app.start(&mut rig.ports.sink);
        rig
    }

    /// Run frames until the simulated clock reaches `end_ms`.
    pub fn run_until(&mut self, end_ms: u64) {
        let clock = Rc::clone(&self.clock);
        self.app.run(&mut self.ports, |_| clock.get() < end_ms);
    }

    pub fn now(&self) -> u64 {
        self.clock.get()
    }
}
