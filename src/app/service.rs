//! Application service: the event orchestrator.
//!
//! [`AppService`] owns the FSM, its context, and the trigger edge
//! detector.  Each [`step`](AppService::step) is one frame: sample the
//! trigger, collect the call outcome and audio status, tick the FSM,
//! apply what the handlers asked for, then render and show the frame.
//! All I/O flows through the port bundle, so the whole cycle runs
//! against mock adapters in tests.
//!
//! ```text
//!  TriggerPort ──▶ ┌──────────────────────────┐ ──▶ PixelSink
//!  CallPort    ◀─▶ │        AppService        │ ──▶ AudioPort
//!  ClockPort   ──▶ │  FSM · Heartbeat · Edges │ ──▶ EventSink
//!                  └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::drivers::led_patterns::render;
use crate::drivers::trigger::{Edge, EdgeDetector};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, LoopPhase};
use crate::webhook::WebhookPayload;

use super::events::AppEvent;
use super::ports::{
    AudioPort, CallPort, ClockPort, EventSink, PixelSink, PlaybackHandle,
    RandomSource, TriggerPort,
};

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Every adapter the loop talks to.  `hw` satisfies both the trigger
/// and the pixel ports, which avoids a double mutable borrow.
pub struct Ports<H, N, A, C, R, S> {
    pub hw: H,
    pub net: N,
    pub audio: A,
    pub clock: C,
    pub rng: R,
    pub sink: S,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The orchestrator: idle → trigger → call → feedback → release → idle.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    edges: EdgeDetector,
    /// Success clip started in the current cycle.
    playback: Option<PlaybackHandle>,
    frames: u64,
}

impl AppService {
    /// Construct the service.  The heartbeat interval counts from `now_ms`.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, now_ms: u64) -> Self {
        let ctx = FsmContext::new(config, now_ms);
        let fsm = Fsm::new(build_state_table(), LoopPhase::Idle);
        Self {
            fsm,
            ctx,
            edges: EdgeDetector::new(),
            playback: None,
            frames: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_phase()));
        info!("AppService started in {}", self.fsm.current_phase());
    }

    /// Step frames until `keep_running` returns `false`, sleeping one
    /// frame interval between steps.  The predicate is the only way out;
    /// the firmware never returns from here.
    pub fn run<H, N, A, C, R, S>(
        &mut self,
        ports: &mut Ports<H, N, A, C, R, S>,
        mut keep_running: impl FnMut(&Self) -> bool,
    ) where
        H: TriggerPort + PixelSink,
        N: CallPort,
        A: AudioPort,
        C: ClockPort,
        R: RandomSource,
        S: EventSink,
    {
        while keep_running(self) {
            self.step(ports);
            ports.clock.sleep_ms(self.ctx.config.frame_interval_ms);
        }
        info!("AppService stopped after {} frames", self.frames);
    }

    // ── Per-frame orchestration ───────────────────────────────

    /// Run one frame.
    pub fn step<H, N, A, C, R, S>(&mut self, ports: &mut Ports<H, N, A, C, R, S>)
    where
        H: TriggerPort + PixelSink,
        N: CallPort,
        A: AudioPort,
        C: ClockPort,
        R: RandomSource,
        S: EventSink,
    {
        self.frames += 1;
        let now = ports.clock.now_ms();
        let prev = self.fsm.current_phase();
        self.ctx.now_ms = now;

        // 1. Trigger level and edge
        let level = ports.hw.read();
        self.ctx.inputs.trigger = level;
        self.ctx.inputs.rising_edge = self.edges.update(level) == Some(Edge::Rising);

        // 2. Outcome handoff (held in the context until consumed)
        if prev == LoopPhase::AwaitingResult && self.ctx.inputs.outcome.is_none() {
            self.ctx.inputs.outcome = ports.net.poll();
        }

        // 3. Audio status
        self.ctx.inputs.audio_playing = self
            .playback
            .is_some_and(|handle| ports.audio.is_playing(handle));

        // 4. FSM tick
        self.fsm.tick(&mut self.ctx);

        let phase = self.fsm.current_phase();
        if phase != prev {
            if prev == LoopPhase::Feedback {
                self.playback = None;
            }
            ports
                .sink
                .emit(&AppEvent::PhaseChanged { from: prev, to: phase });
        }

        // 5. Side effects requested by the handlers
        self.apply_commands(ports);

        // 6. Frame out
        let frame = render(
            &self.ctx.commands.pattern,
            self.ctx.pattern_elapsed_ms(),
            self.ctx.config.ring_len(),
        );
        ports.hw.show(&frame);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> LoopPhase {
        self.fsm.current_phase()
    }

    /// Last heartbeat fire (or reset), monotonic milliseconds.
    pub fn heartbeat_last_fire(&self) -> u64 {
        self.ctx.heartbeat.last_fire()
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_commands<H, N, A, C, R, S>(&mut self, ports: &mut Ports<H, N, A, C, R, S>)
    where
        N: CallPort,
        A: AudioPort,
        C: ClockPort,
        R: RandomSource,
        S: EventSink,
    {
        let cmds = self.ctx.commands;

        if cmds.begin_call {
            // Wall-clock seconds once synced, otherwise uptime.
            let ts = ports
                .clock
                .epoch_secs()
                .unwrap_or(self.ctx.now_ms as f64 / 1000.0);
            let payload = WebhookPayload::scan(&self.ctx.config.device_name, ts);
            ports.net.begin(payload);
            ports.sink.emit(&AppEvent::CallStarted);
        }

        if let Some(outcome) = cmds.call_completed {
            ports.sink.emit(&AppEvent::CallCompleted(outcome));
        }

        if cmds.play_success_clip {
            self.play_success_clip(ports);
        }

        if cmds.heartbeat_fired {
            ports.sink.emit(&AppEvent::HeartbeatGlow);
        }

        if cmds.cycle_completed {
            ports.sink.emit(&AppEvent::CycleCompleted {
                heartbeat_reset_ms: self.ctx.heartbeat.last_fire(),
            });
        }

        self.ctx.commands.clear_one_shots();
    }

    /// Uniform pick over the configured clips.  Failures only cost the
    /// sound; the pulse runs regardless.
    fn play_success_clip<H, N, A, C, R, S>(&mut self, ports: &mut Ports<H, N, A, C, R, S>)
    where
        A: AudioPort,
        R: RandomSource,
        S: EventSink,
    {
        let clips = &self.ctx.config.success_clips;
        if clips.is_empty() {
            debug!("Audio: no success clips configured");
            return;
        }
        let idx = ports.rng.next_u32() as usize % clips.len();
        let clip = &clips[idx];

        match ports.audio.play(clip) {
            Ok(handle) => {
                self.playback = Some(handle);
                ports.sink.emit(&AppEvent::AudioStarted(clip.clone()));
            }
            Err(e) => {
                warn!("Audio: skipping '{}': {}", clip, e);
                self.playback = None;
                ports.sink.emit(&AppEvent::AudioSkipped(e));
            }
        }
    }
}

