//! Integration tests for the trigger → webhook → feedback → release cycle.
//!
//! Timings below follow the default configuration: 10 ms frames, 20 ms
//! debounce, 2 s minimum chase, a 3 s / 40-step pulse.

use super::mock_hw::{Rig, Scenario};

use tagring::adapters::audio::{SimPcmOutput, WavClipPlayer};
use tagring::app::events::AppEvent;
use tagring::app::ports::AudioError;
use tagring::fsm::LoopPhase;
use tagring::webhook::{CallOutcome, EVENT_RFID_SCAN, FailureReason};

fn tag_for(start: u64, end: u64) -> Scenario {
    Scenario {
        tag_windows: vec![(start, end)],
        ..Default::default()
    }
}

// ── Full cycle ────────────────────────────────────────────────

#[test]
fn success_cycle_follows_expected_timeline() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(6_500);

    assert_eq!(
        rig.ports.sink.transitions(),
        vec![
            (0, LoopPhase::Debouncing),
            (20, LoopPhase::AwaitingResult),
            (2_020, LoopPhase::Feedback),
            (5_100, LoopPhase::WaitingForRelease),
            (6_000, LoopPhase::Idle),
        ]
    );
    assert_eq!(rig.app.phase(), LoopPhase::Idle);
    assert_eq!(rig.app.heartbeat_last_fire(), 6_000);
}

#[test]
fn success_cycle_calls_once_and_plays_clip() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(6_500);

    assert_eq!(rig.ports.net.begins.len(), 1);
    assert_eq!(rig.ports.audio.plays, vec![(2_020, String::from("chime"))]);
    assert_eq!(
        rig.ports
            .sink
            .count(|e| *e == AppEvent::CallCompleted(CallOutcome::Success)),
        1
    );
    assert_eq!(
        rig.ports.sink.count(|e| matches!(
            e,
            AppEvent::CycleCompleted {
                heartbeat_reset_ms: 6_000
            }
        )),
        1
    );
}

#[test]
fn success_pulse_is_green_and_starts_at_quarter_brightness() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(6_500);

    // k(0) = 0.25 → 120 * 0.25 = 30
    assert_eq!(rig.ports.hw.frame_at(2_020), Some(&[(0, 30, 0); 16][..]));
    // Midway (step 20 of 40) the pulse peaks at full colour.
    assert_eq!(rig.ports.hw.frame_at(2_020 + 1_500), Some(&[(0, 120, 0); 16][..]));
}

#[test]
fn clip_choice_follows_random_source() {
    let mut rig = Rig::new(Scenario {
        rng: 7,
        ..tag_for(0, 6_000)
    });
    rig.run_until(6_500);

    // 7 % 5 clips → index 2
    assert_eq!(rig.ports.audio.plays[0].1, "hello");
}

// ── Failure feedback ──────────────────────────────────────────

#[test]
fn failure_pulses_red_without_audio() {
    let outcome = CallOutcome::Failure(FailureReason::Status(500));
    let mut rig = Rig::new(Scenario {
        outcome,
        ..tag_for(0, 6_000)
    });
    rig.run_until(6_500);

    assert!(rig.ports.audio.plays.is_empty());
    assert_eq!(rig.ports.sink.count(|e| *e == AppEvent::CallCompleted(outcome)), 1);
    assert_eq!(rig.ports.hw.frame_at(2_020), Some(&[(30, 0, 0); 16][..]));
    assert_eq!(rig.app.phase(), LoopPhase::Idle);
}

#[test]
fn timeout_is_a_failure() {
    let outcome = CallOutcome::Failure(FailureReason::Timeout);
    let mut rig = Rig::new(Scenario {
        outcome,
        latency_ms: 5_000,
        ..tag_for(0, 10_000)
    });
    rig.run_until(10_500);

    assert!(rig.ports.audio.plays.is_empty());
    assert!(
        rig.ports
            .sink
            .transitions()
            .contains(&(5_020, LoopPhase::Feedback))
    );
}

// ── Busy chase ────────────────────────────────────────────────

#[test]
fn chase_shows_exactly_segment_size_while_awaiting() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(2_000);

    assert_eq!(rig.app.phase(), LoopPhase::AwaitingResult);
    for t in (30..2_000).step_by(70) {
        assert_eq!(rig.ports.hw.lit_at(t), 4, "frame at {t}ms");
    }
    let frame = rig.ports.hw.frame_at(1_000).unwrap();
    assert!(
        frame
            .iter()
            .all(|p| *p == (0, 0, 0) || *p == (180, 160, 120))
    );
}

#[test]
fn fast_call_still_shows_minimum_chase() {
    let mut rig = Rig::new(Scenario {
        latency_ms: 0,
        ..tag_for(0, 6_000)
    });
    rig.run_until(2_500);

    let feedback_at = rig
        .ports
        .sink
        .transitions()
        .into_iter()
        .find(|(_, p)| *p == LoopPhase::Feedback)
        .map(|(t, _)| t);
    assert_eq!(feedback_at, Some(2_020));
}

#[test]
fn slow_call_holds_chase_until_outcome() {
    let mut rig = Rig::new(Scenario {
        latency_ms: 4_000,
        ..tag_for(0, 9_000)
    });
    rig.run_until(9_500);

    assert!(
        rig.ports
            .sink
            .transitions()
            .contains(&(4_020, LoopPhase::Feedback))
    );
    assert_eq!(rig.ports.hw.lit_at(4_010), 4);
}

#[test]
fn no_outcome_keeps_awaiting() {
    let mut rig = Rig::new(Scenario {
        latency_ms: u64::from(u32::MAX),
        ..tag_for(0, 1_000)
    });
    rig.run_until(12_000);

    assert_eq!(rig.app.phase(), LoopPhase::AwaitingResult);
    assert_eq!(rig.ports.net.begins.len(), 1);
}

// ── Retrigger suppression ─────────────────────────────────────

#[test]
fn held_tag_never_retriggers() {
    let mut rig = Rig::new(tag_for(0, 30_000));
    rig.run_until(30_000);

    assert_eq!(rig.ports.net.begins.len(), 1);
    assert_eq!(rig.app.phase(), LoopPhase::WaitingForRelease);
    assert_eq!(rig.ports.sink.count(|e| *e == AppEvent::HeartbeatGlow), 0);
    // Nothing lit while waiting for the tag to go.
    assert_eq!(rig.ports.hw.lit_at(20_000), 0);
}

#[test]
fn tag_removed_and_presented_again_triggers_second_call() {
    let mut rig = Rig::new(Scenario {
        tag_windows: vec![(0, 6_000), (8_000, 14_000)],
        ..Default::default()
    });
    rig.run_until(14_500);

    assert_eq!(rig.ports.net.begins.len(), 2);
    assert_eq!(
        rig.ports
            .sink
            .count(|e| matches!(e, AppEvent::CycleCompleted { .. })),
        2
    );
}

#[test]
fn brief_tap_still_completes_a_cycle() {
    let mut rig = Rig::new(tag_for(0, 10));
    rig.run_until(6_000);

    assert_eq!(rig.ports.net.begins.len(), 1);
    let transitions = rig.ports.sink.transitions();
    assert_eq!(transitions.last(), Some(&(5_110, LoopPhase::Idle)));
}

#[test]
fn tag_present_at_boot_triggers() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(10);
    assert_eq!(rig.ports.sink.transitions(), vec![(0, LoopPhase::Debouncing)]);
}

// ── Audio ─────────────────────────────────────────────────────

#[test]
fn missing_clip_still_pulses_and_completes() {
    let mut rig = Rig::new(Scenario {
        clips_missing: true,
        ..tag_for(0, 6_000)
    });
    rig.run_until(6_500);

    assert_eq!(
        rig.ports
            .sink
            .count(|e| *e == AppEvent::AudioSkipped(AudioError::ClipMissing)),
        1
    );
    assert_eq!(rig.ports.hw.frame_at(2_020), Some(&[(0, 30, 0); 16][..]));
    assert!(
        rig.ports
            .sink
            .transitions()
            .contains(&(5_100, LoopPhase::WaitingForRelease))
    );
}

#[test]
fn malformed_clip_is_skipped_and_cycle_completes() {
    // Stereo at u32::MAX Hz: the byte rate cannot be represented.
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF\x28\x00\x00\x00WAVEfmt \x10\x00\x00\x00");
    wav.extend_from_slice(&[1, 0, 2, 0]);
    wav.extend_from_slice(&u32::MAX.to_le_bytes());
    wav.extend_from_slice(&[0xfc, 0xff, 0xff, 0xff, 4, 0, 16, 0]);
    wav.extend_from_slice(b"data\x04\x00\x00\x00\x00\x00\x00\x00");

    let dir = std::env::temp_dir().join(format!("tagring-cycle-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("chime.wav"), &wav).unwrap();

    let audio = WavClipPlayer::new(&dir, SimPcmOutput::new());
    let mut rig = Rig::with_audio(tag_for(0, 6_000), audio);
    rig.run_until(6_500);

    assert_eq!(
        rig.ports
            .sink
            .count(|e| *e == AppEvent::AudioSkipped(AudioError::UnsupportedFormat)),
        1
    );
    let transitions = rig.ports.sink.transitions();
    assert!(transitions.contains(&(5_100, LoopPhase::WaitingForRelease)));
    assert!(transitions.contains(&(6_000, LoopPhase::Idle)));
}

#[test]
fn long_clip_delays_release_phase() {
    let mut rig = Rig::new(Scenario {
        clip_ms: 5_000,
        ..tag_for(0, 6_000)
    });
    rig.run_until(8_000);

    let transitions = rig.ports.sink.transitions();
    assert!(transitions.contains(&(7_020, LoopPhase::WaitingForRelease)));
    assert!(transitions.contains(&(7_030, LoopPhase::Idle)));
    assert_eq!(rig.app.heartbeat_last_fire(), 7_030);
}

// ── Payload ───────────────────────────────────────────────────

#[test]
fn payload_uses_uptime_until_clock_synced() {
    let mut rig = Rig::new(tag_for(0, 6_000));
    rig.run_until(100);

    let (at, payload) = &rig.ports.net.begins[0];
    assert_eq!(*at, 20);
    assert_eq!(payload.event, EVENT_RFID_SCAN);
    assert_eq!(payload.device, "magicband_v2");
    assert!((payload.ts - 0.02).abs() < 1e-9);
}

#[test]
fn payload_uses_wall_clock_when_synced() {
    let mut rig = Rig::new(Scenario {
        epoch: Some(1_760_000_000.5),
        ..tag_for(0, 6_000)
    });
    rig.run_until(100);

    let (_, payload) = &rig.ports.net.begins[0];
    assert!((payload.ts - 1_760_000_000.5).abs() < 1e-6);
}
