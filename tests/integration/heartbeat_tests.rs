//! Idle heartbeat behaviour through the full service.

use super::mock_hw::{Rig, Scenario};

use tagring::app::events::AppEvent;
use tagring::fsm::LoopPhase;

const GLOW: (u8, u8, u8) = (8, 6, 3);

#[test]
fn idle_ring_glows_briefly_every_interval() {
    let mut rig = Rig::new(Scenario::default());
    rig.run_until(10_400);

    assert_eq!(rig.ports.hw.lit_at(9_990), 0);
    assert_eq!(rig.ports.hw.frame_at(10_000), Some(&[GLOW; 16][..]));
    assert_eq!(rig.ports.hw.frame_at(10_240), Some(&[GLOW; 16][..]));
    assert_eq!(rig.ports.hw.lit_at(10_250), 0);
    assert_eq!(rig.ports.sink.count(|e| *e == AppEvent::HeartbeatGlow), 1);
    // Recorded at the moment the glow opened.
    assert_eq!(rig.app.heartbeat_last_fire(), 10_000);
}

#[test]
fn glows_open_every_interval() {
    let mut rig = Rig::new(Scenario::default());
    rig.run_until(31_000);

    let glows: Vec<u64> = rig
        .ports
        .sink
        .events
        .iter()
        .filter(|(_, e)| *e == AppEvent::HeartbeatGlow)
        .map(|(t, _)| *t)
        .collect();
    // Each glow ends 250 ms after it opens at 10 s, 20 s, 30 s.
    assert_eq!(glows, vec![10_250, 20_250, 30_250]);
    for opened in [10_000, 20_000, 30_000] {
        assert_eq!(rig.ports.hw.frame_at(opened), Some(&[GLOW; 16][..]));
        assert_eq!(rig.ports.hw.lit_at(opened - 10), 0);
    }
}

#[test]
fn completed_cycle_restarts_heartbeat_interval() {
    let mut rig = Rig::new(Scenario {
        tag_windows: vec![(9_000, 15_000)],
        ..Default::default()
    });
    rig.run_until(26_000);

    // The 10 s mark passed while a tag was present: no glow then.
    assert_eq!(rig.ports.hw.lit_at(10_100), 4);
    let glows: Vec<u64> = rig
        .ports
        .sink
        .events
        .iter()
        .filter(|(_, e)| *e == AppEvent::HeartbeatGlow)
        .map(|(t, _)| *t)
        .collect();
    // Back in idle at 15 000; next glow opens at 25 000.
    assert_eq!(glows, vec![25_250]);
    assert_eq!(rig.ports.hw.frame_at(25_000), Some(&[GLOW; 16][..]));
    assert_eq!(rig.app.heartbeat_last_fire(), 25_000);
}

#[test]
fn tag_during_glow_cuts_it_short() {
    let mut rig = Rig::new(Scenario {
        tag_windows: vec![(10_100, 16_000)],
        ..Default::default()
    });
    rig.run_until(10_110);

    assert_eq!(rig.ports.hw.frame_at(10_090), Some(&[GLOW; 16][..]));
    assert_eq!(rig.ports.hw.lit_at(10_100), 0);
    assert_eq!(rig.ports.sink.count(|e| *e == AppEvent::HeartbeatGlow), 0);
    assert_eq!(rig.app.phase(), LoopPhase::Debouncing);
}
