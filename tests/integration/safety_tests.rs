//! Safety rules: over-temperature and the process watchdog.

use heatcycle::app::events::ProcessEvent;
use heatcycle::error::SafetyFault;
use heatcycle::fsm::Phase;

use super::mock_hw::{scenario_config, started, MockHardware, RecordingSink, ScriptedSource};

const HOUR_MS: u64 = 3_600_000;

/// Drive a fresh service from Idle into `Hot`.
fn hot() -> (heatcycle::app::service::AppService, MockHardware, RecordingSink) {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);
    hw.reading = 102.5;
    app.tick(&mut hw, &mut source, &mut sink);
    assert_eq!(app.phase(), Phase::Hot);
    sink.clear();
    (app, hw, sink)
}

#[test]
fn over_temperature_in_hot_stops_the_process() {
    let (mut app, mut hw, mut sink) = hot();
    hw.reading = 121.0;

    let report = app.tick(&mut hw, &mut ScriptedSource::new(), &mut sink);

    assert_eq!(report.fault, Some(SafetyFault::OverTemperature));
    assert_eq!(app.phase(), Phase::Idle);
    assert!(!hw.relay_on());
    assert!(sink.events.contains(&ProcessEvent::OverTemperature {
        reading: 121.0,
        limit: 120.0
    }));
}

#[test]
fn reading_at_the_limit_is_not_a_trip() {
    let (mut app, mut hw, mut sink) = hot();
    hw.reading = 120.0;

    let report = app.tick(&mut hw, &mut ScriptedSource::new(), &mut sink);

    assert_eq!(report.fault, None);
    assert_eq!(app.phase(), Phase::Hot);
}

#[test]
fn over_temperature_is_ignored_while_idle() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    hw.reading = 150.0;

    let report = app.tick(&mut hw, &mut ScriptedSource::new(), &mut sink);

    assert_eq!(report.fault, None);
    assert_eq!(app.phase(), Phase::Idle);
    assert!(hw.relay_writes.is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn over_temperature_trips_in_every_active_phase() {
    for cmd in ["/start", "/lubricate", "/cooldown"] {
        let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
        let mut source = ScriptedSource::new();
        source.say(cmd);
        app.tick(&mut hw, &mut source, &mut sink);
        assert!(app.phase().is_active(), "{cmd} should activate");

        hw.reading = 130.0;
        let report = app.tick(&mut hw, &mut source, &mut sink);

        assert_eq!(report.fault, Some(SafetyFault::OverTemperature), "after {cmd}");
        assert_eq!(app.phase(), Phase::Idle, "after {cmd}");
        assert!(!hw.relay_on(), "after {cmd}");
    }
}

#[test]
fn heating_watchdog_expires_exactly_at_deadline() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.advance(3 * HOUR_MS - 1);
    app.tick(&mut hw, &mut source, &mut sink);
    assert_eq!(app.phase(), Phase::Heating);

    hw.advance(1);
    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.fault, Some(SafetyFault::ProcessTimeout));
    assert_eq!(app.phase(), Phase::Idle);
    assert_eq!(hw.relay_writes, vec![true, false]);
    assert!(sink.events.contains(&ProcessEvent::TimeoutExpired {
        phase: Phase::Heating,
        reading: 20.0
    }));
}

#[test]
fn lubrication_deadline_leads_to_cooling_not_idle() {
    let (mut app, mut hw, mut sink) = hot();
    let mut source = ScriptedSource::new();
    source.say("/lubricate");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.advance(HOUR_MS);
    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.fault, None);
    assert_eq!(app.phase(), Phase::Cooling);
    assert_eq!(sink.count("LUBRICATION_FINISHED"), 1);
    assert_eq!(sink.count("TIMEOUT"), 0);
}

#[test]
fn cool_phase_is_guarded_by_the_watchdog() {
    let (mut app, mut hw, mut sink) = hot();
    let mut source = ScriptedSource::new();
    source.say("/cooldown");
    app.tick(&mut hw, &mut source, &mut sink);
    hw.reading = 60.0;
    app.tick(&mut hw, &mut source, &mut sink);
    assert_eq!(app.phase(), Phase::Cool);

    hw.advance(3 * HOUR_MS);
    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.fault, Some(SafetyFault::ProcessTimeout));
    assert_eq!(app.phase(), Phase::Idle);
    assert!(!hw.relay_on());
    assert!(sink.events.contains(&ProcessEvent::TimeoutExpired {
        phase: Phase::Cool,
        reading: 60.0
    }));
}

#[test]
fn over_temperature_wins_over_a_simultaneous_timeout() {
    let (mut app, mut hw, mut sink) = hot();
    hw.advance(3 * HOUR_MS);
    hw.reading = 125.0;

    let report = app.tick(&mut hw, &mut ScriptedSource::new(), &mut sink);

    assert_eq!(report.fault, Some(SafetyFault::OverTemperature));
    assert_eq!(sink.count("TIMEOUT"), 0);
    assert_eq!(sink.count("OVER_TEMPERATURE"), 1);
}

#[test]
fn restart_after_a_trip_runs_a_fresh_cycle() {
    let (mut app, mut hw, mut sink) = hot();
    hw.reading = 125.0;
    app.tick(&mut hw, &mut ScriptedSource::new(), &mut sink);
    assert_eq!(app.phase(), Phase::Idle);

    hw.reading = 80.0;
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(app.phase(), Phase::Heating);
    assert!(hw.relay_on());
    assert_eq!(app.remaining(), Some(core::time::Duration::from_secs(3 * 3600)));
}

#[test]
fn unvalidated_infinite_timeout_never_expires() {
    let cfg = heatcycle::config::SystemConfig {
        process_timeout_hours: f32::INFINITY,
        ..scenario_config()
    };
    let (mut app, mut hw, mut sink) = started(cfg, 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.advance(1_000 * HOUR_MS);
    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.fault, None);
    assert_eq!(app.phase(), Phase::Heating);
    assert_eq!(app.deadline().at_ms(), Some(u64::MAX));
}
