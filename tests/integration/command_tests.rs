//! Operator command handling through the full tick pipeline.

use core::time::Duration;

use heatcycle::app::commands::ChatId;
use heatcycle::app::events::ProcessEvent;
use heatcycle::fsm::Phase;

use super::mock_hw::{scenario_config, started, ScriptedSource};

#[test]
fn start_from_idle_arms_hot_target_and_heats() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");

    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.commands, 1);
    assert_eq!(app.phase(), Phase::Heating);
    assert_eq!(app.target(), Some(102.0));
    assert_eq!(hw.relay_writes, vec![true]);
    assert_eq!(sink.transitions(), vec![("IDLE", "HEATING")]);
    assert_eq!(app.remaining(), Some(Duration::from_secs(3 * 3600)));
}

#[test]
fn start_while_heating_reenters_and_restarts_watchdog() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);
    let first = app.deadline().at_ms();

    hw.advance(60_000);
    sink.clear();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(app.phase(), Phase::Heating);
    assert!(sink.transitions().is_empty(), "re-entry is not a phase change");
    assert_eq!(sink.count("STARTING"), 1);
    assert_eq!(app.deadline().at_ms(), first.map(|at| at + 60_000));
    assert_eq!(hw.relay_writes, vec![true], "relay already on, no second write");
}

#[test]
fn lubricate_outside_hot_is_accepted_with_warning() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/lubricate");

    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(app.phase(), Phase::Lubricating);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        ProcessEvent::Lubricating { warning: Some(Phase::Idle), .. }
    )));
    assert!(hw.relay_on(), "20 C is below the hot dead-band");
    assert_eq!(app.remaining(), Some(Duration::from_secs(3600)));
}

#[test]
fn cooldown_outside_lubricating_is_accepted_with_warning() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.reading = 90.0;
    sink.clear();
    source.say("/cooldown");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(app.phase(), Phase::Cooling);
    assert_eq!(app.target(), Some(72.0));
    assert!(!hw.relay_on(), "90 C is above the cool target");
    assert!(sink.events.iter().any(|e| matches!(
        e,
        ProcessEvent::CoolingDown { warning: Some(Phase::Heating), .. }
    )));
}

#[test]
fn stop_in_idle_changes_nothing() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/stop");
    source.say("/stop");

    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.commands, 2);
    assert_eq!(app.phase(), Phase::Idle);
    assert!(hw.relay_writes.is_empty());
    assert!(sink.transitions().is_empty());
    assert_eq!(sink.count("STOPPING"), 2);
}

#[test]
fn stop_from_active_phase_turns_relay_off() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    source.say("/stop");

    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(app.phase(), Phase::Idle);
    assert_eq!(hw.relay_writes, vec![true, false]);
    assert_eq!(app.target(), None);
    assert_eq!(app.remaining(), None);
    assert_eq!(
        sink.transitions(),
        vec![("IDLE", "HEATING"), ("HEATING", "IDLE")]
    );
}

#[test]
fn status_reports_phase_target_and_time_left() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.advance(30 * 60 * 1000);
    hw.reading = 55.0;
    sink.clear();
    let token = source.say("/status");
    app.tick(&mut hw, &mut source, &mut sink);

    let status = sink
        .events
        .iter()
        .find(|e| e.name() == "STATUS")
        .expect("status event");
    assert_eq!(
        status,
        &ProcessEvent::Status {
            reply_to: Some(token),
            phase: Phase::Heating,
            reading: 55.0,
            heating: true,
            target: Some(102.0),
            remaining: Some(Duration::from_secs(150 * 60)),
        }
    );
    assert_eq!(app.phase(), Phase::Heating, "status never changes phase");
}

#[test]
fn foreign_and_non_command_messages_are_ignored() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say_as(ChatId(1), "/start");
    source.say("hello there");
    source.say("/unknown");

    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(report.commands, 0);
    assert_eq!(source.pending(), 0, "inbox is drained anyway");
    assert_eq!(app.phase(), Phase::Idle);
    assert!(sink.events.is_empty());
}

#[test]
fn reconfigure_is_reported_without_touching_the_process() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    source.say("/reconfigure");
    let report = app.tick(&mut hw, &mut source, &mut sink);

    assert!(report.reconfigure);
    assert_eq!(report.commands, 0);
    assert_eq!(app.phase(), Phase::Heating);
}

#[test]
fn sensor_is_polled_every_tick() {
    let (mut app, mut hw, mut sink) = started(scenario_config(), 20.0);
    let mut source = ScriptedSource::new();
    for _ in 0..5 {
        hw.advance(50);
        app.tick(&mut hw, &mut source, &mut sink);
    }
    assert_eq!(hw.polls, 6, "once at start, then once per tick");
    assert_eq!(app.tick_count(), 5);
}
