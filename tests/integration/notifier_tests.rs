//! Operator-facing notifications rendered from a live service.

use heatcycle::app::notifier::Notifier;
use heatcycle::app::service::AppService;

use super::mock_hw::{
    scenario_config, MockHardware, RecordingChat, RecordingSink, ScriptedSource, OPERATOR,
};

type Sink = (RecordingSink, Notifier<RecordingChat>);

fn chat_service(reading: f32) -> (AppService, MockHardware, Sink) {
    let mut app = AppService::new(scenario_config(), OPERATOR);
    let mut hw = MockHardware::new(reading);
    let mut sink = (RecordingSink::new(), Notifier::new(RecordingChat::default()));
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

fn chat(sink: &Sink) -> &RecordingChat {
    sink.1.sink()
}

#[test]
fn startup_is_announced_without_reply_token() {
    let (_app, _hw, sink) = chat_service(21.5);
    assert_eq!(
        chat(&sink).messages,
        vec![(None, "Temperature monitor started: [21.50 C]".to_owned())]
    );
}

#[test]
fn command_answers_reply_to_their_message() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();
    let token = source.say("/start");

    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(
        chat(&sink).messages.last(),
        Some(&(Some(token), "Starting: [20.00 C]".to_owned()))
    );
}

#[test]
fn internal_events_are_not_sent_to_chat() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");

    app.tick(&mut hw, &mut source, &mut sink);

    // STARTING, PHASE and RELAY were all emitted...
    assert_eq!(sink.0.count("PHASE"), 1);
    assert_eq!(sink.0.count("RELAY"), 1);
    // ...but only the monitor banner and the answer reached the chat.
    assert_eq!(sink.1.sent(), 2);
}

#[test]
fn misordered_lubricate_carries_a_warning_line() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.reading = 50.0;
    source.say("/lubricate");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(
        chat(&sink).last(),
        Some("Warning: state is not HOT (was HEATING)\nLubricating. [50.00 C]")
    );
}

#[test]
fn full_cycle_notifications_in_order() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();

    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);
    hw.reading = 102.5;
    app.tick(&mut hw, &mut source, &mut sink);
    source.say("/lubricate");
    app.tick(&mut hw, &mut source, &mut sink);
    hw.advance_hours(1.0);
    app.tick(&mut hw, &mut source, &mut sink);
    hw.reading = 70.0;
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(
        chat(&sink).texts(),
        vec![
            "Temperature monitor started: [20.00 C]",
            "Starting: [20.00 C]",
            "Lubrication target temperature reached. [102.50 C]",
            "Lubricating. [102.50 C]",
            "Finished lubricating, started cooling down. [102.50 C]",
            "Cooldown temperature reached. [70.00 C]",
        ]
    );
}

#[test]
fn safety_trip_is_spontaneous() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.reading = 125.0;
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(
        chat(&sink).messages.last(),
        Some(&(
            None,
            "Max temperature exceeded, stopping. [125.00 C > 120.00 C]".to_owned()
        ))
    );
}

#[test]
fn status_text_includes_target_and_time_left() {
    let (mut app, mut hw, mut sink) = chat_service(20.0);
    let mut source = ScriptedSource::new();
    source.say("/start");
    app.tick(&mut hw, &mut source, &mut sink);

    hw.advance(30 * 60 * 1000);
    hw.reading = 55.0;
    source.say("/status");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(
        chat(&sink).last(),
        Some("state=HEATING [55.00 C] heater=ON target=102.00 C timeout in 2h 30m")
    );
}

#[test]
fn idle_status_has_no_target_or_timeout() {
    let (mut app, mut hw, mut sink) = chat_service(19.0);
    let mut source = ScriptedSource::new();
    source.say("/status");
    app.tick(&mut hw, &mut source, &mut sink);

    assert_eq!(chat(&sink).last(), Some("state=IDLE [19.00 C] heater=OFF"));
}
