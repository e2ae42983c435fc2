//! Bot API client wired to the service through the inbox/outbox channels.


use embassy_sync::channel::Channel;
use serde_json::Value;

use heatcycle::adapters::telegram::{BotHttp, TelegramClient};
use heatcycle::app::commands::{ProcessCommand, RemoteCommand};
use heatcycle::app::inbox::{ChannelSource, Inbox, Outbox, OutboxSink};
use heatcycle::app::notifier::Notifier;
use heatcycle::app::ports::NotificationSink;
use heatcycle::app::service::AppService;
use heatcycle::error::CommsError;
use heatcycle::fsm::Phase;

use super::mock_hw::{scenario_config, MockHardware, OPERATOR};

const ACK: &str = r#"{"ok":true,"result":{"message_id":1}}"#;

/// In-memory Bot API.  Keeps every update server-side and serves those at
/// or past the requested `offset`, at most `limit` (and `page`, if set) per
/// call.  Records every `sendMessage` body and every requested limit.
#[derive(Default)]
struct FakeBotApi {
    updates: Vec<Value>,
    /// Server-side cap per response; 0 means only `limit` applies.
    page: usize,
    fail_sends: u32,
    sent: Vec<Value>,
    limits: Vec<u64>,
}

impl FakeBotApi {
    fn queue_texts(&mut self, first_update: i64, chat: i64, texts: &[&str]) {
        for (i, text) in texts.iter().enumerate() {
            let id = first_update + i as i64;
            self.updates.push(serde_json::json!({
                "update_id": id,
                "message": {
                    "message_id": 500 + id,
                    "chat": { "id": chat, "type": "private" },
                    "date": 0,
                    "text": text,
                }
            }));
        }
    }

    fn get_updates(&mut self, body: &[u8]) -> String {
        let req: Value = serde_json::from_slice(body).expect("json body");
        let offset = req["offset"].as_i64().unwrap_or(0);
        let mut limit = req["limit"].as_u64().unwrap_or(100) as usize;
        self.limits.push(limit as u64);
        if self.page > 0 {
            limit = limit.min(self.page);
        }
        let batch: Vec<&Value> = self
            .updates
            .iter()
            .filter(|u| u["update_id"].as_i64().unwrap_or(0) >= offset)
            .take(limit)
            .collect();
        serde_json::json!({ "ok": true, "result": batch }).to_string()
    }
}

impl BotHttp for FakeBotApi {
    fn post(&mut self, method: &str, body: &[u8], response: &mut Vec<u8>) -> Result<u16, CommsError> {
        match method {
            "getUpdates" => {
                let batch = self.get_updates(body);
                response.extend_from_slice(batch.as_bytes());
                Ok(200)
            }
            "sendMessage" => {
                if self.fail_sends > 0 {
                    self.fail_sends -= 1;
                    return Ok(500);
                }
                self.sent.push(serde_json::from_slice(body).expect("json body"));
                response.extend_from_slice(ACK.as_bytes());
                Ok(200)
            }
            other => panic!("unexpected method {other}"),
        }
    }
}

#[test]
fn operator_command_round_trip() {
    let inbox: Inbox<8> = Channel::new();
    let outbox: Outbox<16> = Channel::new();
    let mut client = TelegramClient::new(FakeBotApi::default());
    client.http_mut().queue_texts(10, OPERATOR.0, &["/start"]);

    let mut app = AppService::new(scenario_config(), OPERATOR);
    let mut hw = MockHardware::new(20.0);
    let mut source = ChannelSource::new(&inbox);
    let mut sink = Notifier::new(OutboxSink::new(&outbox));
    app.start(&mut hw, &mut sink);

    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(1));
    app.tick(&mut hw, &mut source, &mut sink);
    assert_eq!(app.phase(), Phase::Heating);

    assert_eq!(client.flush(OPERATOR, &outbox), 2);
    let sent = &client.http_mut().sent;
    assert_eq!(sent[0]["text"], "Temperature monitor started: [20.00 C]");
    assert!(sent[0].get("reply_to_message_id").is_none());
    assert_eq!(sent[1]["text"], "Starting: [20.00 C]");
    assert_eq!(sent[1]["reply_to_message_id"], 510);
    assert_eq!(sent[1]["chat_id"], OPERATOR.0);
}

#[test]
fn poll_drains_backlog_across_batches() {
    let inbox: Inbox<8> = Channel::new();
    let mut client = TelegramClient::new(FakeBotApi::default());
    client.http_mut().page = 2;
    client.http_mut().queue_texts(1, OPERATOR.0, &["/status", "/start", "/stop"]);

    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(3));
    assert_eq!(client.offset(), 4);
    assert_eq!(client.received(), 3);
    assert_eq!(inbox.len(), 3);
}

#[test]
fn full_inbox_leaves_the_rest_for_the_next_poll() {
    let inbox: Inbox<2> = Channel::new();
    let mut client = TelegramClient::new(FakeBotApi::default());
    client
        .http_mut()
        .queue_texts(1, OPERATOR.0, &["/status", "/start", "/stop"]);

    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(2));
    assert_eq!(client.http_mut().limits, vec![2]);
    assert_eq!(client.offset(), 3, "the third update is not acknowledged");

    // Inbox stays full: nothing is fetched, nothing is acknowledged.
    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(0));
    assert_eq!(client.offset(), 3);

    let mut commands = Vec::new();
    while let Ok(msg) = inbox.try_receive() {
        commands.push(msg.command);
    }
    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(1));
    assert_eq!(client.offset(), 4);
    commands.push(inbox.try_receive().expect("queued").command);

    assert_eq!(
        commands,
        vec![
            Some(RemoteCommand::Process(ProcessCommand::Status)),
            Some(RemoteCommand::Process(ProcessCommand::Start)),
            Some(RemoteCommand::Process(ProcessCommand::Stop)),
        ]
    );
}

#[test]
fn foreign_chatter_cannot_crowd_out_the_operator() {
    let inbox: Inbox<8> = Channel::new();
    let mut client = TelegramClient::new(FakeBotApi::default());
    client.http_mut().queue_texts(1, 777, &["hi"; 8]);
    client.http_mut().queue_texts(9, OPERATOR.0, &["/stop"]);

    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(1));
    assert_eq!(client.offset(), 10);
    assert_eq!(inbox.len(), 1);
    let msg = inbox.try_receive().expect("operator message queued");
    assert_eq!(msg.sender, OPERATOR);
    assert_eq!(msg.command, Some(RemoteCommand::Process(ProcessCommand::Stop)));
}

#[test]
fn foreign_chat_is_acknowledged_but_never_queued() {
    let inbox: Inbox<8> = Channel::new();
    let outbox: Outbox<16> = Channel::new();
    let mut client = TelegramClient::new(FakeBotApi::default());
    client.http_mut().queue_texts(1, 777, &["/start"]);

    let mut app = AppService::new(scenario_config(), OPERATOR);
    let mut hw = MockHardware::new(20.0);
    let mut sink = Notifier::new(OutboxSink::new(&outbox));
    app.start(&mut hw, &mut sink);

    assert_eq!(client.poll_into(OPERATOR, &inbox), Ok(0));
    assert_eq!(client.offset(), 2);
    let report = app.tick(&mut hw, &mut ChannelSource::new(&inbox), &mut sink);

    assert_eq!(report.commands, 0);
    assert_eq!(app.phase(), Phase::Idle);
    assert!(hw.relay_writes.is_empty());
}

#[test]
fn failed_send_is_dropped_and_flush_continues() {
    let outbox: Outbox<16> = Channel::new();
    let mut sink = OutboxSink::new(&outbox);
    sink.deliver(None, "first");
    sink.deliver(None, "second");

    let mut client = TelegramClient::new(FakeBotApi {
        fail_sends: 1,
        ..Default::default()
    });

    assert_eq!(client.flush(OPERATOR, &outbox), 1);
    assert_eq!(client.failures(), 1);
    assert_eq!(client.http_mut().sent[0]["text"], "second");
    assert!(outbox.try_receive().is_err());
}
