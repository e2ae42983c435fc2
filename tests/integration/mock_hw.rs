//! Mock adapters for integration tests.
//!
//! Records every relay write, event and notification so tests can assert
//! on the full history without touching real GPIO or the network.

use std::collections::{HashMap, VecDeque};

use heatcycle::app::commands::{ChatId, InboundMessage, ReplyToken};
use heatcycle::app::events::ProcessEvent;
use heatcycle::app::ports::{
    ClockPort, ConfigError, ConfigPort, EventSink, MessageSource, NotificationSink, RelayPort,
    SensorPort, StorageError, StoragePort,
};
use heatcycle::app::service::AppService;
use heatcycle::config::SystemConfig;

pub const OPERATOR: ChatId = ChatId(4242);

// ── MockHardware ──────────────────────────────────────────────

/// Probe, relay and clock in one, as the service expects.
pub struct MockHardware {
    pub reading: f32,
    pub now_ms: u64,
    /// Every `RelayPort::set` call, in order.
    pub relay_writes: Vec<bool>,
    pub polls: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(reading: f32) -> Self {
        Self {
            reading,
            now_ms: 0,
            relay_writes: Vec::new(),
            polls: 0,
        }
    }

    /// Level the relay was last driven to (off if never written).
    pub fn relay_on(&self) -> bool {
        self.relay_writes.last().copied().unwrap_or(false)
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn advance_hours(&mut self, hours: f32) {
        self.now_ms += (hours * 3_600_000.0) as u64;
    }
}

impl SensorPort for MockHardware {
    fn poll(&mut self, _now_ms: u64) {
        self.polls += 1;
    }

    fn current_reading(&self) -> f32 {
        self.reading
    }
}

impl RelayPort for MockHardware {
    fn set(&mut self, on: bool) {
        self.relay_writes.push(on);
    }
}

impl ClockPort for MockHardware {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

// ── ScriptedSource ────────────────────────────────────────────

/// Messages handed to the service on its next tick.
#[derive(Default)]
pub struct ScriptedSource {
    queue: VecDeque<InboundMessage>,
    next_id: i64,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` from the operator; returns its reply token.
    pub fn say(&mut self, text: &str) -> ReplyToken {
        self.say_as(OPERATOR, text)
    }

    pub fn say_as(&mut self, sender: ChatId, text: &str) -> ReplyToken {
        self.next_id += 1;
        let token = ReplyToken(self.next_id);
        self.queue.push_back(InboundMessage::from_text(sender, token, text));
        token
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl MessageSource for ScriptedSource {
    fn next_message(&mut self) -> Option<InboundMessage> {
        self.queue.pop_front()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ProcessEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Phase transitions, in order, as `(from, to)` names.
    pub fn transitions(&self) -> Vec<(&'static str, &'static str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::PhaseChanged { from, to } => Some((from.name(), to.name())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ProcessEvent) {
        self.events.push(event.clone());
    }
}

// ── RecordingChat ─────────────────────────────────────────────

/// Notification sink that keeps every rendered message.
#[derive(Default)]
pub struct RecordingChat {
    pub messages: Vec<(Option<ReplyToken>, String)>,
}

#[allow(dead_code)]
impl RecordingChat {
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|(_, t)| t.as_str()).collect()
    }

    pub fn last(&self) -> Option<&str> {
        self.messages.last().map(|(_, t)| t.as_str())
    }
}

impl NotificationSink for RecordingChat {
    fn deliver(&mut self, reply_to: Option<ReplyToken>, text: &str) {
        self.messages.push((reply_to, text.to_owned()));
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &SystemConfig) -> Self {
        let mut nvs = Self::new();
        let bytes = postcard::to_allocvec(config).expect("serialise config");
        nvs.write("heatcycle", "syscfg", &bytes).expect("write config");
        nvs
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{}::{}", namespace, key)) {
            Some(v) if v.len() > buf.len() => Err(StorageError::BufferTooSmall),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store.insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut buf = [0u8; 256];
        match self.read("heatcycle", "syscfg", &mut buf) {
            Ok(n) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&buf[..n]).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(StorageError::NotFound) => Ok(SystemConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Limits used by most scenarios: max 120, hot 102, cool 72, delta 1,
/// 1 h lubrication, 3 h watchdog.
#[allow(dead_code)]
pub fn scenario_config() -> SystemConfig {
    SystemConfig {
        max_temp_c: 120.0,
        hot_temp_c: 102.0,
        cool_temp_c: 72.0,
        control_delta_c: 1.0,
        lubrication_hours: 1.0,
        process_timeout_hours: 3.0,
        ..Default::default()
    }
}

/// A started service at `reading`, with the start-up event already drained.
#[allow(dead_code)]
pub fn started(config: SystemConfig, reading: f32) -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(config, OPERATOR);
    let mut hw = MockHardware::new(reading);
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    sink.clear();
    (app, hw, sink)
}
