//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (probe, relay, clock, chat transport, storage) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the domain core never touches hardware directly.
//!
//! None of the per-tick ports can fail from the core's point of view: the
//! sensor keeps its last good value, relay writes are fire-and-forget, and
//! notification delivery is best-effort.  Only startup configuration is
//! fallible.

use crate::config::SystemConfig;

use super::commands::{InboundMessage, ReplyToken};
use super::events::ProcessEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain polls this once per tick.
pub trait SensorPort {
    /// Obtain a first reading before the first tick.  May block for one
    /// conversion; called once, from startup only.
    fn prime(&mut self, now_ms: u64) {
        self.poll(now_ms);
    }

    /// Advance the sampling cadence.  Never blocks.
    fn poll(&mut self, now_ms: u64);

    /// Latest good reading in Celsius, or `-1e10` before the first sample.
    fn current_reading(&self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Heater relay output.  Callers only write on edges.
pub trait RelayPort {
    fn set(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.  Must never go backwards.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Message source (driving adapter: chat transport → domain)
// ───────────────────────────────────────────────────────────────

/// Inbound operator messages.  Drained to `None` once per tick.
pub trait MessageSource {
    fn next_message(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → notifier / log)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`ProcessEvent`]s through this port.
/// Adapters decide where they go (serial log, chat, both).
pub trait EventSink {
    fn emit(&mut self, event: &ProcessEvent);
}

/// Fan-out: deliver every event to both sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &ProcessEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Notification sink (driven adapter: notifier → chat transport)
// ───────────────────────────────────────────────────────────────

/// Final hop for rendered operator notifications.
///
/// `reply_to` is `None` for spontaneous notifications (start-up, safety
/// trips, phase completions) and `Some` when answering a command.
pub trait NotificationSink {
    fn deliver(&mut self, reply_to: Option<ReplyToken>, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`], not
/// silently clamped, so a bad record can never raise `max_temp_c` past the
/// hardware's limits.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for config records and credentials.
///
/// Keys are namespaced to prevent collisions between subsystems.  Writes
/// MUST be atomic; the ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Caller's buffer is smaller than the stored value.
    BufferTooSmall,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::BufferTooSmall => Self::Corrupted,
            StorageError::IoError => Self::IoError,
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(match e {
            ConfigError::NotFound => "config not found",
            ConfigError::Corrupted => "config corrupted",
            ConfigError::ValidationFailed(msg) => msg,
            ConfigError::StorageFull => "storage full",
            ConfigError::IoError => "storage I/O error",
        })
    }
}
