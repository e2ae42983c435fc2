//! Channels between the network I/O thread and the tick loop.
//!
//! Uses `embassy-sync` bounded MPMC channels.  The tick loop never blocks
//! on them: it drains the inbox with `try_receive` and posts to the outbox
//! with `try_send`, dropping (and logging) when the I/O side falls behind.
//!
//! ```text
//! ┌──────────────┐ InboundMessage ┌──────────────┐
//! │   I/O Thread │───────────────▶│  Tick Loop    │
//! │  (Bot API)   │◀───────────────│  (AppService) │
//! └──────────────┘    Outgoing    └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::commands::{InboundMessage, ReplyToken};
use super::notifier::Text;
use super::ports::{MessageSource, NotificationSink};

/// Rendered notification on its way to the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub reply_to: Option<ReplyToken>,
    pub text: Text,
}

/// Channel depth for inbound operator messages.
pub const INBOX_DEPTH: usize = 8;

/// Channel depth for outbound notifications.
pub const OUTBOX_DEPTH: usize = 16;

pub type Inbox<const N: usize> = Channel<CriticalSectionRawMutex, InboundMessage, N>;
pub type Outbox<const N: usize> = Channel<CriticalSectionRawMutex, Outgoing, N>;

/// Inbound message channel: I/O thread → tick loop.
pub static INBOX: Inbox<INBOX_DEPTH> = Channel::new();

/// Outbound notification channel: tick loop → I/O thread.
pub static OUTBOX: Outbox<OUTBOX_DEPTH> = Channel::new();

/// Queue an inbound message.  Returns `false` (and logs) if full.
pub fn post<const N: usize>(inbox: &Inbox<N>, msg: InboundMessage) -> bool {
    if inbox.try_send(msg).is_err() {
        warn!("Inbox full, dropping message from chat {}", msg.sender.0);
        return false;
    }
    true
}

// ───────────────────────────────────────────────────────────────
// Port adapters over the channels
// ───────────────────────────────────────────────────────────────

/// [`MessageSource`] draining an inbox without blocking.
pub struct ChannelSource<'a, const N: usize> {
    inbox: &'a Inbox<N>,
}

impl<'a, const N: usize> ChannelSource<'a, N> {
    pub fn new(inbox: &'a Inbox<N>) -> Self {
        Self { inbox }
    }
}

impl<const N: usize> MessageSource for ChannelSource<'_, N> {
    fn next_message(&mut self) -> Option<InboundMessage> {
        self.inbox.try_receive().ok()
    }
}

/// [`NotificationSink`] posting to an outbox.  Best-effort: a full outbox
/// drops the notification.
pub struct OutboxSink<'a, const N: usize> {
    outbox: &'a Outbox<N>,
    dropped: u32,
}

impl<'a, const N: usize> OutboxSink<'a, N> {
    pub fn new(outbox: &'a Outbox<N>) -> Self {
        Self { outbox, dropped: 0 }
    }

    /// Notifications lost to a full outbox.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> NotificationSink for OutboxSink<'_, N> {
    fn deliver(&mut self, reply_to: Option<ReplyToken>, text: &str) {
        let mut buf = Text::new();
        if buf.push_str(text).is_err() {
            warn!("Outbox: notification longer than {} bytes", buf.capacity());
        }
        if self.outbox.try_send(Outgoing { reply_to, text: buf }).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("Outbox full, dropping notification ({} dropped)", self.dropped);
        }
    }
}
