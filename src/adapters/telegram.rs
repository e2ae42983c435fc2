//! Telegram Bot API adapter.
//!
//! Runs on the network I/O thread, never on the tick loop.  Pulls operator
//! messages with `getUpdates` and pushes them into the inbox; drains the
//! outbox with `sendMessage`.
//!
//! ```text
//!  api.telegram.org ◀──HTTPS──▶ BotHttp ──▶ TelegramClient ──▶ INBOX
//!                                                  ▲
//!                                                  └──────────── OUTBOX
//! ```
//!
//! The HTTP layer sits behind [`BotHttp`] so the client (offset tracking,
//! payload building, response parsing) is tested on the host with a
//! scripted transport.  The ESP-IDF implementation uses `EspHttpConnection`
//! with the built-in certificate bundle.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::{ChatId, InboundMessage, RemoteCommand, ReplyToken};
use crate::app::inbox::{self, Inbox, Outbox, Outgoing};
use crate::error::CommsError;

/// Reply keyboard attached to every message: one button per command.
pub const KEYBOARD: &[&[&str]] = &[
    &["/status"],
    &["/start", "/stop"],
    &["/lubricate", "/cooldown"],
];

/// Upper bound on `getUpdates` round-trips per poll.
const MAX_BATCHES: u32 = 4;

/// Bot API ceiling for `getUpdates.limit`.
pub const MAX_UPDATES_PER_CALL: usize = 100;

/// Largest response body accepted from the Bot API.
pub const MAX_RESPONSE: usize = 8 * 1024;

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

/// One Bot API method call over HTTPS.
pub trait BotHttp {
    /// POST a JSON `body` to `method`, append the response body to
    /// `response`, and return the HTTP status.
    fn post(&mut self, method: &str, body: &[u8], response: &mut Vec<u8>) -> Result<u16, CommsError>;
}

/// `https://api.telegram.org/bot<token>/<method>`
pub fn api_url(token: &str, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{}", token, method)
}

// ───────────────────────────────────────────────────────────────
// Wire types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    limit: usize,
    timeout: u32,
    allowed_updates: &'static [&'static str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    reply_markup: ReplyMarkup,
}

#[derive(Serialize)]
struct ReplyMarkup {
    keyboard: &'static [&'static [&'static str]],
    resize_keyboard: bool,
}

/// Decode a `getUpdates` response body.
pub fn parse_updates(body: &[u8]) -> Result<Vec<Update>, CommsError> {
    let resp: ApiResponse<Vec<Update>> =
        serde_json::from_slice(body).map_err(|_| CommsError::MalformedResponse)?;
    if !resp.ok {
        warn!(
            "Telegram: getUpdates rejected: {}",
            resp.description.as_deref().unwrap_or("no description")
        );
        return Err(CommsError::Rejected);
    }
    Ok(resp.result.unwrap_or_default())
}

/// Decode a `getMe` response body into the bot's username.
fn parse_me(body: &[u8]) -> Result<Option<String>, CommsError> {
    let resp: ApiResponse<BotUser> =
        serde_json::from_slice(body).map_err(|_| CommsError::MalformedResponse)?;
    if !resp.ok {
        return Err(CommsError::Rejected);
    }
    Ok(resp.result.and_then(|me| me.username))
}

/// Check a `sendMessage` response body.
fn parse_ack(body: &[u8]) -> Result<(), CommsError> {
    let resp: ApiResponse<serde::de::IgnoredAny> =
        serde_json::from_slice(body).map_err(|_| CommsError::MalformedResponse)?;
    if resp.ok {
        Ok(())
    } else {
        warn!(
            "Telegram: sendMessage rejected: {}",
            resp.description.as_deref().unwrap_or("no description")
        );
        Err(CommsError::Rejected)
    }
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

pub struct TelegramClient<H> {
    http: H,
    /// Next `update_id` to request; everything below it is acknowledged.
    offset: i64,
    /// Our `@username`, once known; commands addressed to other bots are dropped.
    username: Option<String>,
    body: Vec<u8>,
    received: u32,
    sent: u32,
    failures: u32,
}

impl<H: BotHttp> TelegramClient<H> {
    pub fn new(http: H) -> Self {
        Self {
            http,
            offset: 0,
            username: None,
            body: Vec::new(),
            received: 0,
            sent: 0,
            failures: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Ask the Bot API for our own username (`getMe`).  Until this succeeds
    /// a command suffix naming any bot is accepted.
    pub fn identify(&mut self) -> Result<(), CommsError> {
        self.call("getMe", b"{}")?;
        self.username = parse_me(&self.body)?;
        if let Some(name) = &self.username {
            debug!("Telegram: running as @{}", name);
        }
        Ok(())
    }

    /// One `getUpdates` round-trip for at most `limit` updates.  Advances
    /// the offset past every update returned, text or not, so nothing is
    /// delivered twice; updates beyond `limit` stay queued server-side.
    pub fn fetch_updates(&mut self, limit: usize) -> Result<Vec<InboundMessage>, CommsError> {
        let req = GetUpdates {
            offset: self.offset,
            limit: limit.clamp(1, MAX_UPDATES_PER_CALL),
            timeout: 0,
            allowed_updates: &["message"],
        };
        let body = serde_json::to_vec(&req).map_err(|_| CommsError::MalformedResponse)?;
        self.call("getUpdates", &body)?;
        let updates = parse_updates(&self.body)?;

        let mut out = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset = self.offset.max(update.update_id.saturating_add(1));
            let Some(msg) = update.message else {
                continue;
            };
            let Some(text) = msg.text.as_deref() else {
                debug!("Telegram: skipping non-text message {}", msg.message_id);
                continue;
            };
            out.push(InboundMessage {
                sender: ChatId(msg.chat.id),
                reply_to: ReplyToken(msg.message_id),
                command: RemoteCommand::parse_addressed(text, self.username.as_deref()),
            });
        }
        self.received = self.received.wrapping_add(out.len() as u32);
        Ok(out)
    }

    /// Fetch until the backlog is empty and queue the operator's messages
    /// on `inbox`.  Returns the number queued.
    ///
    /// Messages from other chats are acknowledged and dropped here, so they
    /// never take an inbox slot.  Each round-trip asks for no more updates
    /// than the inbox has room for; when it is full the rest stay
    /// unacknowledged and arrive on a later poll.
    pub fn poll_into<const N: usize>(
        &mut self,
        operator: ChatId,
        inbox: &Inbox<N>,
    ) -> Result<usize, CommsError> {
        let mut queued = 0;
        for _ in 0..MAX_BATCHES {
            let free = N.saturating_sub(inbox.len());
            if free == 0 {
                debug!("Telegram: inbox full, leaving updates queued");
                break;
            }
            let batch = self.fetch_updates(free)?;
            if batch.is_empty() {
                break;
            }
            for msg in batch {
                if msg.sender != operator {
                    debug!("Telegram: dropping message from chat {}", msg.sender.0);
                    continue;
                }
                if inbox::post(inbox, msg) {
                    queued += 1;
                }
            }
        }
        Ok(queued)
    }

    /// `sendMessage` with the command keyboard, threaded as a reply when
    /// `reply_to` is set.
    pub fn send(&mut self, chat: ChatId, reply_to: Option<ReplyToken>, text: &str) -> Result<(), CommsError> {
        let req = SendMessage {
            chat_id: chat.0,
            text,
            reply_to_message_id: reply_to.map(|r| r.0),
            reply_markup: ReplyMarkup {
                keyboard: KEYBOARD,
                resize_keyboard: true,
            },
        };
        let body = serde_json::to_vec(&req).map_err(|_| CommsError::MalformedResponse)?;
        self.call("sendMessage", &body)?;
        parse_ack(&self.body)?;
        self.sent = self.sent.wrapping_add(1);
        Ok(())
    }

    /// Deliver everything waiting in `outbox` to `chat`.  Delivery is
    /// best-effort: a failed send is logged and dropped.
    pub fn flush<const N: usize>(&mut self, chat: ChatId, outbox: &Outbox<N>) -> usize {
        let mut delivered = 0;
        while let Ok(Outgoing { reply_to, text }) = outbox.try_receive() {
            match self.send(chat, reply_to, &text) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Telegram: dropping notification: {}", e),
            }
        }
        delivered
    }

    fn call(&mut self, method: &str, body: &[u8]) -> Result<(), CommsError> {
        self.body.clear();
        let status = match self.http.post(method, body, &mut self.body) {
            Ok(status) => status,
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                return Err(e);
            }
        };
        if !(200..300).contains(&status) {
            self.failures = self.failures.wrapping_add(1);
            warn!("Telegram: {} answered HTTP {}", method, status);
            return Err(CommsError::HttpStatus(status));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF transport
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspBotHttp;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use embedded_svc::http::Method;
    use embedded_svc::http::client::Client as HttpClient;
    use embedded_svc::io::{Read, Write};
    use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
    use log::warn;

    use super::{BotHttp, MAX_RESPONSE, api_url};
    use crate::error::CommsError;

    const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

    /// HTTPS to api.telegram.org through the IDF client and cert bundle.
    pub struct EspBotHttp {
        token: String,
    }

    impl EspBotHttp {
        pub fn new(token: &str) -> Self {
            Self {
                token: token.to_owned(),
            }
        }

        fn request(&self, method: &str, body: &[u8], response: &mut Vec<u8>) -> anyhow::Result<u16> {
            let conf = HttpClientConfiguration {
                timeout: Some(HTTP_TIMEOUT),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            };
            let mut client = HttpClient::wrap(EspHttpConnection::new(&conf)?);
            let url = api_url(&self.token, method);
            let len = body.len().to_string();
            let headers = [("content-type", "application/json"), ("content-length", len.as_str())];

            let mut request = client.request(Method::Post, &url, &headers)?;
            request.write_all(body)?;
            request.flush()?;
            let mut resp = request.submit()?;
            let status = resp.status();

            let mut chunk = [0u8; 512];
            loop {
                let n = resp.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                if response.len() + n > MAX_RESPONSE {
                    anyhow::bail!("response larger than {} bytes", MAX_RESPONSE);
                }
                response.extend_from_slice(&chunk[..n]);
            }
            Ok(status)
        }
    }

    impl BotHttp for EspBotHttp {
        fn post(&mut self, method: &str, body: &[u8], response: &mut Vec<u8>) -> Result<u16, CommsError> {
            self.request(method, body, response).map_err(|e| {
                warn!("Telegram(espidf): {} failed: {:#}", method, e);
                CommsError::Transport
            })
        }
    }
}
