//! Inbound commands to the application service.
//!
//! Operator text arrives from the chat transport and is parsed once, at the
//! boundary, into the closed [`RemoteCommand`] enum.  The core never sees
//! raw strings.

use core::fmt;

/// Telegram chat identifier of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Opaque handle used to thread a notification as a reply to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyToken(pub i64);

/// Commands that drive the process state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCommand {
    Status,
    Start,
    Stop,
    Lubricate,
    Cooldown,
}

/// Everything an operator can type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Process(ProcessCommand),
    /// Drop stored WiFi credentials and restart.  Never reaches the FSM.
    Reconfigure,
}

impl RemoteCommand {
    /// Parse a chat message from a sender that does not know our bot name.
    /// Any `@BotName` suffix is accepted; see [`Self::parse_addressed`].
    pub fn parse(text: &str) -> Option<Self> {
        Self::parse_addressed(text, None)
    }

    /// Parse a chat message addressed to bot `own_name`.
    ///
    /// Leading/trailing whitespace is ignored, as is anything after the
    /// first whitespace-separated word.  Group chats append `@BotName` to the
    /// command word: when `own_name` is known, a suffix naming a different
    /// bot (compared ASCII case-insensitively) yields `None`.  Returns `None`
    /// for text that is not one of the known commands.
    pub fn parse_addressed(text: &str, own_name: Option<&str>) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = match word.split_once('@') {
            Some((cmd, bot)) => {
                if own_name.is_some_and(|own| !own.eq_ignore_ascii_case(bot)) {
                    return None;
                }
                cmd
            }
            None => word,
        };
        let cmd = match word {
            "/status" => Self::Process(ProcessCommand::Status),
            "/start" => Self::Process(ProcessCommand::Start),
            "/stop" => Self::Process(ProcessCommand::Stop),
            "/lubricate" => Self::Process(ProcessCommand::Lubricate),
            "/cooldown" => Self::Process(ProcessCommand::Cooldown),
            "/reconfigure" => Self::Reconfigure,
            _ => return None,
        };
        Some(cmd)
    }

    /// Canonical command text, as shown on the reply keyboard.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Process(ProcessCommand::Status) => "/status",
            Self::Process(ProcessCommand::Start) => "/start",
            Self::Process(ProcessCommand::Stop) => "/stop",
            Self::Process(ProcessCommand::Lubricate) => "/lubricate",
            Self::Process(ProcessCommand::Cooldown) => "/cooldown",
            Self::Reconfigure => "/reconfigure",
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message pulled from the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: ChatId,
    pub reply_to: ReplyToken,
    /// `None` when the text was not a recognised command.
    pub command: Option<RemoteCommand>,
}

impl InboundMessage {
    /// Build a message by parsing `text`.
    pub fn from_text(sender: ChatId, reply_to: ReplyToken, text: &str) -> Self {
        Self {
            sender,
            reply_to,
            command: RemoteCommand::parse(text),
        }
    }
}
