//! Inbound Slack payload types.
//!
//! Covers the two delivery shapes the bot receives: the Events API JSON
//! envelope (`url_verification` handshake plus `event_callback` wrapping
//! mention/message events) and the form-encoded slash-command payload.

use serde::Deserialize;

/// Top-level Events API envelope posted to `/slack/events`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// One-time endpoint handshake; the bot echoes `challenge` back.
    UrlVerification { challenge: String },
    /// A subscribed workspace event.
    EventCallback { event: InboundEvent },
}

/// Workspace events the bot subscribes to.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    AppMention(MessageEvent),
    Message(MessageEvent),
}

/// Common shape of mention and channel-message events.
#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub text: Option<String>,
    pub channel: String,
    /// Message timestamp; used as the thread root when replying.
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Present on messages authored by bots (including this one).
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Present on non-user messages (edits, joins, etc.).
    #[serde(default)]
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Whether this event should be ignored to avoid reply loops:
    /// bot-authored or subtyped messages are never prompts.
    pub fn is_from_bot_or_system(&self) -> bool {
        self.bot_id.is_some() || self.subtype.is_some()
    }
}

/// Form-encoded slash-command payload posted to `/slack/commands`.
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub channel_id: String,
}

/// Remove the bot's own `<@USERID>` mention from message text, leaving
/// the prompt.
pub fn strip_mention(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), "")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
