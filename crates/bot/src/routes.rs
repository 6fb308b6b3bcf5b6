//! Handlers for the Slack event and command endpoints.
//!
//! Slack expects a 2xx acknowledgement within a few seconds, so handlers
//! never wait on generation: the prompt is handed to the bounded
//! [`JobLimiter`](littleme_slack::JobLimiter) and the HTTP response
//! returns immediately. A core failure is always converted into an
//! in-channel reply, never an HTTP error back to Slack.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;

use littleme_slack::events::{strip_mention, EventEnvelope, InboundEvent, MessageEvent, SlashCommand};
use littleme_slack::Busy;

use crate::state::AppState;

/// Reply sent when the prompt is empty.
const PROMPT_HINT: &str = "Share a creative prompt and I'll generate a childhood photo!";

/// Reply sent when all generation slots are busy.
const BUSY_NOTICE: &str =
    "I'm already generating as many photos as I can. Please try again in a minute.";

// ---------------------------------------------------------------------------
// GET /healthz
// ---------------------------------------------------------------------------

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// POST /slack/events
// ---------------------------------------------------------------------------

/// Events API entry point: answers the `url_verification` handshake and
/// dispatches subscribed events. Payloads the bot does not understand are
/// acknowledged and dropped; returning an error would only make Slack
/// redeliver them.
pub async fn slack_events(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    match serde_json::from_value::<EventEnvelope>(payload) {
        Ok(EventEnvelope::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(EventEnvelope::EventCallback { event }) => {
            dispatch_event(&state, event);
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unrecognized event payload");
            StatusCode::OK.into_response()
        }
    }
}

/// Route one workspace event to the generation queue.
///
/// A mentioned message in a channel arrives as both `app_mention` and
/// `message`; only the mention path handles it. The `message` path exists
/// for direct messages, which never produce an `app_mention`.
fn dispatch_event(state: &AppState, event: InboundEvent) {
    match event {
        InboundEvent::AppMention(msg) => {
            if msg.is_from_bot_or_system() {
                return;
            }
            queue_from_message(state, &msg);
        }
        InboundEvent::Message(msg) => {
            if msg.is_from_bot_or_system() || !msg.channel.starts_with('D') {
                return;
            }
            queue_from_message(state, &msg);
        }
    }
}

fn queue_from_message(state: &AppState, msg: &MessageEvent) {
    let text = msg.text.as_deref().unwrap_or_default();
    let prompt = strip_mention(text, &state.bot_user_id);
    let thread_ts = Some(msg.thread_ts.clone().unwrap_or_else(|| msg.ts.clone()));

    if prompt.is_empty() {
        post_async(state, msg.channel.clone(), thread_ts, PROMPT_HINT.into());
        return;
    }

    match spawn_generation(state, msg.channel.clone(), thread_ts.clone(), prompt.clone()) {
        Ok(()) => post_async(
            state,
            msg.channel.clone(),
            thread_ts,
            format!("Working on: *{prompt}*"),
        ),
        Err(Busy) => post_async(state, msg.channel.clone(), thread_ts, BUSY_NOTICE.into()),
    }
}

// ---------------------------------------------------------------------------
// POST /slack/commands
// ---------------------------------------------------------------------------

/// Slash-command entry point. The acknowledgement is the HTTP response
/// body itself; the generated image arrives later as a channel post.
pub async fn slack_commands(
    State(state): State<AppState>,
    Form(cmd): Form<SlashCommand>,
) -> impl IntoResponse {
    let prompt = cmd.text.trim().to_string();
    if prompt.is_empty() {
        return Json(json!({
            "response_type": "ephemeral",
            "text": format!(
                "Please provide a prompt, e.g. `{} Your 6-year-old self at a science fair`.",
                cmd.command
            ),
        }));
    }

    match spawn_generation(&state, cmd.channel_id.clone(), None, prompt.clone()) {
        Ok(()) => Json(json!({
            "response_type": "in_channel",
            "text": format!("Got it! Creating: *{prompt}*"),
        })),
        Err(Busy) => Json(json!({
            "response_type": "ephemeral",
            "text": BUSY_NOTICE,
        })),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hand a prompt to the limiter. The spawned task owns its whole
/// lifecycle including error reporting; see
/// [`Generator::generate_and_reply`](littleme_slack::Generator::generate_and_reply).
fn spawn_generation(
    state: &AppState,
    channel: String,
    thread_ts: Option<String>,
    prompt: String,
) -> Result<(), Busy> {
    let generator = state.generator.clone();
    let cancel = state.cancel.clone();
    let label = format!("generate:{channel}");

    state.limiter.try_spawn(&label, async move {
        generator
            .generate_and_reply(&channel, thread_ts.as_deref(), &prompt, &cancel)
            .await;
    })
}

/// Post a short acknowledgement without blocking the HTTP response.
fn post_async(state: &AppState, channel: String, thread_ts: Option<String>, text: String) {
    let slack = state.slack.clone();
    tokio::spawn(async move {
        if let Err(e) = slack
            .post_message(&channel, thread_ts.as_deref(), &text, None)
            .await
        {
            tracing::error!(channel = %channel, error = %e, "Failed to post acknowledgement");
        }
    });
}
