//! Reply sink: posting messages back into Slack.
//!
//! Thin wrapper over the Slack Web API (`chat.postMessage`, `auth.test`)
//! using [`reqwest`]. Slack reports failures inside a 200 response via
//! the `ok`/`error` fields, so both transport and in-band errors are
//! normalized into [`SlackError`].

use std::time::Duration;

use serde::Deserialize;

/// Base URL of the Slack Web API.
const SLACK_API_URL: &str = "https://slack.com/api";

/// Request timeout for a single Web API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the Slack Web API layer.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Slack responded but rejected the call (`ok: false` or non-2xx).
    #[error("Slack API error: {0}")]
    Api(String),
}

/// Minimal Web API response envelope: `ok` plus an error code on failure.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// An image attached to a reply post.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub image_url: String,
    pub title: String,
}

/// Client for posting replies into Slack channels and threads.
pub struct SlackClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl SlackClient {
    /// Build a client authenticated with the given bot token.
    pub fn new(bot_token: &str) -> Result<Self, SlackError> {
        Self::with_base_url(SLACK_API_URL, bot_token)
    }

    /// Build a client against an alternate API base URL.
    pub fn with_base_url(base_url: &str, bot_token: &str) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SlackError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    /// Post a message, optionally into a thread and with an image
    /// attachment.
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        attachment: Option<&ImageAttachment>,
    ) -> Result<(), SlackError> {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = serde_json::Value::String(ts.to_string());
        }
        if let Some(att) = attachment {
            payload["attachments"] = serde_json::json!([{
                "fallback": att.title,
                "image_url": att.image_url,
                "title": att.title,
            }]);
        }

        self.call("chat.postMessage", &payload).await?;
        Ok(())
    }

    /// Resolve the bot's own user id, used to strip self-mentions from
    /// inbound text. Called once at startup.
    pub async fn auth_test(&self) -> Result<String, SlackError> {
        let response = self.call("auth.test", &serde_json::json!({})).await?;
        response
            .user_id
            .ok_or_else(|| SlackError::Api("auth.test response missing user_id".into()))
    }

    /// Issue one Web API call and normalize its outcome.
    async fn call(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<ApiResponse, SlackError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Api(format!("{method} returned HTTP {status}")));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        if !parsed.ok {
            let code = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(SlackError::Api(format!("{method} failed: {code}")));
        }
        Ok(parsed)
    }
}
