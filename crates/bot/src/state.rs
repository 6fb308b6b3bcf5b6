use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use littleme_slack::{Generator, JobLimiter, SlackClient};

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable; inner data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Prompt-to-image pipeline.
    pub generator: Generator,
    /// Bounded concurrency for generation tasks.
    pub limiter: JobLimiter,
    /// Reply sink for acknowledgements and busy notices.
    pub slack: Arc<SlackClient>,
    /// The bot's own user id, stripped from inbound mention text.
    pub bot_user_id: Arc<str>,
    /// Cancelled on shutdown so in-flight polls abort promptly.
    pub cancel: CancellationToken,
}
