//! HTTP service receiving Slack events and slash commands.

pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;

use state::AppState;

/// Build the bot's route tree.
///
/// ```text
/// POST /slack/events      Events API envelope (JSON)
/// POST /slack/commands    slash command (form-encoded)
/// GET  /healthz           liveness probe
/// ```
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/slack/events", post(routes::slack_events))
        .route("/slack/commands", post(routes::slack_commands))
        .with_state(state)
}
