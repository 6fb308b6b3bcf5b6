use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use littleme_bot::state::AppState;
use littleme_core::config::BotConfig;
use littleme_replicate::ReplicateClient;
use littleme_slack::{Generator, JobLimiter, SlackClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "littleme_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };
    tracing::info!(
        port = config.port,
        max_concurrent = config.max_concurrent_generations,
        "Loaded bot configuration",
    );

    // --- Clients ---
    let replicate = Arc::new(
        ReplicateClient::new(&config.replicate_api_token)
            .expect("Failed to build Replicate client"),
    );
    let slack = Arc::new(
        SlackClient::new(&config.slack_bot_token).expect("Failed to build Slack client"),
    );

    let bot_user_id = match slack.auth_test().await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::error!(error = %e, "Slack auth.test failed; check SLACK_BOT_TOKEN");
            std::process::exit(1);
        }
    };
    tracing::info!(bot_user_id = %bot_user_id, "Authenticated with Slack");

    // --- State ---
    let cancel = CancellationToken::new();
    let state = AppState {
        generator: Generator::new(replicate, Arc::clone(&slack), config.lora_version.clone()),
        limiter: JobLimiter::new(config.max_concurrent_generations),
        slack,
        bot_user_id: bot_user_id.into(),
        cancel: cancel.clone(),
    };

    // --- Router ---
    let app = littleme_bot::build_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    // --- Serve ---
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(%addr, "Bot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, cancelling in-flight jobs");
            cancel.cancel();
        })
        .await
        .expect("Server error");
}
