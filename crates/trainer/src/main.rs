//! `littleme-train`: zip a dataset, run a LoRA training job on Replicate,
//! and persist the resulting model version id.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use littleme_replicate::{PollConfig, ReplicateClient};
use littleme_trainer::{run, RunConfig};

#[derive(Debug, Parser)]
#[command(name = "littleme-train", about = "Train a LoRA model from a photo dataset")]
struct Args {
    /// Directory of training images to archive and upload.
    #[arg(long)]
    dataset_dir: PathBuf,

    /// Where to write the zipped dataset.
    #[arg(long, default_value = "artifacts/dataset.zip")]
    archive_path: PathBuf,

    /// Owner of the trainer model on Replicate.
    #[arg(long, env = "REPLICATE_MODEL_OWNER", default_value = "black-forest-labs")]
    model_owner: String,

    /// Name of the trainer model on Replicate.
    #[arg(long, env = "REPLICATE_MODEL_NAME", default_value = "flux-lora-trainer")]
    model_name: String,

    /// Number of training steps.
    #[arg(long, default_value_t = 1200)]
    max_train_steps: u32,

    /// Training resolution.
    #[arg(long, default_value = "1024")]
    resolution: String,

    /// Where to write the resulting version id as JSON.
    #[arg(long, default_value = "config/lora_version.json")]
    output_json: PathBuf,

    /// Seconds between job status checks.
    #[arg(long, default_value_t = 30)]
    poll_interval_secs: u64,

    /// Abort if the job is still running after this many seconds.
    #[arg(long)]
    max_wait_secs: Option<u64>,
}

impl Args {
    fn into_run_config(self) -> RunConfig {
        RunConfig {
            dataset_dir: self.dataset_dir,
            archive_path: self.archive_path,
            model_owner: self.model_owner,
            model_name: self.model_name,
            max_train_steps: self.max_train_steps,
            resolution: self.resolution,
            output_json: self.output_json,
            poll: PollConfig {
                interval: Duration::from_secs(self.poll_interval_secs),
                max_wait: self.max_wait_secs.map(Duration::from_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "littleme_train=info,littleme_trainer=info,littleme_replicate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let api_token =
        std::env::var("REPLICATE_API_TOKEN").context("REPLICATE_API_TOKEN must be set")?;
    let client = ReplicateClient::new(&api_token).context("failed to build Replicate client")?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping wait");
            signal_cancel.cancel();
        }
    });

    let config = args.into_run_config();
    let version = run(&client, &config, &cancel)
        .await
        .context("training run failed")?;

    println!("{version}");
    Ok(())
}
