//! End-to-end training flow against a scripted transport: archive a
//! dataset, upload it, submit the job, poll to completion, and persist
//! the version file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use littleme_core::version_file;
use littleme_replicate::{ApiTransport, PollConfig, ReplicateClient, ReplicateError};
use littleme_trainer::{run, RunConfig, TrainError};

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    posts: Mutex<VecDeque<Result<serde_json::Value, ReplicateError>>>,
    gets: Mutex<VecDeque<Result<serde_json::Value, ReplicateError>>>,
    uploads: Mutex<VecDeque<Result<serde_json::Value, ReplicateError>>>,
    post_calls: AtomicU32,
    get_calls: AtomicU32,
    upload_calls: AtomicU32,
    last_post_body: Mutex<Option<serde_json::Value>>,
    last_upload_path: Mutex<Option<PathBuf>>,
}

#[derive(Default, Clone)]
struct MockTransport(Arc<Inner>);

impl MockTransport {
    fn script_post(&self, response: Result<serde_json::Value, ReplicateError>) {
        self.0.posts.lock().unwrap().push_back(response);
    }

    fn script_get(&self, response: Result<serde_json::Value, ReplicateError>) {
        self.0.gets.lock().unwrap().push_back(response);
    }

    fn script_upload(&self, response: Result<serde_json::Value, ReplicateError>) {
        self.0.uploads.lock().unwrap().push_back(response);
    }

    fn get_calls(&self) -> u32 {
        self.0.get_calls.load(Ordering::SeqCst)
    }

    fn upload_calls(&self) -> u32 {
        self.0.upload_calls.load(Ordering::SeqCst)
    }

    fn last_post_body(&self) -> Option<serde_json::Value> {
        self.0.last_post_body.lock().unwrap().clone()
    }

    fn last_upload_path(&self) -> Option<PathBuf> {
        self.0.last_upload_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn post_json(
        &self,
        _path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ReplicateError> {
        self.0.post_calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_post_body.lock().unwrap() = Some(body.clone());
        self.0
            .posts
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted POST")
    }

    async fn get_json(&self, _path: &str) -> Result<serde_json::Value, ReplicateError> {
        self.0.get_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .gets
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted GET")
    }

    async fn upload_file(
        &self,
        _path: &str,
        file: &Path,
    ) -> Result<serde_json::Value, ReplicateError> {
        self.0.upload_calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_upload_path.lock().unwrap() = Some(file.to_path_buf());
        self.0
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted upload")
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn make_dataset(root: &Path) -> PathBuf {
    let dataset = root.join("dataset");
    std::fs::create_dir(&dataset).unwrap();
    std::fs::write(dataset.join("a.jpg"), b"first").unwrap();
    std::fs::write(dataset.join("b.jpg"), b"second").unwrap();
    dataset
}

fn config_for(root: &Path, dataset: PathBuf) -> RunConfig {
    RunConfig {
        dataset_dir: dataset,
        archive_path: root.join("artifacts/dataset.zip"),
        model_owner: "black-forest-labs".to_string(),
        model_name: "flux-lora-trainer".to_string(),
        max_train_steps: 1200,
        resolution: "1024".to_string(),
        output_json: root.join("config/lora_version.json"),
        poll: PollConfig {
            interval: Duration::from_millis(5),
            max_wait: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_persists_the_trained_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), make_dataset(dir.path()));

    let transport = MockTransport::default();
    transport.script_upload(Ok(serde_json::json!({
        "upload_url": "https://files.example/dataset.zip",
    })));
    transport.script_post(Ok(serde_json::json!({ "id": "t1", "status": "starting" })));
    transport.script_get(Ok(serde_json::json!({ "id": "t1", "status": "processing" })));
    transport.script_get(Ok(serde_json::json!({
        "id": "t1",
        "status": "succeeded",
        "output": { "version": "v123" },
    })));

    let client = ReplicateClient::with_transport(transport.clone());
    let version = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(version, "v123");
    assert_eq!(transport.get_calls(), 2);
    assert_eq!(transport.upload_calls(), 1);

    // The archive that went up is the one we wrote.
    assert_eq!(transport.last_upload_path().unwrap(), config.archive_path);
    assert!(config.archive_path.exists());

    // Persisted exactly as the bot expects to read it back.
    let raw = std::fs::read_to_string(&config.output_json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({ "lora_version": "v123" }));
    assert_eq!(
        version_file::read(&config.output_json).unwrap().lora_version,
        "v123"
    );
}

#[tokio::test]
async fn training_payload_names_the_model_and_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), make_dataset(dir.path()));

    let transport = MockTransport::default();
    transport.script_upload(Ok(serde_json::json!({
        "upload_url": "https://files.example/dataset.zip",
    })));
    transport.script_post(Ok(serde_json::json!({
        "id": "t1",
        "status": "succeeded",
        "output": { "version": "v1" },
    })));

    let client = ReplicateClient::with_transport(transport.clone());
    run(&client, &config, &CancellationToken::new())
        .await
        .unwrap();

    let body = transport.last_post_body().unwrap();
    assert_eq!(body["model"], "black-forest-labs/flux-lora-trainer");
    assert_eq!(body["input"]["input_images"], "https://files.example/dataset.zip");
    assert_eq!(body["input"]["max_train_steps"], 1200);
    assert_eq!(body["input"]["resolution"], "1024");
    assert!(!body["input"].as_object().unwrap().contains_key("seed"));
}

#[tokio::test]
async fn failed_training_reports_the_remote_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), make_dataset(dir.path()));

    let transport = MockTransport::default();
    transport.script_upload(Ok(serde_json::json!({
        "upload_url": "https://files.example/dataset.zip",
    })));
    transport.script_post(Ok(serde_json::json!({ "id": "t1", "status": "starting" })));
    transport.script_get(Ok(serde_json::json!({
        "id": "t1",
        "status": "failed",
        "error": "out of memory",
    })));

    let client = ReplicateClient::with_transport(transport);
    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, TrainError::Failed { ref message, .. } if message == "out of memory");
    assert!(!config.output_json.exists());
}

#[tokio::test]
async fn succeeded_training_without_a_version_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), make_dataset(dir.path()));

    let transport = MockTransport::default();
    transport.script_upload(Ok(serde_json::json!({
        "upload_url": "https://files.example/dataset.zip",
    })));
    transport.script_post(Ok(serde_json::json!({
        "id": "t1",
        "status": "succeeded",
        "output": {},
    })));

    let client = ReplicateClient::with_transport(transport);
    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, TrainError::MissingVersion(ref id) if id == "t1");
    assert!(!config.output_json.exists());
}

#[tokio::test]
async fn missing_dataset_fails_before_any_network_call() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), dir.path().join("no-such-dataset"));

    let transport = MockTransport::default();
    let client = ReplicateClient::with_transport(transport.clone());
    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_matches!(err, TrainError::Core(_));
    assert_eq!(transport.upload_calls(), 0);
}
