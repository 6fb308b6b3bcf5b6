//! HTTP transport seam for the Replicate API.
//!
//! [`ApiTransport`] abstracts the three request shapes the client needs
//! (JSON POST, JSON GET, multipart file upload) so that the job logic can
//! be exercised against a scripted transport in tests. [`HttpTransport`]
//! is the production implementation over [`reqwest`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::io::ReaderStream;

use crate::error::ReplicateError;

/// Request timeout for a single HTTP attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request.
const USER_AGENT: &str = concat!("littleme/", env!("CARGO_PKG_VERSION"));

/// Transport operations the Replicate client is built on.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// POST a JSON body, returning the parsed JSON response.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ReplicateError>;

    /// GET a JSON resource.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ReplicateError>;

    /// POST a local file as a multipart upload, returning the parsed JSON
    /// response. The caller has already verified the file exists.
    async fn upload_file(
        &self,
        path: &str,
        file: &Path,
    ) -> Result<serde_json::Value, ReplicateError>;
}

/// Production transport over a pooled [`reqwest::Client`].
///
/// The underlying connection pool is created once and lives for the
/// transport's lifetime; dropping the transport releases it.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport authenticated with the given API token.
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, ReplicateError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Token {api_token}"))
            .map_err(|e| ReplicateError::Transport(format!("invalid API token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ReplicateError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a reqwest send error to the client taxonomy.
    ///
    /// Everything that fails before a response arrives is a transport
    /// failure; body decode problems are invalid responses.
    fn map_send_error(e: reqwest::Error) -> ReplicateError {
        if e.is_decode() {
            ReplicateError::InvalidResponse(e.to_string())
        } else {
            ReplicateError::Transport(e.to_string())
        }
    }

    /// Check the status code, then parse the body as JSON.
    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, ReplicateError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(Self::map_send_error)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ReplicateError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ReplicateError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::read_json(response).await
    }

    async fn upload_file(
        &self,
        path: &str,
        file: &Path,
    ) -> Result<serde_json::Value, ReplicateError> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.zip".to_string());

        // Stream the archive off disk rather than buffering it; datasets
        // can run to hundreds of megabytes.
        let unreadable = |source: std::io::Error| ReplicateError::ArchiveUnreadable {
            path: file.to_path_buf(),
            source,
        };
        let handle = tokio::fs::File::open(file).await.map_err(unreadable)?;
        let length = handle.metadata().await.map_err(unreadable)?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));

        let part = reqwest::multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| ReplicateError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::read_json(response).await
    }
}
