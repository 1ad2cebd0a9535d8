//! HTTP client for the model-management API
//!
//! Covers the three endpoints the tooling needs: list local models
//! (`GET /api/tags`), show one model (`POST /api/show`) and pull a model
//! with streamed progress (`POST /api/pull`).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::errors::{ClientError, Result};
use crate::models::classify::classify_failure;
use crate::models::pull::PullStream;
use crate::models::types::{ModelInfo, ModelRequest, ModelsResponse, ShowResponse};

/// Default Ollama host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Ollama port
pub const DEFAULT_PORT: u16 = 11434;

/// Idle pooled connections are closed after this long
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// TCP keep-alive interval
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Timeout for the availability probe only
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection target of a model client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    host: String,
    port: u16,
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL, e.g. `http://127.0.0.1:11434`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Remote model-management operations
#[async_trait]
pub trait ModelApi: Send + Sync {
    /// Models available on the server, in server order
    async fn list_local_models(&self) -> Result<Vec<ModelInfo>>;

    /// Details, modelfile, parameters and template of one model
    async fn model_info(&self, name: &str) -> Result<ModelInfo>;

    /// Start pulling a model; progress arrives through the returned stream
    fn pull(&self, name: &str) -> PullStream;
}

/// HTTP client for the model-management API
///
/// Cheap to clone; clones share one connection pool. No request timeout is
/// applied: wrap calls in `tokio::time::timeout` when a deadline is needed.
#[derive(Clone)]
pub struct OllamaModelClient {
    client: Client,
    options: ClientOptions,
    base_url: String,
}

impl OllamaModelClient {
    /// Create a new client for the given target
    pub fn new(options: ClientOptions) -> Result<Self> {
        if options.host.trim().is_empty() {
            return Err(ClientError::ConfigError("host must not be empty".to_string()));
        }

        let client = Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = options.base_url();
        Ok(Self {
            client,
            options,
            base_url,
        })
    }

    /// Connection target this client was built with
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List all local models
    ///
    /// Calls GET /api/tags. Order is preserved as returned by the server.
    pub async fn list_local_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, None).await?;
        let models: ModelsResponse = decode_json(response).await?;

        tracing::debug!("Server reported {} local models", models.models.len());
        Ok(models.models)
    }

    /// Get detailed information about a specific model
    ///
    /// Calls POST /api/show. The returned `ModelInfo` carries `name` as
    /// requested, since the endpoint does not echo it.
    pub async fn model_info(&self, name: &str) -> Result<ModelInfo> {
        validate_name(name)?;

        let url = format!("{}/api/show", self.base_url);
        tracing::debug!("POST {} ({})", url, name);

        let response = self
            .client
            .post(&url)
            .json(&ModelRequest { name, stream: None })
            .send()
            .await?;
        let response = check_status(response, Some(name)).await?;

        let show: ShowResponse = decode_json(response).await?;
        Ok(show.into_model_info(name))
    }

    /// Pull (download) a model
    ///
    /// Calls POST /api/pull when the returned stream is first polled. A
    /// failing initial response yields a single error and no progress lines.
    pub fn pull(&self, name: &str) -> PullStream {
        if let Err(e) = validate_name(name) {
            return PullStream::failed(name, e);
        }

        let url = format!("{}/api/pull", self.base_url);
        let request = self.client.post(&url).json(&ModelRequest {
            name,
            stream: Some(true),
        });
        let model = name.to_string();

        let connect = async move {
            tracing::debug!("POST {} ({})", url, model);
            let response = request.send().await?;
            let response = check_status(response, Some(&model)).await?;
            let status = response.status().as_u16();
            let body = response.bytes_stream().map_err(ClientError::from).boxed();
            Ok::<_, ClientError>((status, body))
        }
        .boxed();

        PullStream::new(name, connect)
    }

    /// Check if the server is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ModelApi for OllamaModelClient {
    async fn list_local_models(&self) -> Result<Vec<ModelInfo>> {
        OllamaModelClient::list_local_models(self).await
    }

    async fn model_info(&self, name: &str) -> Result<ModelInfo> {
        OllamaModelClient::model_info(self, name).await
    }

    fn pull(&self, name: &str) -> PullStream {
        OllamaModelClient::pull(self, name)
    }
}

impl fmt::Debug for OllamaModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModelClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ClientError::InvalidInput(
            "Model name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Pass successful responses through; classify everything else
pub(crate) async fn check_status(response: Response, model: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.map_err(|e| {
        tracing::warn!("Failed to read error body (HTTP {}): {}", status.as_u16(), e);
        ClientError::TransportFailed(format!(
            "HTTP {} with unreadable body: {}",
            status.as_u16(),
            e
        ))
    })?;
    Err(classify_failure(status.as_u16(), &body, model))
}

/// Read the whole body and decode it as `T`
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(&e, &bytes))
}
