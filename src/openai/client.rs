//! HTTP client for OpenAI-compatible completion endpoints
//!
//! Endpoints are resolved relative to a base URL such as
//! `https://api.openai.com/v1`. When a token is configured it is sent both
//! as `Authorization: Bearer <token>` and as `api-key: <token>` (Azure).

use std::fmt;

use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ClientError, Result};
use crate::models::client::{check_status, decode_json};
use crate::openai::mode::{ResponseMode, StreamFlag};
use crate::openai::stream::{ApiEvent, CompletionStream};
use crate::openai::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
};

/// Default OpenAI API endpoint
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Azure-style key header
const API_KEY_HEADER: &str = "api-key";

/// OpenAI-compatible completion client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl OpenAiClient {
    /// Create a client for `base_url`, authenticating with `token` if given
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::ConfigError(
                "OpenAI base URL is required".to_string(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when requests carry credentials
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Text completion
    pub async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.call("completions", request, |r| r.model.clone()).await
    }

    /// Chat completion
    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.call("chat/completions", request, |r| r.model.clone()).await
    }

    /// Streamed text completion
    pub async fn streaming_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream<CompletionResponse>> {
        self.stream("completions", request, |r| r.model.clone()).await
    }

    /// Streamed chat completion
    pub async fn streaming_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream<ChatCompletionResponse>> {
        self.stream("chat/completions", request, |r| r.model.clone()).await
    }

    async fn call<Req, Resp>(
        &self,
        path: &str,
        request: Req,
        model: impl Fn(&Req) -> String,
    ) -> Result<Resp>
    where
        Req: StreamFlag + Serialize,
        Resp: DeserializeOwned,
    {
        let model = model(&request);
        let request = ResponseMode::Batch.apply(request);

        let response = self.post(path, &request, ResponseMode::Batch).send().await?;
        let response = check_status(response, Some(&model)).await?;
        let status = response.status().as_u16();

        let event: ApiEvent<Resp> = decode_json(response).await?;
        event.into_result(status, &model)
    }

    async fn stream<Req, Resp>(
        &self,
        path: &str,
        request: Req,
        model: impl Fn(&Req) -> String,
    ) -> Result<CompletionStream<Resp>>
    where
        Req: StreamFlag + Serialize,
        Resp: DeserializeOwned,
    {
        let model = model(&request);
        let request = ResponseMode::Streaming.apply(request);

        let response = self
            .post(path, &request, ResponseMode::Streaming)
            .send()
            .await?;
        let response = check_status(response, Some(&model)).await?;
        let status = response.status().as_u16();

        let body = response.bytes_stream().map_err(ClientError::from).boxed();
        Ok(CompletionStream::new(body, status, model))
    }

    fn post<B: Serialize>(&self, path: &str, body: &B, mode: ResponseMode) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("POST {} ({:?})", url, mode);

        let mut builder = self
            .client
            .post(url)
            .header(ACCEPT, mode.accept())
            .json(body);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token).header(API_KEY_HEADER, token);
        }
        builder
    }
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new("http://localhost:8000/v1/", Some("sk-test".to_string()))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/v1");
        assert!(client.has_token());
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let client = OpenAiClient::new(DEFAULT_OPENAI_URL, Some(String::new())).unwrap();
        assert!(!client.has_token());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = OpenAiClient::new("", None);
        match result {
            Err(e) => assert!(e.to_string().contains("base URL is required")),
            Ok(_) => panic!("Expected error for empty base URL"),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = OpenAiClient::new(DEFAULT_OPENAI_URL, Some("sk-secret".to_string())).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
