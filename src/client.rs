use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::endpoints::{ApiRequest, Endpoint};
use crate::error::{ApiError, ModelError, ModelResult};
use crate::models::{ChatRequest, ChatResponse};
use crate::streaming::{decode_chunks, StreamingResponse};
use crate::transport::{RawResponse, ReqwestTransport, Transport};

pub const ORGANIZATION_HEADER: &str = "openai-organization";
pub const PROJECT_HEADER: &str = "openai-project";

const UNPARSABLE_ERROR_MESSAGE: &str = "failed to parse API error response";

/// Only the `stream` flag of an arbitrary payload.
#[derive(Deserialize)]
struct StreamFlag {
    #[serde(default)]
    stream: Option<bool>,
}

/// Error body returned with any status >= 400. Missing parts decode as empty.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Client for the chat completions API.
///
/// Holds the resolved [`ClientConfig`] and a [`Transport`]; both are
/// read-only, so one client can serve any number of concurrent calls.
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ModelResult<Self> {
        let transport = ReqwestTransport::new(config.user_agent())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Resolve everything from `OPEN_AI_*` environment variables.
    pub fn from_env() -> ModelResult<Self> {
        Self::new(ClientConfig::resolve(None, None, None, None)?)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn headers(&self) -> ModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key()))?,
        );
        if !self.config.org_id().is_empty() {
            headers.insert(ORGANIZATION_HEADER, HeaderValue::from_str(self.config.org_id())?);
        }
        if !self.config.project_id().is_empty() {
            headers.insert(PROJECT_HEADER, HeaderValue::from_str(self.config.project_id())?);
        }
        Ok(headers)
    }

    /// Serialize `request` and POST it to its endpoint.
    ///
    /// The returned response is unread; pass it to [`ApiClient::response`] or
    /// [`ApiClient::response_stream`].
    pub async fn request(&self, request: impl Into<ApiRequest>) -> ModelResult<RawResponse> {
        let request = request.into();
        let data = serde_json::to_vec(&request).map_err(ModelError::UnableToMarshalRequestData)?;
        self.send(request.endpoint(), data, request.is_stream()).await
    }

    /// Like [`ApiClient::request`] for an arbitrary payload addressed by path.
    /// Unknown paths fail before anything is sent.
    pub async fn request_raw<T>(&self, endpoint: &str, payload: &T) -> ModelResult<RawResponse>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_vec(payload).map_err(ModelError::UnableToMarshalRequestData)?;
        let endpoint: Endpoint = endpoint.parse()?;
        let streamed = serde_json::from_slice::<StreamFlag>(&data)
            .ok()
            .and_then(|flag| flag.stream)
            .unwrap_or(false);
        self.send(endpoint, data, streamed).await
    }

    async fn send(&self, endpoint: Endpoint, data: Vec<u8>, streamed: bool) -> ModelResult<RawResponse> {
        let url = format!("{}/{}", self.config.api_url(), endpoint.path());
        let headers = self.headers()?;
        debug!(%url, body_bytes = data.len(), "sending request");
        let resp = self.transport.post(&url, headers, data).await?;
        debug!(status = %resp.status(), streamed, "received response");
        Ok(resp.with_streamed(streamed))
    }

    /// Decode a non-streaming response body into `T`, or the API error.
    /// Responses to `stream: true` requests belong to [`ApiClient::response_stream`].
    pub async fn response<T: DeserializeOwned>(&self, resp: RawResponse) -> ModelResult<T> {
        if is_error_status(resp.status()) {
            return Err(self.handle_api_error(resp).await.into());
        }
        if resp.is_streamed() {
            return Err(ModelError::InvalidRequest(
                "the request set `stream`; decode the response with response_stream".to_string(),
            ));
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(ModelError::Decode)
    }

    /// Decode a `stream: true` response into a chunk stream, or the API error.
    pub async fn response_stream(&self, resp: RawResponse) -> ModelResult<StreamingResponse> {
        if is_error_status(resp.status()) {
            return Err(self.handle_api_error(resp).await.into());
        }
        if !resp.is_streamed() {
            return Err(ModelError::InvalidRequest(
                "the request did not set `stream`; decode the response with response".to_string(),
            ));
        }
        Ok(decode_chunks(resp.into_stream()))
    }

    async fn handle_api_error(&self, resp: RawResponse) -> ApiError {
        let status = resp.status();
        let err = match resp.bytes().await {
            Ok(body) => decode_api_error(status, &body),
            Err(e) => ApiError {
                status,
                message: UNPARSABLE_ERROR_MESSAGE.to_string(),
                details: e.to_string(),
            },
        };
        warn!(status = status.as_u16(), message = %err.message, "API returned an error");
        err
    }

    /// Send a non-streaming chat request and decode the completion.
    pub async fn chat(&self, req: &ChatRequest) -> ModelResult<ChatResponse> {
        if req.is_stream() {
            return Err(ModelError::InvalidRequest(
                "`stream` is set; use chat_stream for streamed completions".to_string(),
            ));
        }
        let model = req.model.clone();
        let start = Instant::now();
        let result = match self.request(req.clone()).await {
            Ok(resp) => self.response::<ChatResponse>(resp).await,
            Err(e) => Err(e),
        };
        histogram!("llm_request_latency_seconds", start.elapsed().as_secs_f64(), "model" => model.clone());
        match &result {
            Ok(r) => {
                counter!("llm_requests_total", 1, "model" => model.clone(), "result" => "success");
                if let Some(usage) = &r.usage {
                    counter!("llm_prompt_tokens_total", usage.prompt_tokens as u64, "model" => model.clone());
                    counter!("llm_completion_tokens_total", usage.completion_tokens as u64, "model" => model.clone());
                }
            }
            Err(_) => {
                counter!("llm_requests_total", 1, "model" => model, "result" => "error");
            }
        }
        result
    }

    /// Send a chat request with `stream` forced on and decode the chunks.
    pub async fn chat_stream(&self, req: &ChatRequest) -> ModelResult<StreamingResponse> {
        let mut req = req.clone();
        req.stream = Some(true);
        let model = req.model.clone();
        let start = Instant::now();
        let result = match self.request(req).await {
            Ok(resp) => self.response_stream(resp).await,
            Err(e) => Err(e),
        };
        histogram!("llm_request_latency_seconds", start.elapsed().as_secs_f64(), "model" => model.clone());
        let outcome = if result.is_ok() { "success" } else { "error" };
        counter!("llm_requests_total", 1, "model" => model, "result" => outcome);
        result
    }
}

fn is_error_status(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// Build an [`ApiError`] from an error body. The status is kept even when
/// the body is not the expected JSON.
fn decode_api_error(status: StatusCode, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(parsed) => {
            let e = parsed.error;
            ApiError {
                status,
                message: e.message,
                details: format!(
                    "Type: {}, Code: {}, Param: {}",
                    e.error_type.unwrap_or_default(),
                    e.code.unwrap_or_default(),
                    e.param.unwrap_or_default()
                ),
            }
        }
        Err(e) => ApiError {
            status,
            message: UNPARSABLE_ERROR_MESSAGE.to_string(),
            details: e.to_string(),
        },
    }
}
