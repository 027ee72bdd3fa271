use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::pin::Pin;

use crate::error::{ModelError, ModelResult};

pub type BodyStream = Pin<Box<dyn Stream<Item = ModelResult<Bytes>> + Send>>;

/// The body of an HTTP response. Dropping it releases the connection.
pub trait ResponseBody: Send {
    fn into_stream(self: Box<Self>) -> BodyStream;
}

/// An HTTP response whose body has not been read yet.
pub struct RawResponse {
    status: StatusCode,
    streamed: bool,
    body: Box<dyn ResponseBody>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: Box<dyn ResponseBody>) -> Self {
        Self {
            status,
            streamed: false,
            body,
        }
    }

    /// Mark the response as the answer to a `stream: true` request.
    pub fn with_streamed(mut self, streamed: bool) -> Self {
        self.streamed = streamed;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the request asked for server-sent events.
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> ModelResult<Bytes> {
        let mut stream = self.body.into_stream();
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }

    pub fn into_stream(self) -> BodyStream {
        self.body.into_stream()
    }
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("streamed", &self.streamed)
            .finish_non_exhaustive()
    }
}

/// Sends one POST and hands back the unread response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, headers: HeaderMap, body: Vec<u8>) -> ModelResult<RawResponse>;
}

/// Default transport backed by `reqwest`, with no timeout or retry policy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> ModelResult<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

struct ReqwestBody(reqwest::Response);

impl ResponseBody for ReqwestBody {
    fn into_stream(self: Box<Self>) -> BodyStream {
        Box::pin(self.0.bytes_stream().map(|chunk| chunk.map_err(ModelError::from)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &str, headers: HeaderMap, body: Vec<u8>) -> ModelResult<RawResponse> {
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(RawResponse::new(resp.status(), Box::new(ReqwestBody(resp))))
    }
}
