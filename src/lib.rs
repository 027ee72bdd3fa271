//! A thin client for the OpenAI chat completions API.
//!
//! Build a [`ChatRequest`] with [`ChatRequestBuilder`], send it through an
//! [`ApiClient`] and decode either a [`ChatResponse`] or a stream of
//! [`ChatCompletionChunk`]s. Errors from the API come back as [`ApiError`].

pub mod builder;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use builder::ChatRequestBuilder;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use endpoints::{ApiRequest, Endpoint};
pub use error::{ApiError, ModelError, ModelResult};
pub use models::{
    ChatChoice, ChatCompletionChunk, ChatMessage, ChatRequest, ChatResponse, JsonSchema,
    ResponseFormat, Stop, StreamOptions, Tool, ToolCall, ToolChoice,
};
pub use streaming::StreamingResponse;
pub use transport::{RawResponse, ReqwestTransport, ResponseBody, Transport};
pub use types::TokenUsage;

/// Initialize the logging system
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
