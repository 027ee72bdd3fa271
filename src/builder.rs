//! Fluent construction of [`ChatRequest`] values.

use std::collections::BTreeMap;

use crate::models::{ChatMessage, ChatRequest, ResponseFormat, Stop, StreamOptions, Tool, ToolChoice};

/// Accumulates optional fields on top of the two required ones.
///
/// Each setter marks its field as present, so `n(0)` or `stream(false)`
/// still end up in the JSON body. Nothing is validated here.
#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    request: ChatRequest,
}

impl ChatRequestBuilder {
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            request: ChatRequest::new(messages, model),
        }
    }

    pub fn frequency_penalty(mut self, value: f64) -> Self {
        self.request.frequency_penalty = Some(value);
        self
    }

    pub fn logit_bias(mut self, value: BTreeMap<u32, f64>) -> Self {
        self.request.logit_bias = Some(value);
        self
    }

    pub fn logprobs(mut self, value: bool) -> Self {
        self.request.logprobs = Some(value);
        self
    }

    pub fn top_logprobs(mut self, value: u32) -> Self {
        self.request.top_logprobs = Some(value);
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.request.max_tokens = Some(value);
        self
    }

    pub fn n(mut self, value: u32) -> Self {
        self.request.n = Some(value);
        self
    }

    pub fn presence_penalty(mut self, value: f64) -> Self {
        self.request.presence_penalty = Some(value);
        self
    }

    pub fn response_format(mut self, value: ResponseFormat) -> Self {
        self.request.response_format = Some(value);
        self
    }

    pub fn seed(mut self, value: i64) -> Self {
        self.request.seed = Some(value);
        self
    }

    pub fn service_tier(mut self, value: impl Into<String>) -> Self {
        self.request.service_tier = Some(value.into());
        self
    }

    pub fn stop(mut self, value: impl Into<Stop>) -> Self {
        self.request.stop = Some(value.into());
        self
    }

    pub fn stream(mut self, value: bool) -> Self {
        self.request.stream = Some(value);
        self
    }

    pub fn stream_options(mut self, value: StreamOptions) -> Self {
        self.request.stream_options = Some(value);
        self
    }

    pub fn temperature(mut self, value: f64) -> Self {
        self.request.temperature = Some(value);
        self
    }

    pub fn top_p(mut self, value: f64) -> Self {
        self.request.top_p = Some(value);
        self
    }

    pub fn tools(mut self, value: Vec<Tool>) -> Self {
        self.request.tools = Some(value);
        self
    }

    pub fn tool_choice(mut self, value: ToolChoice) -> Self {
        self.request.tool_choice = Some(value);
        self
    }

    pub fn parallel_tool_calls(mut self, value: bool) -> Self {
        self.request.parallel_tool_calls = Some(value);
        self
    }

    pub fn user(mut self, value: impl Into<String>) -> Self {
        self.request.user = Some(value.into());
        self
    }

    pub fn build(self) -> ChatRequest {
        self.request
    }
}

impl From<ChatRequestBuilder> for ChatRequest {
    fn from(builder: ChatRequestBuilder) -> Self {
        builder.build()
    }
}
