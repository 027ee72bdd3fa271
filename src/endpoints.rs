//! Mapping from request kinds to API paths.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::models::ChatRequest;

/// An API path under the versioned root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ChatCompletions,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::ChatCompletions => "chat/completions",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Endpoint {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_matches('/') {
            "chat/completions" => Ok(Endpoint::ChatCompletions),
            other => Err(ModelError::EndpointNotAvailable(other.to_string())),
        }
    }
}

/// Every request the client knows how to send, each tied to its endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiRequest {
    Chat(ChatRequest),
}

impl ApiRequest {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiRequest::Chat(_) => Endpoint::ChatCompletions,
        }
    }

    pub fn is_stream(&self) -> bool {
        match self {
            ApiRequest::Chat(request) => request.is_stream(),
        }
    }
}

impl From<ChatRequest> for ApiRequest {
    fn from(request: ChatRequest) -> Self {
        ApiRequest::Chat(request)
    }
}
