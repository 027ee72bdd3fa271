use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::config::API_KEY_ENV;

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ModelError {
    /// No API key was passed in and the environment does not provide one
    #[error("API key not available in arguments or environment variables. Run `export {}={{your_api_key}}`", API_KEY_ENV)]
    MissingApiKey,

    /// The request payload could not be serialized to JSON
    #[error("unable to marshal request data as JSON: {0}")]
    UnableToMarshalRequestData(#[source] serde_json::Error),

    /// The request does not map to any known endpoint
    #[error("request data does not match an available endpoint: `{0}`")]
    EndpointNotAvailable(String),

    /// The API answered with a status >= 400
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success body did not match the expected shape
    #[error("failed to decode JSON response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Stream disconnected or produced malformed events
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid request parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network, DNS or connection failure, surfaced unchanged
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Error returned by the API for any status >= 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error: {} - {}: {}",
            self.status.as_u16(),
            self.message,
            self.details
        )
    }
}

impl std::error::Error for ApiError {}

impl ModelError {
    /// Check if the error is a client error (the request itself is at fault)
    pub fn is_client_error(&self) -> bool {
        match self {
            ModelError::Api(err) => err.status.is_client_error(),
            ModelError::MissingApiKey
            | ModelError::UnableToMarshalRequestData(_)
            | ModelError::EndpointNotAvailable(_)
            | ModelError::InvalidRequest(_)
            | ModelError::Url(_)
            | ModelError::InvalidHeader(_) => true,
            _ => false,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ModelError::Api(err) => Some(err.status),
            ModelError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// The decoded API error, if this is one
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            ModelError::Api(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_names_env_var() {
        let msg = ModelError::MissingApiKey.to_string();
        assert!(msg.contains("OPEN_AI_API_KEY"));
        assert!(msg.contains("{your_api_key}"));
    }

    #[test]
    fn api_error_display() {
        let err = ApiError {
            status: StatusCode::NOT_FOUND,
            message: "model not found".to_string(),
            details: "Type: invalid_request_error, Code: , Param: model".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error: 404 - model not found: Type: invalid_request_error, Code: , Param: model"
        );

        let err = ModelError::from(err);
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
        assert!(err.is_client_error());
    }

    #[test]
    fn server_errors_are_not_client_errors() {
        let err = ModelError::Api(ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: "upstream".to_string(),
            details: String::new(),
        });
        assert!(!err.is_client_error());
        assert!(err.as_api_error().is_some());
        assert!(!ModelError::Stream("eof".into()).is_client_error());
    }
}
