use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::assistants::RunStatus;
use crate::i18n::I18n;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Forbidden: invalid or missing API key")]
    Forbidden,

    #[error("{0}")]
    Assistant(#[from] AssistantError),

    #[error("Assistant requested an unregistered tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool {tool}")]
    InvalidToolArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Run {run_id} ended with status {status}: {}",
        .last_error.as_deref().unwrap_or("no error reported")
    )]
    RunFailed {
        run_id: String,
        status: RunStatus,
        last_error: Option<String>,
    },

    #[error("Run {run_id} did not finish within {steps} polling steps")]
    RunStalled { run_id: String, steps: u32 },

    #[error("Assistant produced no text reply on thread {thread_id}")]
    EmptyReply { thread_id: String },

    #[error("Cancelled while waiting on run {run_id}")]
    Cancelled { run_id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversation service (Assistants API) client errors
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Connection failed to assistant service at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Assistant service request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from assistant service at {url}")]
    InvalidResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Document search provider errors.
///
/// These never reach an HTTP caller: the search client renders them into the
/// tool output so the assistant can relay the failure.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("connection to search service at {url} failed")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("search service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response from search service")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Assistant(_)
            | ServiceError::UnknownTool { .. }
            | ServiceError::InvalidToolArguments { .. }
            | ServiceError::RunFailed { .. }
            | ServiceError::EmptyReply { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::RunStalled { .. } => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Config { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::MissingParameter { .. } => "missing_parameter",
            ServiceError::Forbidden => "forbidden",
            ServiceError::Assistant(AssistantError::Connection { .. }) => "assistant_connection",
            ServiceError::Assistant(AssistantError::Api { .. }) => "assistant_api",
            ServiceError::Assistant(AssistantError::InvalidResponse { .. }) => {
                "assistant_invalid_response"
            }
            ServiceError::UnknownTool { .. } => "unknown_tool",
            ServiceError::InvalidToolArguments { .. } => "invalid_tool_arguments",
            ServiceError::RunFailed { .. } => "run_failed",
            ServiceError::RunStalled { .. } => "run_stalled",
            ServiceError::EmptyReply { .. } => "empty_reply",
            ServiceError::Cancelled { .. } => "cancelled",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            ServiceError::MissingParameter { name } => {
                i18n.format(locale, "error-missing-parameter", &[("name", name.as_str())])
            }
            ServiceError::Forbidden => i18n.get(locale, "error-forbidden", None),
            ServiceError::RunStalled { .. } => i18n.get(locale, "error-run-stalled", None),
            ServiceError::Cancelled { .. } => i18n.get(locale, "error-cancelled", None),
            ServiceError::Internal { .. } => i18n.get(locale, "error-internal", None),
            // For other errors, fall back to the technical message
            _ => format_error_chain(self),
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n, locale: &str) -> Response {
        let status = self.status_code();
        let response = ErrorResponse {
            message: self.user_message(i18n, locale),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error followed by each of its sources, separated by `: `.
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: Arc<I18n>,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: Arc<I18n>) -> Self {
        Self { error, i18n }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        let locale = self.i18n.default_locale().to_string();
        self.error.into_response_with_i18n(&self.i18n, &locale)
    }
}
