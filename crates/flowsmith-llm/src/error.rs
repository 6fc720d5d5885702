use serde::Serialize;
use thiserror::Error;

use crate::client::service_message;

/// Failure of a single chat-completion call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The service could not be reached (DNS, refused, timed out, reset).
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("LLM request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse LLM response: {0}")]
    Decode(String),

    #[error("Invalid LLM request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ChatError::Request(err.to_string())
        } else if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Connection(err.to_string())
        }
    }
}

impl ChatError {
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        ChatError::Status {
            status,
            message: service_message(body),
        }
    }
}

/// The model answered, but not with a usable workflow.
#[derive(Debug, Error)]
pub enum MalformedOutput {
    #[error("response was empty")]
    EmptyResponse,

    #[error("response contained no ```json block")]
    NoJsonFound,

    #[error("workflow JSON is invalid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("workflow JSON is not an object")]
    NotAnObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MissingCredential,
    AuthFailure,
    AccessRestricted,
    RateLimited,
    MalformedModelOutput,
    ServiceError,
    Failed,
}

/// Every way a generation request can fail, as reported to callers.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Requirement text is empty")]
    InvalidInput,

    #[error("No API key provided and OPENAI_API_KEY is not set")]
    MissingCredential,

    #[error("The API key was rejected by the model service")]
    AuthFailure,

    #[error("The model service refused access from this account or region: {0}")]
    AccessRestricted(String),

    #[error("The model service rate limit was reached")]
    RateLimited,

    #[error("The model returned an unusable response: {0}")]
    MalformedModelOutput(#[from] MalformedOutput),

    #[error("Model service error: {0}")]
    ServiceError(String),

    #[error("Workflow generation failed: {0}")]
    Failed(String),
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::InvalidInput => ErrorKind::InvalidInput,
            GenerateError::MissingCredential => ErrorKind::MissingCredential,
            GenerateError::AuthFailure => ErrorKind::AuthFailure,
            GenerateError::AccessRestricted(_) => ErrorKind::AccessRestricted,
            GenerateError::RateLimited => ErrorKind::RateLimited,
            GenerateError::MalformedModelOutput(_) => ErrorKind::MalformedModelOutput,
            GenerateError::ServiceError(_) => ErrorKind::ServiceError,
            GenerateError::Failed(_) => ErrorKind::Failed,
        }
    }

    /// What the user can do about it, where there is something to do.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            GenerateError::InvalidInput => {
                Some("Describe the automation you want in a sentence or two.")
            }
            GenerateError::MissingCredential => {
                Some("Pass --api-key or set OPENAI_API_KEY.")
            }
            GenerateError::AuthFailure => Some("Check that the API key is correct and active."),
            GenerateError::AccessRestricted(_) => Some(
                "Point OPENAI_BASE_URL at a reachable proxy or compatible provider, \
                 or use a key from a provider available in your region.",
            ),
            GenerateError::RateLimited => Some("Wait a moment and try again."),
            GenerateError::MalformedModelOutput(_) => {
                Some("Generate again; rephrasing the requirement can help.")
            }
            GenerateError::ServiceError(_) | GenerateError::Failed(_) => None,
        }
    }
}

/// How a failed backend call is handled.
#[derive(Debug)]
pub(crate) enum BackendFailure {
    /// Never reached the service; recovered with a template workflow.
    Transport(String),
    Fatal(GenerateError),
}

/// Markers for backends that only report failures as text.
const CONNECTION_MARKER: &str = "Connection error";
const UNSUPPORTED_MARKER: &str = "not supported";

pub(crate) fn classify_backend_error(err: anyhow::Error) -> BackendFailure {
    if let Some(chat) = err.downcast_ref::<ChatError>() {
        return match chat {
            ChatError::Connection(message) => BackendFailure::Transport(message.clone()),
            ChatError::Status { status, message } => classify_status(*status, message),
            ChatError::Decode(message) | ChatError::Request(message) => {
                BackendFailure::Fatal(GenerateError::Failed(message.clone()))
            }
        };
    }

    let message = format!("{err:#}");
    if message.contains(CONNECTION_MARKER) {
        BackendFailure::Transport(message)
    } else if message.contains("401") {
        BackendFailure::Fatal(GenerateError::AuthFailure)
    } else if message.contains("403") || message.contains(UNSUPPORTED_MARKER) {
        BackendFailure::Fatal(GenerateError::AccessRestricted(message))
    } else if message.contains("429") {
        BackendFailure::Fatal(GenerateError::RateLimited)
    } else {
        BackendFailure::Fatal(GenerateError::Failed(message))
    }
}

fn classify_status(status: u16, message: &str) -> BackendFailure {
    let error = match status {
        401 => GenerateError::AuthFailure,
        403 => GenerateError::AccessRestricted(message.to_string()),
        429 => GenerateError::RateLimited,
        _ if message.contains(UNSUPPORTED_MARKER) => {
            GenerateError::AccessRestricted(message.to_string())
        }
        _ => GenerateError::ServiceError(message.to_string()),
    };
    BackendFailure::Fatal(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn fatal_kind(err: anyhow::Error) -> ErrorKind {
        match classify_backend_error(err) {
            BackendFailure::Fatal(e) => e.kind(),
            BackendFailure::Transport(m) => panic!("unexpected transport failure: {m}"),
        }
    }

    #[test]
    fn test_connection_errors_are_transport() {
        let err = anyhow::Error::from(ChatError::Connection("refused".into()));
        assert!(matches!(
            classify_backend_error(err),
            BackendFailure::Transport(_)
        ));
        let err = anyhow!("Connection error.");
        assert!(matches!(
            classify_backend_error(err),
            BackendFailure::Transport(_)
        ));
    }

    #[test]
    fn test_status_classification() {
        let status = |code, body: &str| anyhow::Error::from(ChatError::from_status(code, body));
        assert_eq!(fatal_kind(status(401, "")), ErrorKind::AuthFailure);
        assert_eq!(fatal_kind(status(403, "")), ErrorKind::AccessRestricted);
        assert_eq!(fatal_kind(status(429, "")), ErrorKind::RateLimited);
        assert_eq!(
            fatal_kind(status(400, r#"{"error":{"message":"Country, region, or territory not supported"}}"#)),
            ErrorKind::AccessRestricted
        );
        assert_eq!(fatal_kind(status(500, "boom")), ErrorKind::ServiceError);
    }

    #[test]
    fn test_text_markers() {
        assert_eq!(fatal_kind(anyhow!("HTTP 401 Unauthorized")), ErrorKind::AuthFailure);
        assert_eq!(
            fatal_kind(anyhow!("model not supported here")),
            ErrorKind::AccessRestricted
        );
        assert_eq!(fatal_kind(anyhow!("429 Too Many Requests")), ErrorKind::RateLimited);
        assert_eq!(fatal_kind(anyhow!("something odd")), ErrorKind::Failed);
    }

    #[test]
    fn test_context_wrapped_chat_error_is_found() {
        let err = anyhow::Error::from(ChatError::from_status(429, "slow down")).context("chat failed");
        assert_eq!(fatal_kind(err), ErrorKind::RateLimited);
    }

    #[test]
    fn test_suggestions() {
        assert!(GenerateError::RateLimited.suggestion().is_some());
        assert!(
            GenerateError::AccessRestricted("x".into())
                .suggestion()
                .unwrap()
                .contains("OPENAI_BASE_URL")
        );
        assert!(GenerateError::Failed("x".into()).suggestion().is_none());
    }

    #[test]
    fn test_failed_keeps_original_message() {
        let err = GenerateError::Failed("disk on fire".into());
        assert_eq!(err.to_string(), "Workflow generation failed: disk on fire");
        assert_eq!(
            serde_json::to_value(err.kind()).unwrap(),
            serde_json::json!("failed")
        );
    }
}
