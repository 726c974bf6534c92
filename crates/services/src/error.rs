//! Shared error types for the services crate.

use reqwest::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use e4l_core::model::{AnswerId, VariableId};
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuestionnaireTransport` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("backend returned an empty response")]
    EmptyResponse,
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// HTTP status behind the failure, when the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::HttpStatus(status) => Some(*status),
            TransportError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Structured payload carried by the `*Failed` session events.
    #[must_use]
    pub fn detail(&self) -> Value {
        let kind = match self {
            TransportError::InvalidUrl(_) => "invalid_url",
            TransportError::EmptyResponse => "empty_response",
            TransportError::HttpStatus(_) => "http_status",
            TransportError::Http(err) if err.is_timeout() => "timeout",
            TransportError::Http(_) => "request",
        };
        let mut detail = json!({ "kind": kind, "message": self.to_string() });
        if let Some(status) = self.status() {
            detail["status"] = json!(status.as_u16());
        }
        detail
    }
}

/// Errors emitted by `QuestionnaireFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("question catalog has not been loaded")]
    CatalogNotLoaded,
    #[error("answer {0} is not part of the questionnaire")]
    UnknownAnswer(AnswerId),
    #[error("answer {answer_id} does not declare variable {variable_id}")]
    UnknownVariable {
        answer_id: AnswerId,
        variable_id: VariableId,
    },
    #[error("question {question_index} is not complete")]
    NotEligible { question_index: usize },
    #[error("session has not been submitted yet")]
    NotSubmitted,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_carries_status_code() {
        let detail = TransportError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE).detail();
        assert_eq!(detail["kind"], "http_status");
        assert_eq!(detail["status"], 503);
        assert!(detail["message"].as_str().is_some_and(|m| m.contains("503")));
    }

    #[test]
    fn detail_without_status() {
        let detail = TransportError::EmptyResponse.detail();
        assert_eq!(detail["kind"], "empty_response");
        assert!(detail.get("status").is_none());
    }
}
