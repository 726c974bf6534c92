//! Backend round trips, kept behind a trait so flows can run against fakes.

mod http;
mod wire;

use async_trait::async_trait;

use e4l_core::model::{CalculationResult, Questionnaire, SeminarVerdict, Session, SessionId};

use crate::error::TransportError;

pub use http::{ApiConfig, HttpTransport};

/// Requests the questionnaire client makes against the backend.
#[async_trait]
pub trait QuestionnaireTransport: Send + Sync {
    /// Fetch the question catalog.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or the body is not a catalog.
    async fn fetch_questionnaire(&self, kid: bool) -> Result<Questionnaire, TransportError>;

    /// Store the session and return its backend handle.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or no id comes back.
    async fn send_session(&self, session: &Session) -> Result<SessionId, TransportError>;

    /// Score the given answers.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or the result cannot be decoded.
    async fn compute_energy(&self, session: &Session) -> Result<CalculationResult, TransportError>;

    /// Fetch the result of a previously stored session.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or the result cannot be decoded.
    async fn fetch_result(&self, session_id: &SessionId) -> Result<CalculationResult, TransportError>;

    /// Check a seminar access code.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or the verdict cannot be decoded.
    async fn validate_seminar_code(&self, code: &str) -> Result<SeminarVerdict, TransportError>;
}
