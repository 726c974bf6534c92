use serde::{Deserialize, Serialize};

use crate::error::{ComputationError, SeminarValidationError, SubmissionError, ValueLimitBreach};
use crate::model::{CalculationResult, SessionId};

/// Lifecycle of one long-running operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AsyncStatus<E> {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected(E),
}

impl<E> AsyncStatus<E> {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncStatus::Pending)
    }

    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, AsyncStatus::Fulfilled)
    }

    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            AsyncStatus::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// Progress of sending the session to the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSubmission {
    pub status: AsyncStatus<SubmissionError>,
    /// Backend handle for the stored session, used later to fetch results.
    pub session_id: Option<SessionId>,
}

/// Progress of the energy computation.
///
/// `result` keeps the last successful computation across failures and restarts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnergyComputation {
    pub status: AsyncStatus<ComputationError>,
    pub result: Option<CalculationResult>,
}

/// Backend answer for a seminar access code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeminarVerdict {
    pub is_valid: bool,
    #[serde(default)]
    pub is_open: Option<bool>,
    #[serde(default)]
    pub seminar_status: Option<String>,
}

/// Progress of the seminar code round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeminarValidation {
    pub status: AsyncStatus<SeminarValidationError>,
    pub verdict: Option<SeminarVerdict>,
}

impl SeminarValidation {
    #[must_use]
    pub fn is_code_valid(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.is_valid)
    }
}

/// Whether some input currently exceeds its declared maximum.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueLimit {
    #[default]
    Within,
    Exceeded(ValueLimitBreach),
}

impl ValueLimit {
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        matches!(self, ValueLimit::Exceeded(_))
    }

    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            ValueLimit::Exceeded(breach) => Some(breach.to_string()),
            ValueLimit::Within => None,
        }
    }
}
