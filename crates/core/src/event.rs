use serde::{Deserialize, Serialize};

use crate::error::{ComputationError, SeminarValidationError, SubmissionError, ValueLimitBreach};
use crate::model::{AnswerId, CalculationResult, SeminarVerdict, SessionId, VariableId, VariableValue};

/// Everything that can happen to a questionnaire session.
///
/// UI actions and transport completions share this vocabulary and are applied
/// one at a time by [`crate::reduce`]. Kinds this build does not know about
/// deserialize to `Unrecognized`, which never changes the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SelectAnswer {
        answer_id: AnswerId,
        #[serde(default)]
        variable: Option<VariableValue>,
    },
    UnselectAnswer {
        answer_id: AnswerId,
        #[serde(default)]
        variable_id: Option<VariableId>,
    },
    SetSeminarCode {
        code: String,
    },
    SetKidMode {
        is_kid: bool,
    },

    SubmitSessionRequested,
    SubmitSessionSucceeded {
        session_id: SessionId,
    },
    SubmitSessionFailed {
        error: SubmissionError,
    },

    ComputeEnergyRequested,
    ComputeEnergySucceeded {
        result: CalculationResult,
    },
    ComputeEnergyFailed {
        error: ComputationError,
    },

    ValidateSeminarRequested,
    ValidateSeminarSucceeded {
        verdict: SeminarVerdict,
    },
    ValidateSeminarFailed {
        error: SeminarValidationError,
    },

    ValueLimitExceeded {
        breach: ValueLimitBreach,
    },
    ValueLimitCleared,

    RestartSession,

    #[serde(other)]
    Unrecognized,
}

impl SessionEvent {
    #[must_use]
    pub fn select(answer_id: AnswerId) -> Self {
        SessionEvent::SelectAnswer {
            answer_id,
            variable: None,
        }
    }

    #[must_use]
    pub fn select_with(answer_id: AnswerId, variable: VariableValue) -> Self {
        SessionEvent::SelectAnswer {
            answer_id,
            variable: Some(variable),
        }
    }

    #[must_use]
    pub fn unselect(answer_id: AnswerId) -> Self {
        SessionEvent::UnselectAnswer {
            answer_id,
            variable_id: None,
        }
    }

    /// Short stable name, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::SelectAnswer { .. } => "select_answer",
            SessionEvent::UnselectAnswer { .. } => "unselect_answer",
            SessionEvent::SetSeminarCode { .. } => "set_seminar_code",
            SessionEvent::SetKidMode { .. } => "set_kid_mode",
            SessionEvent::SubmitSessionRequested => "submit_session_requested",
            SessionEvent::SubmitSessionSucceeded { .. } => "submit_session_succeeded",
            SessionEvent::SubmitSessionFailed { .. } => "submit_session_failed",
            SessionEvent::ComputeEnergyRequested => "compute_energy_requested",
            SessionEvent::ComputeEnergySucceeded { .. } => "compute_energy_succeeded",
            SessionEvent::ComputeEnergyFailed { .. } => "compute_energy_failed",
            SessionEvent::ValidateSeminarRequested => "validate_seminar_requested",
            SessionEvent::ValidateSeminarSucceeded { .. } => "validate_seminar_succeeded",
            SessionEvent::ValidateSeminarFailed { .. } => "validate_seminar_failed",
            SessionEvent::ValueLimitExceeded { .. } => "value_limit_exceeded",
            SessionEvent::ValueLimitCleared => "value_limit_cleared",
            SessionEvent::RestartSession => "restart_session",
            SessionEvent::Unrecognized => "unrecognized",
        }
    }
}
