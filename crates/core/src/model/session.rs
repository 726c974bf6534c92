use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{AnswerId, VariableId};

//
// ─── VARIABLE INPUT ────────────────────────────────────────────────────────────
//

/// Raw value typed into an answer's auxiliary input.
///
/// Serialized untagged so the document reads `"urban"`, `12.5` or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableInput {
    Text(String),
    Number(f64),
    Empty,
}

impl VariableInput {
    /// Interprets the input as a number, parsing text leniently.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VariableInput::Number(n) if n.is_finite() => Some(*n),
            VariableInput::Text(raw) => raw.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// True for inputs that clear a selection: null, blank text or zero.
    #[must_use]
    pub fn is_blank_or_zero(&self) -> bool {
        match self {
            VariableInput::Empty => true,
            VariableInput::Text(raw) => {
                let raw = raw.trim();
                raw.is_empty() || raw.parse::<f64>().is_ok_and(|n| n == 0.0)
            }
            VariableInput::Number(n) => *n == 0.0,
        }
    }
}

impl From<&str> for VariableInput {
    fn from(value: &str) -> Self {
        VariableInput::Text(value.to_owned())
    }
}

impl From<f64> for VariableInput {
    fn from(value: f64) -> Self {
        VariableInput::Number(value)
    }
}

impl fmt::Display for VariableInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableInput::Text(raw) => f.write_str(raw),
            VariableInput::Number(n) => write!(f, "{n}"),
            VariableInput::Empty => f.write_str("null"),
        }
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// One auxiliary input attached to a selected answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValue {
    pub variable_id: VariableId,
    pub value: VariableInput,
}

impl VariableValue {
    #[must_use]
    pub fn new(variable_id: VariableId, value: impl Into<VariableInput>) -> Self {
        Self {
            variable_id,
            value: value.into(),
        }
    }
}

/// One selected choice, optionally carrying variable inputs.
///
/// Holds at most one value per `variable_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer_id: AnswerId,
    #[serde(default)]
    pub variable_values: Vec<VariableValue>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(answer_id: AnswerId) -> Self {
        Self {
            answer_id,
            variable_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(answer_id: AnswerId, value: VariableValue) -> Self {
        Self {
            answer_id,
            variable_values: vec![value],
        }
    }

    #[must_use]
    pub fn value_of(&self, variable_id: VariableId) -> Option<&VariableInput> {
        self.variable_values
            .iter()
            .find(|v| v.variable_id == variable_id)
            .map(|v| &v.value)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The in-progress set of answers plus seminar linkage for one attempt.
///
/// `answers` keeps selection order and never holds two records for the same answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub seminar_access_code: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub is_kid: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn answer(&self, answer_id: AnswerId) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.answer_id == answer_id)
    }

    #[must_use]
    pub fn is_selected(&self, answer_id: AnswerId) -> bool {
        self.answer(answer_id).is_some()
    }

    pub fn answer_ids(&self) -> impl Iterator<Item = AnswerId> + '_ {
        self.answers.iter().map(|a| a.answer_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.seminar_access_code.is_none()
    }
}
