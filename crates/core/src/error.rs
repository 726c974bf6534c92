use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::VariableId;

/// Human-readable line for a failure payload of any shape.
fn summarize(detail: &Value) -> String {
    match detail {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| detail.to_string(), str::to_owned),
        Value::Null => "unknown error".to_owned(),
        other => other.to_string(),
    }
}

/// Declares a failure type that keeps its payload verbatim.
///
/// Any JSON value deserializes into it; serialization writes the payload back unchanged.
macro_rules! async_failure {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "Value", into = "Value")]
        #[error("{prefix}: {message}", prefix = $prefix)]
        #[non_exhaustive]
        pub struct $name {
            pub message: String,
            pub detail: Value,
        }

        impl $name {
            #[must_use]
            pub fn new(message: impl Into<String>) -> Self {
                let message = message.into();
                Self {
                    detail: Value::String(message.clone()),
                    message,
                }
            }

            /// Keep a structured payload next to the summary line.
            #[must_use]
            pub fn with_detail(message: impl Into<String>, detail: Value) -> Self {
                Self {
                    message: message.into(),
                    detail,
                }
            }
        }

        impl From<Value> for $name {
            fn from(detail: Value) -> Self {
                Self {
                    message: summarize(&detail),
                    detail,
                }
            }
        }

        impl From<$name> for Value {
            fn from(error: $name) -> Self {
                error.detail
            }
        }
    };
}

async_failure!(
    /// Network or validation failure while sending the session.
    SubmissionError,
    "session submission failed"
);

async_failure!(
    /// Failure reported by the external scoring service.
    ComputationError,
    "energy computation failed"
);

async_failure!(
    /// Failure of the seminar access code round trip.
    SeminarValidationError,
    "seminar code validation failed"
);

/// Client-side input above the declared maximum.
///
/// Not a hard error: it only blocks navigation until the input is corrected.
/// Values that overflow to infinity count as above any maximum.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("the value should not be greater than {max} (got {value})")]
#[non_exhaustive]
pub struct ValueLimitBreach {
    pub variable_id: VariableId,
    pub value: f64,
    pub max: f64,
}

impl ValueLimitBreach {
    #[must_use]
    pub fn new(variable_id: VariableId, value: f64, max: f64) -> Self {
        Self {
            variable_id,
            value,
            max,
        }
    }
}
