use serde::Serialize;

use e4l_core::model::{AnswerRecord, Session, VariableInput};

/// Session body in the shape the backend binds to its `Session` entity.
#[derive(Debug, Serialize)]
pub(crate) struct WireSession<'a> {
    seminar_access_code: Option<&'a str>,
    answers: Vec<WireAnswer<'a>>,
    iskid: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAnswer<'a> {
    possible_answer: WireRef,
    variable_values: Vec<WireVariableValue<'a>>,
}

#[derive(Debug, Serialize)]
struct WireRef {
    id: u64,
}

#[derive(Debug, Serialize)]
struct WireVariableValue<'a> {
    variable: WireRef,
    value: &'a VariableInput,
}

impl<'a> From<&'a Session> for WireSession<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            seminar_access_code: session.seminar_access_code.as_deref(),
            answers: session.answers.iter().map(WireAnswer::from).collect(),
            iskid: session.is_kid,
        }
    }
}

impl<'a> From<&'a AnswerRecord> for WireAnswer<'a> {
    fn from(record: &'a AnswerRecord) -> Self {
        Self {
            possible_answer: WireRef {
                id: record.answer_id.value(),
            },
            variable_values: record
                .variable_values
                .iter()
                .map(|v| WireVariableValue {
                    variable: WireRef {
                        id: v.variable_id.value(),
                    },
                    value: &v.value,
                })
                .collect(),
        }
    }
}

/// The backend answers session submissions with a bare id, quoted or not.
pub(crate) fn parse_session_id(body: &str) -> Option<String> {
    let trimmed = body.trim();
    let unquoted = serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_owned());
    let unquoted = unquoted.trim();
    (!unquoted.is_empty()).then(|| unquoted.to_owned())
}
