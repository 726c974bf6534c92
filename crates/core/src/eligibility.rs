//! Decides whether the user may move past a question.

use crate::model::{AnswerId, AnswerRecord, Question, Questionnaire, ValueLimit};
use crate::state::SessionState;

/// Breakdown of an eligibility decision for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReport {
    /// Selected answers that belong to the question.
    pub selected: usize,
    /// `min_answers_number` of the question.
    pub required: usize,
    /// Selected answers still missing some of their declared variables.
    pub incomplete: Vec<AnswerId>,
    pub blocked_by_limit: bool,
    pub question_missing: bool,
}

impl EligibilityReport {
    #[must_use]
    pub fn can_advance(&self) -> bool {
        !self.question_missing
            && !self.blocked_by_limit
            && self.incomplete.is_empty()
            && self.selected >= self.required
    }

    fn missing_question() -> Self {
        Self {
            selected: 0,
            required: 0,
            incomplete: Vec::new(),
            blocked_by_limit: false,
            question_missing: true,
        }
    }
}

/// Evaluates the answers against a question definition.
///
/// An absent question always yields a report that cannot advance.
#[must_use]
pub fn evaluate(
    answers: &[AnswerRecord],
    question: Option<&Question>,
    limit: &ValueLimit,
) -> EligibilityReport {
    let Some(question) = question else {
        return EligibilityReport::missing_question();
    };

    let mut selected = 0;
    let mut incomplete = Vec::new();
    for record in answers {
        let Some(definition) = question.possible_answer(record.answer_id) else {
            continue;
        };
        selected += 1;
        let declared = definition.variables.len();
        if declared != 0 && record.variable_values.len() != declared {
            incomplete.push(record.answer_id);
        }
    }

    EligibilityReport {
        selected,
        required: question.min_answers_number,
        incomplete,
        blocked_by_limit: limit.is_exceeded(),
        question_missing: false,
    }
}

/// Whether the question at `question_index` has enough complete answers.
#[must_use]
pub fn can_advance(state: &SessionState, catalog: &Questionnaire, question_index: usize) -> bool {
    evaluate(
        &state.session.answers,
        catalog.question(question_index),
        &state.value_limit,
    )
    .can_advance()
}
