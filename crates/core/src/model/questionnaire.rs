use serde::{Deserialize, Serialize};

use crate::error::ValueLimitBreach;
use crate::model::{AnswerId, QuestionId, VariableId, VariableInput};

/// Numeric bounds for a variable input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

/// Auxiliary input declared by a possible answer (distance, frequency, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: VariableId,
    #[serde(default, alias = "name")]
    pub label: String,
    #[serde(default)]
    pub scale: Option<Scale>,
}

impl Variable {
    /// Checks an input against the declared maximum.
    ///
    /// Non-numeric inputs and variables without a maximum always pass. Numbers
    /// too large to represent parse to infinity and are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ValueLimitBreach` when the numeric value is above `scale.max_value`.
    pub fn check(&self, input: &VariableInput) -> Result<(), ValueLimitBreach> {
        let Some(max) = self.scale.as_ref().and_then(|s| s.max_value) else {
            return Ok(());
        };
        let value = match input {
            VariableInput::Number(n) => Some(*n),
            VariableInput::Text(raw) => raw.trim().parse::<f64>().ok(),
            VariableInput::Empty => None,
        };
        match value {
            Some(value) if !value.is_finite() || value > max => {
                Err(ValueLimitBreach::new(self.id, value, max))
            }
            _ => Ok(()),
        }
    }
}

/// One selectable choice of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleAnswer {
    pub id: AnswerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl PossibleAnswer {
    #[must_use]
    pub fn variable(&self, variable_id: VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == variable_id)
    }
}

/// A question definition from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub min_answers_number: usize,
    #[serde(default)]
    pub max_answers_number: Option<usize>,
    #[serde(default)]
    pub possible_answers: Vec<PossibleAnswer>,
}

impl Question {
    #[must_use]
    pub fn possible_answer(&self, answer_id: AnswerId) -> Option<&PossibleAnswer> {
        self.possible_answers.iter().find(|a| a.id == answer_id)
    }

    #[must_use]
    pub fn offers(&self, answer_id: AnswerId) -> bool {
        self.possible_answer(answer_id).is_some()
    }

    /// Single-choice questions swap the previous selection instead of adding to it.
    #[must_use]
    pub fn is_single_choice(&self) -> bool {
        self.max_answers_number == Some(1)
    }
}

/// Read-only question catalog, fetched once per questionnaire run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Questionnaire {
    questions: Vec<Question>,
}

impl Questionnaire {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at a navigation index; `None` when out of range.
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Finds the question offering the given answer.
    #[must_use]
    pub fn question_for_answer(&self, answer_id: AnswerId) -> Option<&Question> {
        self.questions.iter().find(|q| q.offers(answer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": 4,
            "name": "Heating",
            "minAnswersNumber": 1,
            "maxAnswersNumber": 1,
            "possibleAnswers": [
                {"id": 5, "name": "In a flat", "variables": []},
                {"id": 6, "name": "In a house", "variables": [
                    {"id": 60, "name": "surface", "scale": {"minValue": 0, "maxValue": 500}}
                ]}
            ]
        },
        {"id": 17, "name": "Pets", "minAnswersNumber": 0, "possibleAnswers": []}
    ]"#;

    #[test]
    fn parses_backend_catalog() {
        let catalog: Questionnaire = serde_json::from_str(CATALOG).unwrap();

        assert_eq!(catalog.len(), 2);
        let heating = catalog.question(0).unwrap();
        assert!(heating.is_single_choice());
        assert_eq!(heating.min_answers_number, 1);
        let house = heating.possible_answer(AnswerId::new(6)).unwrap();
        assert_eq!(house.variables[0].label, "surface");
        assert!(!catalog.question(1).unwrap().is_single_choice());
        assert!(catalog.question(2).is_none());
    }

    #[test]
    fn finds_question_by_answer() {
        let catalog: Questionnaire = serde_json::from_str(CATALOG).unwrap();
        let question = catalog.question_for_answer(AnswerId::new(6)).unwrap();
        assert_eq!(question.id, QuestionId::new(4));
        assert!(catalog.question_for_answer(AnswerId::new(99)).is_none());
    }

    #[test]
    fn check_rejects_values_above_max() {
        let variable = Variable {
            id: VariableId::new(60),
            label: "surface".into(),
            scale: Some(Scale {
                min_value: Some(0.0),
                max_value: Some(500.0),
            }),
        };

        assert!(variable.check(&VariableInput::from("120")).is_ok());
        assert!(variable.check(&VariableInput::Number(500.0)).is_ok());
        let breach = variable.check(&VariableInput::from("501")).unwrap_err();
        assert_eq!(breach.max, 500.0);
        assert_eq!(breach.variable_id, VariableId::new(60));
    }

    #[test]
    fn check_rejects_overflowing_values() {
        let variable = Variable {
            id: VariableId::new(60),
            label: "surface".into(),
            scale: Some(Scale {
                min_value: None,
                max_value: Some(500.0),
            }),
        };

        let breach = variable.check(&VariableInput::from("1e999")).unwrap_err();
        assert!(breach.value.is_infinite());
        assert!(variable.check(&VariableInput::Number(f64::INFINITY)).is_err());
        assert!(variable.check(&VariableInput::from("NaN")).is_err());
        assert!(variable.check(&VariableInput::from("urban")).is_ok());
    }

    #[test]
    fn check_passes_without_scale() {
        let variable = Variable {
            id: VariableId::new(1),
            label: String::new(),
            scale: None,
        };
        assert!(variable.check(&VariableInput::Number(1e9)).is_ok());
    }
}
