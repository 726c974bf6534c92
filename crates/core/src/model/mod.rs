mod calculation;
mod ids;
mod questionnaire;
mod session;
mod status;

pub use calculation::{BreakdownItem, CalculationResult};
pub use ids::{AnswerId, ParseIdError, QuestionId, SessionId, VariableId};
pub use questionnaire::{PossibleAnswer, Question, Questionnaire, Scale, Variable};
pub use session::{AnswerRecord, Session, VariableInput, VariableValue};
pub use status::{
    AsyncStatus, EnergyComputation, SeminarValidation, SeminarVerdict, SessionSubmission,
    ValueLimit,
};
