//! Pure transition function for the questionnaire session.

use std::borrow::Cow;

use crate::event::SessionEvent;
use crate::model::{
    AnswerId, AnswerRecord, AsyncStatus, Session, SessionSubmission, ValueLimit, VariableId,
    VariableValue,
};
use crate::state::SessionState;

/// Applies one event to the state.
///
/// Never fails. A transition that changes nothing hands back the input as
/// `Cow::Borrowed`, so observers can skip work with a pointer check;
/// every real change yields a fresh `Cow::Owned` value and leaves the input intact.
#[must_use]
pub fn reduce<'a>(state: &'a SessionState, event: &SessionEvent) -> Cow<'a, SessionState> {
    match event {
        SessionEvent::SelectAnswer {
            answer_id,
            variable,
        } => select_answer(state, *answer_id, variable.as_ref()),
        SessionEvent::UnselectAnswer {
            answer_id,
            variable_id,
        } => unselect_answer(state, *answer_id, *variable_id),
        SessionEvent::SetSeminarCode { code } => update(state, |next| {
            next.session.seminar_access_code = Some(code.clone());
        }),
        SessionEvent::SetKidMode { is_kid } => update(state, |next| {
            next.session.is_kid = *is_kid;
        }),

        SessionEvent::SubmitSessionRequested => update(state, |next| {
            next.submission.status = AsyncStatus::Pending;
        }),
        SessionEvent::SubmitSessionSucceeded { session_id } => update(state, |next| {
            next.submission.status = AsyncStatus::Fulfilled;
            next.submission.session_id = Some(session_id.clone());
        }),
        SessionEvent::SubmitSessionFailed { error } => update(state, |next| {
            next.submission.status = AsyncStatus::Rejected(error.clone());
        }),

        SessionEvent::ComputeEnergyRequested => update(state, |next| {
            next.energy.status = AsyncStatus::Pending;
        }),
        // Last write wins: nothing ties a completion to the answers it was computed from.
        SessionEvent::ComputeEnergySucceeded { result } => update(state, |next| {
            next.energy.status = AsyncStatus::Fulfilled;
            next.energy.result = Some(result.clone());
        }),
        SessionEvent::ComputeEnergyFailed { error } => update(state, |next| {
            next.energy.status = AsyncStatus::Rejected(error.clone());
        }),

        SessionEvent::ValidateSeminarRequested => update(state, |next| {
            next.seminar.status = AsyncStatus::Pending;
            if let Some(verdict) = next.seminar.verdict.as_mut() {
                verdict.is_valid = false;
            }
        }),
        SessionEvent::ValidateSeminarSucceeded { verdict } => update(state, |next| {
            next.seminar.status = AsyncStatus::Fulfilled;
            next.seminar.verdict = Some(verdict.clone());
        }),
        SessionEvent::ValidateSeminarFailed { error } => update(state, |next| {
            next.seminar.status = AsyncStatus::Rejected(error.clone());
        }),

        SessionEvent::ValueLimitExceeded { breach } => update(state, |next| {
            next.value_limit = ValueLimit::Exceeded(breach.clone());
        }),
        SessionEvent::ValueLimitCleared => update(state, |next| {
            next.value_limit = ValueLimit::Within;
        }),

        // Energy result, seminar verdict and limit flag survive a restart.
        SessionEvent::RestartSession => update(state, |next| {
            next.session = Session::default();
            next.submission = SessionSubmission::default();
        }),

        SessionEvent::Unrecognized => Cow::Borrowed(state),
    }
}

fn update<'a>(state: &'a SessionState, apply: impl FnOnce(&mut SessionState)) -> Cow<'a, SessionState> {
    let mut next = state.clone();
    apply(&mut next);
    if next == *state {
        Cow::Borrowed(state)
    } else {
        Cow::Owned(next)
    }
}

fn select_answer<'a>(
    state: &'a SessionState,
    answer_id: AnswerId,
    variable: Option<&VariableValue>,
) -> Cow<'a, SessionState> {
    let Some(position) = position_of(&state.session, answer_id) else {
        let record = match variable {
            Some(value) => AnswerRecord::with_value(answer_id, value.clone()),
            None => AnswerRecord::new(answer_id),
        };
        let mut next = state.clone();
        next.session.answers.push(record);
        return Cow::Owned(next);
    };

    // Re-selecting without data keeps the record as it is.
    let Some(variable) = variable else {
        return Cow::Borrowed(state);
    };
    let unchanged = state
        .session
        .answers
        .get(position)
        .and_then(|record| record.value_of(variable.variable_id))
        .is_some_and(|current| *current == variable.value);
    if unchanged {
        return Cow::Borrowed(state);
    }

    let mut next = state.clone();
    if let Some(record) = next.session.answers.get_mut(position) {
        match record
            .variable_values
            .iter_mut()
            .find(|v| v.variable_id == variable.variable_id)
        {
            Some(existing) => existing.value = variable.value.clone(),
            None => record.variable_values.push(variable.clone()),
        }
    }
    Cow::Owned(next)
}

fn unselect_answer(
    state: &SessionState,
    answer_id: AnswerId,
    variable_id: Option<VariableId>,
) -> Cow<'_, SessionState> {
    let Some(position) = position_of(&state.session, answer_id) else {
        return Cow::Borrowed(state);
    };

    let Some(variable_id) = variable_id else {
        let mut next = state.clone();
        next.session.answers.remove(position);
        return Cow::Owned(next);
    };

    let has_value = state
        .session
        .answers
        .get(position)
        .is_some_and(|record| record.value_of(variable_id).is_some());
    if !has_value {
        return Cow::Borrowed(state);
    }

    // The record stays even when its last value goes away.
    let mut next = state.clone();
    if let Some(record) = next.session.answers.get_mut(position) {
        record.variable_values.retain(|v| v.variable_id != variable_id);
    }
    Cow::Owned(next)
}

fn position_of(session: &Session, answer_id: AnswerId) -> Option<usize> {
    session.answers.iter().position(|a| a.answer_id == answer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComputationError, SubmissionError, ValueLimitBreach};
    use crate::model::{BreakdownItem, CalculationResult, SeminarVerdict, SessionId, VariableInput};

    fn apply_all(events: &[SessionEvent]) -> SessionState {
        events.iter().fold(SessionState::new(), |state, event| {
            reduce(&state, event).into_owned()
        })
    }

    fn answer(id: u64) -> AnswerId {
        AnswerId::new(id)
    }

    fn value(variable: u64, input: impl Into<VariableInput>) -> VariableValue {
        VariableValue::new(VariableId::new(variable), input)
    }

    fn sample_result(total: f64) -> CalculationResult {
        CalculationResult::new(
            total,
            vec![BreakdownItem {
                question_key: "Heating".into(),
                score: total / 2.0,
            }],
        )
    }

    #[test]
    fn initial_state_is_empty() {
        let state = SessionState::new();
        assert!(state.session.answers.is_empty());
        assert_eq!(state.session.seminar_access_code, None);
        assert_eq!(state.submission.session_id, None);
        assert_eq!(state.submission.status, AsyncStatus::Idle);
        assert_eq!(state.energy.status, AsyncStatus::Idle);
    }

    #[test]
    fn select_appends_new_record() {
        let state = apply_all(&[SessionEvent::select(answer(1))]);
        assert_eq!(state.session.answers, vec![AnswerRecord::new(answer(1))]);
    }

    #[test]
    fn select_with_variable_on_new_record() {
        let state = apply_all(&[SessionEvent::select_with(answer(1), value(1, "urban"))]);
        assert_eq!(state.session.answers.len(), 1);
        assert_eq!(state.session.answers[0].variable_values, vec![value(1, "urban")]);
    }

    #[test]
    fn reselect_without_variable_is_reference_stable() {
        let state = apply_all(&[SessionEvent::select_with(answer(1), value(1, "urban"))]);

        let next = reduce(&state, &SessionEvent::select(answer(1)));

        assert!(matches!(next, Cow::Borrowed(_)));
        assert_eq!(next.session.answers.len(), 1);
        assert_eq!(next.session.answers[0].variable_values, vec![value(1, "urban")]);
    }

    #[test]
    fn variable_upsert_overwrites_by_id() {
        let state = apply_all(&[
            SessionEvent::select_with(answer(1), value(7, 10.0)),
            SessionEvent::select_with(answer(1), value(7, 25.0)),
        ]);

        let values = &state.session.answers[0].variable_values;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], value(7, 25.0));
    }

    #[test]
    fn adding_variable_to_existing_record_keeps_position() {
        let state = apply_all(&[
            SessionEvent::select(answer(1)),
            SessionEvent::select(answer(2)),
            SessionEvent::select_with(answer(1), value(3, "urban")),
            SessionEvent::select_with(answer(1), value(4, 12.0)),
        ]);

        let ids: Vec<_> = state.session.answer_ids().collect();
        assert_eq!(ids, vec![answer(1), answer(2)]);
        assert_eq!(
            state.session.answers[0].variable_values,
            vec![value(3, "urban"), value(4, 12.0)]
        );
    }

    #[test]
    fn repeated_selects_never_duplicate_answers() {
        let state = apply_all(&[
            SessionEvent::select(answer(1)),
            SessionEvent::select(answer(2)),
            SessionEvent::select_with(answer(1), value(1, 5.0)),
            SessionEvent::select(answer(2)),
            SessionEvent::select(answer(1)),
            SessionEvent::select_with(answer(3), value(2, "x")),
            SessionEvent::select_with(answer(3), value(2, "y")),
        ]);

        let mut ids: Vec<_> = state.session.answer_ids().collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 3);
    }

    #[test]
    fn unselect_whole_record_keeps_remaining_order() {
        let state = apply_all(&[
            SessionEvent::select(answer(1)),
            SessionEvent::select(answer(2)),
            SessionEvent::select(answer(3)),
            SessionEvent::unselect(answer(1)),
        ]);

        let ids: Vec<_> = state.session.answer_ids().collect();
        assert_eq!(ids, vec![answer(2), answer(3)]);
    }

    #[test]
    fn select_select_unselect_scenario() {
        let state = apply_all(&[
            SessionEvent::select(answer(1)),
            SessionEvent::select(answer(2)),
            SessionEvent::unselect(answer(1)),
        ]);

        assert_eq!(state.session.answers, vec![AnswerRecord::new(answer(2))]);
    }

    #[test]
    fn unselect_single_variable_keeps_empty_record() {
        let state = apply_all(&[
            SessionEvent::select_with(answer(1), value(9, 3.0)),
            SessionEvent::UnselectAnswer {
                answer_id: answer(1),
                variable_id: Some(VariableId::new(9)),
            },
        ]);

        assert_eq!(state.session.answers, vec![AnswerRecord::new(answer(1))]);
    }

    #[test]
    fn unselect_absent_variable_is_reference_stable() {
        let state = apply_all(&[SessionEvent::select_with(answer(1), value(9, 3.0))]);

        let next = reduce(
            &state,
            &SessionEvent::UnselectAnswer {
                answer_id: answer(1),
                variable_id: Some(VariableId::new(4)),
            },
        );

        assert!(matches!(next, Cow::Borrowed(_)));
        assert_eq!(next.session.answers[0].variable_values, vec![value(9, 3.0)]);
    }

    #[test]
    fn unselect_missing_answer_is_noop() {
        let state = apply_all(&[SessionEvent::select(answer(1))]);
        let next = reduce(&state, &SessionEvent::unselect(answer(5)));
        assert!(matches!(next, Cow::Borrowed(_)));
    }

    #[test]
    fn select_does_not_mutate_input() {
        let state = SessionState::new();
        let snapshot = state.clone();

        let next = reduce(&state, &SessionEvent::select(answer(1)));

        assert_eq!(state, snapshot);
        assert!(matches!(next, Cow::Owned(_)));
    }

    #[test]
    fn seminar_code_is_stored_verbatim() {
        let state = apply_all(&[SessionEvent::SetSeminarCode {
            code: "SEMINAR2024".into(),
        }]);
        assert_eq!(state.session.seminar_access_code.as_deref(), Some("SEMINAR2024"));
    }

    #[test]
    fn submission_workflow_stores_session_id() {
        let state = apply_all(&[
            SessionEvent::SubmitSessionRequested,
            SessionEvent::SubmitSessionSucceeded {
                session_id: SessionId::new("abc-123"),
            },
        ]);

        assert_eq!(state.submission.status, AsyncStatus::Fulfilled);
        assert_eq!(state.submission.session_id, Some(SessionId::new("abc-123")));
    }

    #[test]
    fn failed_submission_leaves_session_untouched() {
        let before = apply_all(&[SessionEvent::select(answer(1)), SessionEvent::SubmitSessionRequested]);

        let after = reduce(
            &before,
            &SessionEvent::SubmitSessionFailed {
                error: SubmissionError::new("timeout"),
            },
        );

        assert_eq!(after.session, before.session);
        assert_eq!(
            after.submission.status.error(),
            Some(&SubmissionError::new("timeout"))
        );
    }

    #[test]
    fn energy_workflow_stores_result() {
        let state = apply_all(&[
            SessionEvent::ComputeEnergyRequested,
            SessionEvent::ComputeEnergySucceeded {
                result: sample_result(100.0),
            },
        ]);

        assert!(state.energy.status.is_fulfilled());
        assert_eq!(state.energy.result, Some(sample_result(100.0)));
    }

    #[test]
    fn failed_computation_keeps_last_result() {
        let state = apply_all(&[
            SessionEvent::ComputeEnergySucceeded {
                result: sample_result(80.0),
            },
            SessionEvent::ComputeEnergyRequested,
            SessionEvent::ComputeEnergyFailed {
                error: ComputationError::new("503"),
            },
        ]);

        assert_eq!(state.energy.result, Some(sample_result(80.0)));
        assert!(state.energy.status.error().is_some());
    }

    #[test]
    fn late_completion_overwrites_newer_result() {
        let state = apply_all(&[
            SessionEvent::ComputeEnergyRequested,
            SessionEvent::ComputeEnergyRequested,
            SessionEvent::ComputeEnergySucceeded {
                result: sample_result(120.0),
            },
            SessionEvent::ComputeEnergySucceeded {
                result: sample_result(90.0),
            },
        ]);

        assert_eq!(state.energy.result, Some(sample_result(90.0)));
    }

    #[test]
    fn restart_clears_session_but_not_energy_result() {
        let state = apply_all(&[
            SessionEvent::select(answer(1)),
            SessionEvent::SetSeminarCode { code: "S1".into() },
            SessionEvent::SubmitSessionSucceeded {
                session_id: SessionId::new("abc"),
            },
            SessionEvent::ComputeEnergySucceeded {
                result: sample_result(42.0),
            },
            SessionEvent::RestartSession,
        ]);

        assert!(state.session.answers.is_empty());
        assert_eq!(state.session.seminar_access_code, None);
        assert_eq!(state.submission.session_id, None);
        assert_eq!(state.energy.result, Some(sample_result(42.0)));
    }

    #[test]
    fn restart_keeps_seminar_verdict() {
        let state = apply_all(&[
            SessionEvent::ValidateSeminarRequested,
            SessionEvent::ValidateSeminarSucceeded {
                verdict: SeminarVerdict {
                    is_valid: true,
                    is_open: Some(true),
                    seminar_status: Some("OPEN".into()),
                },
            },
            SessionEvent::RestartSession,
        ]);
        assert!(state.seminar.is_code_valid());
    }

    #[test]
    fn seminar_request_invalidates_previous_verdict() {
        let state = apply_all(&[
            SessionEvent::ValidateSeminarSucceeded {
                verdict: SeminarVerdict {
                    is_valid: true,
                    is_open: Some(true),
                    seminar_status: None,
                },
            },
            SessionEvent::ValidateSeminarRequested,
        ]);

        assert!(state.seminar.status.is_pending());
        assert!(!state.seminar.is_code_valid());
        assert_eq!(state.seminar.verdict.as_ref().and_then(|v| v.is_open), Some(true));
    }

    #[test]
    fn value_limit_flag_toggles() {
        let breach = ValueLimitBreach {
            variable_id: VariableId::new(1),
            value: 600.0,
            max: 500.0,
        };
        let raised = apply_all(&[SessionEvent::ValueLimitExceeded { breach }]);
        assert!(raised.value_limit.is_exceeded());

        let cleared = reduce(&raised, &SessionEvent::ValueLimitCleared);
        assert!(!cleared.value_limit.is_exceeded());
        let again = reduce(&cleared, &SessionEvent::ValueLimitCleared);
        assert!(matches!(again, Cow::Borrowed(_)));
    }

    #[test]
    fn kid_mode_is_part_of_session() {
        let state = apply_all(&[SessionEvent::SetKidMode { is_kid: true }]);
        assert!(state.session.is_kid);
    }

    #[test]
    fn unrecognized_event_is_noop() {
        let state = apply_all(&[SessionEvent::select(answer(1))]);
        let next = reduce(&state, &SessionEvent::Unrecognized);
        assert!(matches!(next, Cow::Borrowed(_)));
    }
}
