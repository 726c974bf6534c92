//! Questionnaire orchestration: user actions, recomputation and submission.
//!
//! Every async round trip follows the same shape. The `*Requested` event is
//! applied immediately, a task calls the transport, and its outcome is posted
//! back into the runtime queue as `*Succeeded` or `*Failed`.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use e4l_core::eligibility::{self, EligibilityReport};
use e4l_core::model::{AnswerId, Questionnaire, VariableId, VariableInput, VariableValue};
use e4l_core::{
    ComputationError, SeminarValidationError, SessionEvent, SessionState, SubmissionError,
};

use crate::error::FlowError;
use crate::runtime::{EventQueue, SessionRuntime};
use crate::transport::QuestionnaireTransport;

pub struct QuestionnaireFlow {
    runtime: SessionRuntime,
    queue: EventQueue,
    transport: Arc<dyn QuestionnaireTransport>,
    catalog: Option<Questionnaire>,
    in_flight: Vec<JoinHandle<()>>,
}

impl QuestionnaireFlow {
    #[must_use]
    pub fn new(
        runtime: SessionRuntime,
        queue: EventQueue,
        transport: Arc<dyn QuestionnaireTransport>,
    ) -> Self {
        Self {
            runtime,
            queue,
            transport,
            catalog: None,
            in_flight: Vec::new(),
        }
    }

    /// Use an already known catalog instead of fetching one.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Questionnaire) -> Self {
        self.catalog = Some(catalog);
        self
    }

    // ─── Catalog ───────────────────────────────────────────────────────────────

    /// Fetch the catalog on first use and record the kid flag on the session.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Transport` when the catalog cannot be fetched.
    pub async fn load(&mut self, kid: bool) -> Result<&Questionnaire, FlowError> {
        if self.catalog.is_none() {
            let catalog = self.transport.fetch_questionnaire(kid).await?;
            tracing::info!(questions = catalog.len(), kid, "questionnaire loaded");
            self.catalog = Some(catalog);
        }
        self.runtime
            .dispatch(SessionEvent::SetKidMode { is_kid: kid })
            .await;
        self.catalog().ok_or(FlowError::CatalogNotLoaded)
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&Questionnaire> {
        self.catalog.as_ref()
    }

    fn require_catalog(&self) -> Result<&Questionnaire, FlowError> {
        self.catalog.as_ref().ok_or(FlowError::CatalogNotLoaded)
    }

    // ─── Answers ───────────────────────────────────────────────────────────────

    /// Select an answer, swapping out the previous choice on single-choice
    /// questions, and recompute the energy result.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::CatalogNotLoaded` or `FlowError::UnknownAnswer`.
    pub async fn choose(&mut self, answer_id: AnswerId) -> Result<(), FlowError> {
        let siblings = self.selected_siblings(answer_id)?;
        let mut changed = false;
        for sibling in siblings {
            changed |= self.runtime.dispatch(SessionEvent::unselect(sibling)).await;
        }
        changed |= self.runtime.dispatch(SessionEvent::select(answer_id)).await;
        if changed {
            self.compute_energy().await;
        }
        Ok(())
    }

    /// Remove an answer and recompute.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::CatalogNotLoaded` or `FlowError::UnknownAnswer`.
    pub async fn unchoose(&mut self, answer_id: AnswerId) -> Result<(), FlowError> {
        let catalog = self.require_catalog()?;
        if catalog.question_for_answer(answer_id).is_none() {
            return Err(FlowError::UnknownAnswer(answer_id));
        }
        if self.runtime.dispatch(SessionEvent::unselect(answer_id)).await {
            self.compute_energy().await;
        }
        Ok(())
    }

    /// Record a variable input for an answer.
    ///
    /// A value above the declared maximum only raises the limit flag. Blank
    /// or zero input removes the whole answer. Anything else selects the
    /// answer with the value and recomputes.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::CatalogNotLoaded`, `FlowError::UnknownAnswer` or
    /// `FlowError::UnknownVariable`.
    pub async fn set_variable(
        &mut self,
        answer_id: AnswerId,
        variable_id: VariableId,
        input: VariableInput,
    ) -> Result<(), FlowError> {
        let catalog = self.require_catalog()?;
        let variable = catalog
            .question_for_answer(answer_id)
            .and_then(|question| question.possible_answer(answer_id))
            .ok_or(FlowError::UnknownAnswer(answer_id))?
            .variable(variable_id)
            .ok_or(FlowError::UnknownVariable {
                answer_id,
                variable_id,
            })?
            .clone();

        if let Err(breach) = variable.check(&input) {
            tracing::debug!(%answer_id, %variable_id, %breach, "value above limit");
            self.runtime
                .dispatch(SessionEvent::ValueLimitExceeded { breach })
                .await;
            return Ok(());
        }
        let value = match (variable.scale.is_some(), input.as_number()) {
            (true, Some(number)) => VariableInput::Number(number),
            _ => input,
        };
        self.runtime.dispatch(SessionEvent::ValueLimitCleared).await;

        let changed = if value.is_blank_or_zero() {
            self.runtime.dispatch(SessionEvent::unselect(answer_id)).await
        } else {
            let siblings = self.selected_siblings(answer_id)?;
            let mut changed = false;
            for sibling in siblings {
                changed |= self.runtime.dispatch(SessionEvent::unselect(sibling)).await;
            }
            changed
                | self
                    .runtime
                    .dispatch(SessionEvent::select_with(
                        answer_id,
                        VariableValue::new(variable_id, value),
                    ))
                    .await
        };
        if changed {
            self.compute_energy().await;
        }
        Ok(())
    }

    /// Other selected answers of the same single-choice question.
    fn selected_siblings(&self, answer_id: AnswerId) -> Result<Vec<AnswerId>, FlowError> {
        let question = self
            .require_catalog()?
            .question_for_answer(answer_id)
            .ok_or(FlowError::UnknownAnswer(answer_id))?;
        if !question.is_single_choice() {
            return Ok(Vec::new());
        }
        Ok(self
            .runtime
            .state()
            .session
            .answer_ids()
            .filter(|id| *id != answer_id && question.offers(*id))
            .collect())
    }

    pub async fn set_seminar_code(&mut self, code: impl Into<String>) -> bool {
        self.runtime
            .dispatch(SessionEvent::SetSeminarCode { code: code.into() })
            .await
    }

    /// Start over with an empty session. The last energy result stays visible.
    pub async fn restart(&mut self) -> bool {
        self.runtime.dispatch(SessionEvent::RestartSession).await
    }

    // ─── Backend round trips ───────────────────────────────────────────────────

    /// Ask the backend to score the current answers.
    pub async fn compute_energy(&mut self) {
        self.runtime
            .dispatch(SessionEvent::ComputeEnergyRequested)
            .await;
        let session = self.runtime.state().session.clone();
        let transport = Arc::clone(&self.transport);
        self.spawn(async move {
            match transport.compute_energy(&session).await {
                Ok(result) => SessionEvent::ComputeEnergySucceeded { result },
                Err(err) => {
                    tracing::warn!(error = %err, "energy computation failed");
                    SessionEvent::ComputeEnergyFailed {
                        error: ComputationError::with_detail(err.to_string(), err.detail()),
                    }
                }
            }
        });
    }

    /// Send the session, then validate the seminar code when one is set.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::CatalogNotLoaded`, or `FlowError::NotEligible` when
    /// the last question is not complete.
    pub async fn submit(&mut self) -> Result<(), FlowError> {
        let last = self.require_catalog()?.len().saturating_sub(1);
        if !self.can_advance(last) {
            return Err(FlowError::NotEligible {
                question_index: last,
            });
        }

        self.runtime
            .dispatch(SessionEvent::SubmitSessionRequested)
            .await;
        let session = self.runtime.state().session.clone();
        tracing::info!(
            answers = session.answers.len(),
            seminar = session.seminar_access_code.is_some(),
            "submitting session"
        );

        let code = session
            .seminar_access_code
            .clone()
            .filter(|code| !code.trim().is_empty());

        let transport = Arc::clone(&self.transport);
        self.spawn(async move {
            match transport.send_session(&session).await {
                Ok(session_id) => {
                    tracing::info!(%session_id, "session stored");
                    SessionEvent::SubmitSessionSucceeded { session_id }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "session submission failed");
                    SessionEvent::SubmitSessionFailed {
                        error: SubmissionError::with_detail(err.to_string(), err.detail()),
                    }
                }
            }
        });

        if let Some(code) = code {
            self.runtime
                .dispatch(SessionEvent::ValidateSeminarRequested)
                .await;
            let transport = Arc::clone(&self.transport);
            self.spawn(async move {
                match transport.validate_seminar_code(&code).await {
                    Ok(verdict) => SessionEvent::ValidateSeminarSucceeded { verdict },
                    Err(err) => {
                        tracing::warn!(error = %err, "seminar validation failed");
                        SessionEvent::ValidateSeminarFailed {
                            error: SeminarValidationError::with_detail(err.to_string(), err.detail()),
                        }
                    }
                }
            });
        }
        Ok(())
    }

    /// Reload the result of the submitted session into the energy slice.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::NotSubmitted` before a submission succeeded.
    pub async fn fetch_submitted_result(&mut self) -> Result<(), FlowError> {
        self.runtime.drain().await;
        let session_id = self
            .runtime
            .state()
            .submission
            .session_id
            .clone()
            .ok_or(FlowError::NotSubmitted)?;

        self.runtime
            .dispatch(SessionEvent::ComputeEnergyRequested)
            .await;
        let transport = Arc::clone(&self.transport);
        self.spawn(async move {
            match transport.fetch_result(&session_id).await {
                Ok(result) => SessionEvent::ComputeEnergySucceeded { result },
                Err(err) => {
                    tracing::warn!(%session_id, error = %err, "result fetch failed");
                    SessionEvent::ComputeEnergyFailed {
                        error: ComputationError::with_detail(err.to_string(), err.detail()),
                    }
                }
            }
        });
        Ok(())
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        self.in_flight.retain(|handle| !handle.is_finished());
        let queue = self.queue.clone();
        self.in_flight.push(tokio::spawn(async move {
            queue.post(task.await);
        }));
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    /// Whether the question at `question_index` may be left. False without a catalog.
    #[must_use]
    pub fn can_advance(&self, question_index: usize) -> bool {
        self.catalog.as_ref().is_some_and(|catalog| {
            eligibility::can_advance(self.runtime.state(), catalog, question_index)
        })
    }

    #[must_use]
    pub fn eligibility(&self, question_index: usize) -> Option<EligibilityReport> {
        let catalog = self.catalog.as_ref()?;
        let state = self.runtime.state();
        Some(eligibility::evaluate(
            &state.session.answers,
            catalog.question(question_index),
            &state.value_limit,
        ))
    }

    /// Wait for in-flight round trips and apply their completions.
    pub async fn settle(&mut self) {
        for handle in std::mem::take(&mut self.in_flight) {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "transport task aborted");
            }
        }
        self.runtime.drain().await;
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        self.runtime.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.runtime.subscribe()
    }
}
