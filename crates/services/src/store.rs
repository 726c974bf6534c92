use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::watch;

use e4l_core::model::Session;
use e4l_core::{Clock, SessionEvent, SessionState, reduce};
use storage::repository::{SessionDocument, SessionDocumentRepository};

/// Holds the current `SessionState` and persists the session slice after changes.
///
/// Observers subscribe through a `watch` channel and only hear about
/// transitions that produced a new state.
pub struct SessionStore {
    state: SessionState,
    documents: Arc<dyn SessionDocumentRepository>,
    clock: Clock,
    observers: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Rehydrate from the stored document.
    ///
    /// A missing or unreadable document starts an empty session.
    pub async fn open(documents: Arc<dyn SessionDocumentRepository>, clock: Clock) -> Self {
        let session = match documents.load_session().await {
            Ok(Some(document)) => {
                tracing::debug!(
                    answers = document.session.answers.len(),
                    saved_at = %document.saved_at,
                    "rehydrated session"
                );
                document.session
            }
            Ok(None) => Session::new(),
            Err(err) => {
                tracing::warn!(error = %err, "stored session is unreadable, starting empty");
                Session::new()
            }
        };
        Self::with_state(SessionState::rehydrated(session), documents, clock)
    }

    /// Start from an explicit state without reading storage.
    #[must_use]
    pub fn with_state(
        state: SessionState,
        documents: Arc<dyn SessionDocumentRepository>,
        clock: Clock,
    ) -> Self {
        let (observers, _) = watch::channel(state.clone());
        Self {
            state,
            documents,
            clock,
            observers,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.observers.subscribe()
    }

    /// Apply one event. Returns `true` when the state changed.
    ///
    /// Persistence failures are logged and do not roll the transition back.
    pub async fn dispatch(&mut self, event: &SessionEvent) -> bool {
        let next = match reduce(&self.state, event) {
            Cow::Borrowed(_) => {
                tracing::trace!(event = event.kind(), "no-op event");
                return false;
            }
            Cow::Owned(next) => next,
        };

        let session_changed = next.session != self.state.session;
        self.state = next;
        tracing::debug!(event = event.kind(), session_changed, "applied event");
        self.observers.send_replace(self.state.clone());

        if session_changed {
            self.persist().await;
        }
        true
    }

    async fn persist(&self) {
        let document = SessionDocument::new(self.state.session.clone(), self.clock.now());
        if let Err(err) = self.documents.save_session(&document).await {
            tracing::warn!(error = %err, "failed to persist session");
        }
    }
}
