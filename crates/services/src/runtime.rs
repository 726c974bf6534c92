use tokio::sync::{mpsc, watch};

use e4l_core::{SessionEvent, SessionState};

use crate::store::SessionStore;

/// Cloneable handle for posting events from background tasks.
#[derive(Clone, Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventQueue {
    /// Queue an event for the runtime. Dropped with a warning once the runtime is gone.
    pub fn post(&self, event: SessionEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::warn!(event = kind, "session runtime is closed, dropping event");
        }
    }
}

/// Serializes every event through a single store.
///
/// Direct dispatches and queued completions go through the same path in
/// arrival order, so the reducer never sees two events at once.
pub struct SessionRuntime {
    store: SessionStore,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionRuntime {
    #[must_use]
    pub fn new(store: SessionStore) -> (Self, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { store, rx }, EventQueue { tx })
    }

    /// Apply queued events first, then `event`. Returns whether `event` changed the state.
    pub async fn dispatch(&mut self, event: SessionEvent) -> bool {
        self.drain().await;
        self.store.dispatch(&event).await
    }

    /// Apply everything already queued without waiting. Returns how many events ran.
    pub async fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.store.dispatch(&event).await;
            applied += 1;
        }
        applied
    }

    /// Apply queued events until every `EventQueue` handle is dropped.
    pub async fn run(mut self) -> SessionStore {
        while let Some(event) = self.rx.recv().await {
            self.store.dispatch(&event).await;
        }
        tracing::debug!("session runtime stopped");
        self.store
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        self.store.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use e4l_core::model::{AnswerId, SessionId};
    use e4l_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    async fn runtime() -> (SessionRuntime, EventQueue) {
        let store = SessionStore::open(Arc::new(InMemoryRepository::new()), fixed_clock()).await;
        SessionRuntime::new(store)
    }

    #[tokio::test]
    async fn queued_events_apply_before_direct_ones() {
        let (mut runtime, queue) = runtime().await;
        queue.post(SessionEvent::select(AnswerId::new(1)));

        assert!(runtime.dispatch(SessionEvent::unselect(AnswerId::new(1))).await);
        assert!(runtime.state().session.is_empty());
    }

    #[tokio::test]
    async fn drain_counts_applied_events() {
        let (mut runtime, queue) = runtime().await;
        queue.post(SessionEvent::SubmitSessionRequested);
        queue.post(SessionEvent::SubmitSessionSucceeded {
            session_id: SessionId::new("s-1"),
        });

        assert_eq!(runtime.drain().await, 2);
        assert_eq!(runtime.drain().await, 0);
        assert_eq!(
            runtime.state().submission.session_id,
            Some(SessionId::new("s-1"))
        );
    }

    #[tokio::test]
    async fn run_stops_when_queues_close() {
        let (runtime, queue) = runtime().await;
        let handle = tokio::spawn(runtime.run());

        queue.post(SessionEvent::select(AnswerId::new(3)));
        drop(queue);

        let store = handle.await.unwrap();
        assert!(store.state().session.is_selected(AnswerId::new(3)));
    }
}
