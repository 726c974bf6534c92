use crate::model::{EnergyComputation, SeminarValidation, Session, SessionSubmission, ValueLimit};

/// Snapshot observed by the UI after every transition.
///
/// `session` is the only part that gets persisted; the async slices always
/// start idle on reload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub session: Session,
    pub submission: SessionSubmission,
    pub energy: EnergyComputation,
    pub seminar: SeminarValidation,
    pub value_limit: ValueLimit,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a session document read back from persistence.
    #[must_use]
    pub fn rehydrated(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }
}
