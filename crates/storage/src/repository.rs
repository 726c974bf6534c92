use async_trait::async_trait;
use chrono::{DateTime, Utc};
use e4l_core::model::Session;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of the questionnaire session.
///
/// Only the session itself is stored; submission, computation and seminar
/// flags are rebuilt as idle on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDocument {
    pub session: Session,
    pub saved_at: DateTime<Utc>,
}

impl SessionDocument {
    #[must_use]
    pub fn new(session: Session, saved_at: DateTime<Utc>) -> Self {
        Self { session, saved_at }
    }

    /// Serialize the session body for storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the session cannot be encoded.
    pub fn encode_body(&self) -> Result<String, StorageError> {
        serde_json::to_string(&self.session)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Rebuild a document from a stored body.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the body is not a valid session.
    pub fn decode(body: &str, saved_at: DateTime<Utc>) -> Result<Self, StorageError> {
        let session = serde_json::from_str(body)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Self { session, saved_at })
    }
}

/// Repository contract for the single current session document.
#[async_trait]
pub trait SessionDocumentRepository: Send + Sync {
    /// Read the stored document, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the document is unreadable.
    async fn load_session(&self) -> Result<Option<SessionDocument>, StorageError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be stored.
    async fn save_session(&self, document: &SessionDocument) -> Result<(), StorageError>;

    /// Remove the stored document. Missing documents are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn clear_session(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Stores the encoded body so round trips exercise serialization like the
/// real adapters do.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    body: Arc<Mutex<Option<(String, DateTime<Utc>)>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw body, as left behind by an older or corrupted client.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, body: impl Into<String>, saved_at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut guard = self
            .body
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some((body.into(), saved_at));
        Ok(())
    }
}

#[async_trait]
impl SessionDocumentRepository for InMemoryRepository {
    async fn load_session(&self) -> Result<Option<SessionDocument>, StorageError> {
        let guard = self
            .body
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .as_ref()
            .map(|(body, saved_at)| SessionDocument::decode(body, *saved_at))
            .transpose()
    }

    async fn save_session(&self, document: &SessionDocument) -> Result<(), StorageError> {
        let body = document.encode_body()?;
        let mut guard = self
            .body
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some((body, document.saved_at));
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        let mut guard = self
            .body
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.take();
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionDocumentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let sessions: Arc<dyn SessionDocumentRepository> = Arc::new(InMemoryRepository::new());
        Self { sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e4l_core::model::{AnswerId, AnswerRecord, VariableId, VariableValue};
    use e4l_core::time::fixed_now;

    fn sample_session() -> Session {
        Session {
            seminar_access_code: Some("SEM-1".into()),
            answers: vec![
                AnswerRecord::new(AnswerId::new(5)),
                AnswerRecord::with_value(
                    AnswerId::new(28),
                    VariableValue::new(VariableId::new(3), 40.0),
                ),
            ],
            is_kid: true,
        }
    }

    #[tokio::test]
    async fn round_trips_session_document() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_session().await.unwrap().is_none());

        let document = SessionDocument::new(sample_session(), fixed_now());
        repo.save_session(&document).await.unwrap();

        let loaded = repo.load_session().await.unwrap().unwrap();
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn clear_removes_document() {
        let repo = InMemoryRepository::new();
        repo.save_session(&SessionDocument::new(sample_session(), fixed_now()))
            .await
            .unwrap();

        repo.clear_session().await.unwrap();
        repo.clear_session().await.unwrap();

        assert!(repo.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_body_is_a_serialization_error() {
        let repo = InMemoryRepository::new();
        repo.put_raw("{not json", fixed_now()).unwrap();

        let err = repo.load_session().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
