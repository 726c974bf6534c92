use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{SessionDocument, SessionDocumentRepository, StorageError};

/// Row key of the session currently being filled in.
const CURRENT_KEY: &str = "current";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl SessionDocumentRepository for SqliteRepository {
    async fn load_session(&self) -> Result<Option<SessionDocument>, StorageError> {
        let row = sqlx::query("SELECT body, saved_at FROM session_documents WHERE key = ?1")
            .bind(CURRENT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body: String = row.try_get("body").map_err(ser)?;
        let saved_at: DateTime<Utc> = row.try_get("saved_at").map_err(ser)?;
        SessionDocument::decode(&body, saved_at).map(Some)
    }

    async fn save_session(&self, document: &SessionDocument) -> Result<(), StorageError> {
        let body = document.encode_body()?;
        sqlx::query(
            r"
            INSERT INTO session_documents (key, body, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                saved_at = excluded.saved_at
            ",
        )
        .bind(CURRENT_KEY)
        .bind(body)
        .bind(document.saved_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_documents WHERE key = ?1")
            .bind(CURRENT_KEY)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
