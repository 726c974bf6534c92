use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::flow::QuestionnaireFlow;
use crate::runtime::SessionRuntime;
use crate::store::SessionStore;
use crate::transport::{ApiConfig, HttpTransport, QuestionnaireTransport};

/// Assembles storage, transport and the questionnaire flow for a binary.
pub struct AppServices {
    flow: QuestionnaireFlow,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the API
    /// configuration is unusable.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        api: &ApiConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let transport: Arc<dyn QuestionnaireTransport> = Arc::new(HttpTransport::new(api)?);
        Ok(Self::assemble(storage, clock, transport).await)
    }

    /// Build services over an existing storage and transport.
    pub async fn assemble(
        storage: Storage,
        clock: Clock,
        transport: Arc<dyn QuestionnaireTransport>,
    ) -> Self {
        let store = SessionStore::open(Arc::clone(&storage.sessions), clock).await;
        let (runtime, queue) = SessionRuntime::new(store);
        let flow = QuestionnaireFlow::new(runtime, queue, transport);
        Self { flow }
    }

    #[must_use]
    pub fn into_flow(self) -> QuestionnaireFlow {
        self.flow
    }
}
