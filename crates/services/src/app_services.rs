use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::access_service::AccessService;
use crate::ai::{AiClient, AiConfig, ErrorExplainer};
use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::ranking_service::RankingService;
use crate::sessions::SessionLoopService;

/// Runtime settings shared by every front end.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub admin_email: Option<String>,
    pub ai: Option<AiConfig>,
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    session_loop: Arc<SessionLoopService>,
    content: Arc<ContentService>,
    access: Arc<AccessService>,
    ranking: Arc<RankingService>,
    ai: Arc<AiClient>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: AppConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Wire every service over an existing storage bundle.
    ///
    /// Wrong-answer explanations are enabled only when the AI gateway is configured.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: AppConfig) -> Self {
        let ai = Arc::new(AiClient::new(config.ai));

        let mut session_loop = SessionLoopService::new(clock, storage);
        if ai.enabled() {
            let explainer: Arc<dyn ErrorExplainer> = Arc::<AiClient>::clone(&ai);
            session_loop = session_loop.with_explainer(explainer);
        }

        Self {
            session_loop: Arc::new(session_loop),
            content: Arc::new(ContentService::new(clock, storage)),
            access: Arc::new(AccessService::new(config.admin_email.as_deref(), storage)),
            ranking: Arc::new(RankingService::new(Arc::clone(&storage.students))),
            ai,
        }
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn access(&self) -> Arc<AccessService> {
        Arc::clone(&self.access)
    }

    #[must_use]
    pub fn ranking(&self) -> Arc<RankingService> {
        Arc::clone(&self.ranking)
    }

    #[must_use]
    pub fn ai(&self) -> Arc<AiClient> {
        Arc::clone(&self.ai)
    }
}
