use std::sync::Arc;

use crate::config::Config;
use crate::db::change_feed::ChangeFeed;
use crate::db::connection::DbPool;
use crate::repositories::RequestRepositoryTrait;
use crate::services::ReviewOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub feed: ChangeFeed,
    pub requests: Arc<dyn RequestRepositoryTrait>,
    pub orchestrator: ReviewOrchestrator,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: Config,
        feed: ChangeFeed,
        requests: Arc<dyn RequestRepositoryTrait>,
        orchestrator: ReviewOrchestrator,
    ) -> Self {
        Self {
            pool,
            config,
            feed,
            requests,
            orchestrator,
        }
    }
}
