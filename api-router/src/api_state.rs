use std::sync::Arc;

use common::{storage::db::SurrealDbClient, utils::config::AppConfig};
use import_pipeline::ImportDispatcher;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub importer: ImportDispatcher,
}

impl ApiState {
    pub fn new(db: Arc<SurrealDbClient>, config: AppConfig, importer: ImportDispatcher) -> Self {
        Self {
            db,
            config,
            importer,
        }
    }
}
