use std::sync::Arc;

use crate::{config::Config, database::Database, repository::PgInventoryStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> PgInventoryStore {
        PgInventoryStore::new(self.db.clone())
    }
}
