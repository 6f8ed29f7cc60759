use std::sync::Arc;

use crate::config::Config;
use crate::directory::{DepartmentForest, DirectoryStore};
use crate::error::AppResult;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Data-access layer
    pub store: Arc<dyn DirectoryStore>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<dyn DirectoryStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Build a fresh department forest from the current rows
    pub async fn forest(&self) -> AppResult<DepartmentForest> {
        let rows = self.store.departments().await?;
        Ok(DepartmentForest::build(&rows))
    }
}
