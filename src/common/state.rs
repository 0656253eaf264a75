use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::sync::ListenerState;

#[derive(Clone)]
pub struct AppState {
    /// Shared with the sync worker.
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    /// Live state of the Firebase sync listener, reported by `/healthz`.
    pub sync_status: watch::Receiver<ListenerState>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Config,
        sync_status: watch::Receiver<ListenerState>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            sync_status,
        }
    }
}
