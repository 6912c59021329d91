use std::sync::Arc;

use solver_heur::HeurPlacer;
use store::{BuildLocks, InMemStore};
use tracing::info;

use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemStore>,
    pub placer: Arc<HeurPlacer>,
    /// `None` when per-class build locking is disabled.
    pub locks: Option<BuildLocks>,
}

impl AppState {
    pub fn new(store: InMemStore, settings: &Settings) -> Self {
        Self {
            store: Arc::new(store),
            placer: Arc::new(HeurPlacer::with_max_attempts(settings.max_attempts)),
            locks: settings.locking.then(BuildLocks::new),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = match &settings.data_path {
            Some(path) => InMemStore::from_path(path)?,
            None => {
                info!("no data path configured, starting with an empty store");
                InMemStore::new()
            }
        };
        Ok(Self::new(store, settings))
    }
}
