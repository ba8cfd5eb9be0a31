use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::document_store::DocumentStore, error::ServiceError,
    services::match_service::MatchService,
};

pub type SharedState = Arc<AppState>;

/// Process-wide state: the installed storage backend, the loaded configuration and the
/// degraded flag.
pub struct AppState {
    document_store: RwLock<Option<Arc<dyn DocumentStore>>>,
    config: Arc<AppConfig>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            document_store: RwLock::new(None),
            config: Arc::new(config),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current document store, if one is installed.
    pub async fn document_store(&self) -> Option<Arc<dyn DocumentStore>> {
        let guard = self.document_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new document store implementation and leave degraded mode.
    pub async fn install_document_store(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.document_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current document store and enter degraded mode.
    pub async fn clear_document_store(&self) {
        {
            let mut guard = self.document_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Record the degraded flag; subscribers are only woken when it changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Return the installed store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_document_store(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.document_store().await.ok_or(ServiceError::Degraded)
    }

    /// Build a [`MatchService`] over the installed store.
    pub async fn match_service(&self) -> Result<MatchService, ServiceError> {
        let store = self.require_document_store().await?;
        Ok(MatchService::new(store, Arc::clone(&self.config)))
    }
}
