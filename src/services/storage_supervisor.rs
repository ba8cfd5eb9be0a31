use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::{document_store::DocumentStore, storage::StorageError},
    state::SharedState,
};

/// Backoff and polling cadence of [`run`].
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTiming {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub health_poll_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            health_poll_interval: Duration::from_secs(5),
            max_reconnect_attempts: 3,
        }
    }
}

/// Connect to the storage backend and keep the shared state degraded while it is unreachable.
pub async fn run<F, Fut>(state: SharedState, connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DocumentStore>, StorageError>> + Send,
{
    run_with_timing(state, connect, SupervisorTiming::default()).await
}

/// [`run`] with explicit timings.
pub async fn run_with_timing<F, Fut>(state: SharedState, mut connect: F, timing: SupervisorTiming)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DocumentStore>, StorageError>> + Send,
{
    let mut delay = timing.initial_delay;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_document_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = timing.initial_delay;

                watch_health(&state, store.as_ref(), &timing).await;
                warn!("exhausted storage reconnect attempts; staying in degraded mode");
            }
            Err(err) => warn!(error = %err, "storage connection attempt failed"),
        }

        sleep(delay).await;
        delay = (delay * 2).min(timing.max_delay);
    }
}

/// Poll the store until it fails and cannot be reconnected.
async fn watch_health(state: &SharedState, store: &dyn DocumentStore, timing: &SupervisorTiming) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                debug!("storage health check passed");
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !reconnect(state, store, timing).await {
                    return;
                }
                state.update_degraded(false);
            }
        }
        sleep(timing.health_poll_interval).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn DocumentStore, timing: &SupervisorTiming) -> bool {
    let mut reconnect_delay = timing.initial_delay;

    for attempt in 0..timing.max_reconnect_attempts {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) if attempt == 0 => {
                warn!(
                    attempt, error = %err,
                    "storage reconnect first attempt failed; entering degraded mode"
                );
                state.update_degraded(true);
            }
            Err(err) => warn!(attempt, error = %err, "storage reconnect attempt failed"),
        }
        sleep(reconnect_delay).await;
        reconnect_delay = (reconnect_delay * 2).min(timing.max_delay);
    }

    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState,
    };

    fn fast() -> SupervisorTiming {
        SupervisorTiming {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            health_poll_interval: Duration::from_millis(5),
            max_reconnect_attempts: 2,
        }
    }

    async fn wait_for(state: &SharedState, degraded: bool) {
        let mut watcher = state.degraded_watcher();
        timeout(Duration::from_secs(2), watcher.wait_for(|value| *value == degraded))
            .await
            .expect("degraded flag did not change in time")
            .unwrap();
    }

    #[tokio::test]
    async fn retries_connection_until_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let handle = tokio::spawn(run_with_timing(
            state.clone(),
            move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(StorageError::unavailable(
                            "connection refused".into(),
                            std::io::Error::other("refused"),
                        ))
                    } else {
                        Ok(Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>)
                    }
                }
            },
            fast(),
        ));

        wait_for(&state, false).await;
        assert!(attempts.load(Ordering::SeqCst) >= 3);
        assert!(state.document_store().await.is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn failing_health_enters_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryDocumentStore::new();

        let installed = store.clone();
        let handle = tokio::spawn(run_with_timing(
            state.clone(),
            move || {
                let store = installed.clone();
                async move { Ok(Arc::new(store) as Arc<dyn DocumentStore>) }
            },
            fast(),
        ));
        wait_for(&state, false).await;

        store.set_offline(true);
        wait_for(&state, true).await;

        store.set_offline(false);
        wait_for(&state, false).await;
        handle.abort();
    }
}
