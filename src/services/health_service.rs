use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage availability, probing the installed store on the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.document_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::from_degraded(state.is_degraded())
}
