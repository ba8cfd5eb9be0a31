use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses((status = 200, description = "Storage availability", body = HealthResponse))
)]
/// Report whether a storage backend is installed and reachable.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(health_service::health_status(&state).await)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore,
        dto::health::HealthStatus, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        let Json(before) = healthcheck(State(state.clone())).await;
        assert_eq!(before.status, HealthStatus::Degraded);

        state
            .install_document_store(Arc::new(MemoryDocumentStore::new()))
            .await;
        let Json(after) = healthcheck(State(state)).await;
        assert_eq!(after.status, HealthStatus::Ok);
    }
}
