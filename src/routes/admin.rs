use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, patch},
};

use crate::{
    dto::{
        envelope::{ApiResponse, ErrorDetail},
        matches::{ActionResponse, CurrentMatch, MatchConfigChanges},
        player::{NewPlayer, Player, PlayerChanges},
    },
    error::AppError,
    state::SharedState,
};

/// Administration routes: roster edits and the current match configuration.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/jugadores", get(list_players).post(create_player))
        .route("/admin/jugadores/{id}", patch(update_player))
        .route(
            "/admin/configuracion",
            patch(update_match_config).delete(clear_match_config),
        )
}

/// Roster, ordered by ranking when configured.
#[utoipa::path(
    get,
    path = "/api/v1/tenis/admin/jugadores",
    tag = "admin",
    responses((status = 200, description = "Players", body = [Player]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<Player>>, AppError> {
    let players = state.match_service().await?.list_players().await?;
    Ok(ApiResponse::ok(players))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenis/admin/jugadores",
    tag = "admin",
    request_body = NewPlayer,
    responses(
        (status = 201, description = "Player created", body = Player),
        (status = 400, description = "Invalid player", body = ErrorDetail)
    )
)]
pub async fn create_player(
    State(state): State<SharedState>,
    payload: Result<Json<NewPlayer>, JsonRejection>,
) -> Result<ApiResponse<Player>, AppError> {
    let Json(payload) = payload?;
    let player = state.match_service().await?.create_player(payload).await?;
    Ok(ApiResponse::created(player))
}

/// Partially update a player.
#[utoipa::path(
    patch,
    path = "/api/v1/tenis/admin/jugadores/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Storage id of the player")),
    request_body = PlayerChanges,
    responses(
        (status = 200, description = "Updated player", body = Player),
        (status = 400, description = "Invalid or unknown fields", body = ErrorDetail),
        (status = 404, description = "Player not found", body = ErrorDetail)
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<PlayerChanges>, JsonRejection>,
) -> Result<ApiResponse<Player>, AppError> {
    let Json(changes) = payload?;
    let player = state
        .match_service()
        .await?
        .update_player(&id, changes)
        .await?;
    Ok(ApiResponse::ok(player))
}

/// Merge changes into the current match configuration.
#[utoipa::path(
    patch,
    path = "/api/v1/tenis/admin/configuracion",
    tag = "admin",
    request_body = MatchConfigChanges,
    responses(
        (status = 200, description = "Resolved configuration", body = CurrentMatch),
        (status = 404, description = "A configured player does not exist", body = ErrorDetail)
    )
)]
pub async fn update_match_config(
    State(state): State<SharedState>,
    payload: Result<Json<MatchConfigChanges>, JsonRejection>,
) -> Result<ApiResponse<CurrentMatch>, AppError> {
    let Json(changes) = payload?;
    let current = state
        .match_service()
        .await?
        .update_match_config(changes)
        .await?;
    Ok(ApiResponse::ok(current))
}

/// Empty the current match configuration.
#[utoipa::path(
    delete,
    path = "/api/v1/tenis/admin/configuracion",
    tag = "admin",
    responses((status = 200, description = "Configuration cleared", body = ActionResponse))
)]
pub async fn clear_match_config(
    State(state): State<SharedState>,
) -> Result<ApiResponse<ActionResponse>, AppError> {
    state.match_service().await?.clear_match_config().await?;
    Ok(ApiResponse::ok(ActionResponse {
        mensaje: "current match configuration cleared".into(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        config::AppConfig, dao::document_store::memory::MemoryDocumentStore, state::AppState,
    };

    async fn state_with_store() -> (SharedState, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        let state = AppState::new(AppConfig::default());
        state.install_document_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn new_player(value: Value) -> NewPlayer {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn created_player_can_be_configured() {
        let (state, _) = state_with_store().await;

        let first = create_player(
            State(state.clone()),
            Ok(Json(new_player(json!({"nombre": "Carlos", "ranking": 2})))),
        )
        .await
        .unwrap();
        assert_eq!(first.status, StatusCode::CREATED);
        let second = create_player(
            State(state.clone()),
            Ok(Json(new_player(json!({"nombre": "Jannik", "ranking": 1})))),
        )
        .await
        .unwrap();

        let changes: MatchConfigChanges = serde_json::from_value(json!({
            "torneo": "Open",
            "jugador1": first.body.data.id,
            "jugador2": second.body.data.id
        }))
        .unwrap();
        let response = update_match_config(State(state.clone()), Ok(Json(changes)))
            .await
            .unwrap();
        let CurrentMatch::Configured(current) = response.body.data else {
            panic!("expected a configured match");
        };
        assert_eq!(current.jugador2.nombre, "Jannik");

        let listed = list_players(State(state)).await.unwrap();
        let names: Vec<_> = listed.body.data.iter().map(|p| p.nombre.as_str()).collect();
        assert_eq!(names, ["Jannik", "Carlos"]);
    }

    #[tokio::test]
    async fn invalid_player_is_bad_request() {
        let (state, store) = state_with_store().await;
        let err = create_player(State(state), Ok(Json(new_player(json!({"nombre": ""})))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.documents("jugadores").is_empty());
    }

    #[tokio::test]
    async fn updating_unknown_player_is_not_found() {
        let (state, _) = state_with_store().await;
        let err = update_player(
            State(state),
            Path("ghost".into()),
            Ok(Json(PlayerChanges::default())),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn clearing_config_leaves_match_unconfigured() {
        let (state, store) = state_with_store().await;
        clear_match_config(State(state)).await.unwrap();
        assert!(store.documents("estado_global")[0].document.is_empty());
    }
}
