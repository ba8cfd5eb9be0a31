use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};

use crate::{
    dto::{
        envelope::{ApiResponse, ErrorDetail},
        matches::{
            CurrentMatch, FinalizeOutcome, FinalizeRequest, FutureMatch, GlobalState,
            NewFutureMatch, PlayedMatch, RemovalOutcome, SaveResultRequest,
        },
    },
    error::AppError,
    state::SharedState,
};

/// Scoreboard routes: current match, schedule, archive and match lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/actual", get(current_match))
        .route("/estado", get(global_state))
        .route("/guardar", post(save_result))
        .route("/finalizar", post(finalize_match))
        .route(
            "/partidos-futuros",
            get(list_future_matches).post(create_future_match),
        )
        .route("/partidos-futuros/{id}", delete(remove_future_match))
        .route("/historial", get(list_played_matches))
}

/// Current match with both players resolved.
#[utoipa::path(
    get,
    path = "/api/v1/tenis/actual",
    tag = "match",
    responses(
        (status = 200, description = "Current match or the unconfigured marker", body = CurrentMatch),
        (status = 404, description = "A configured player does not exist", body = ErrorDetail),
        (status = 503, description = "Storage unavailable", body = ErrorDetail)
    )
)]
pub async fn current_match(
    State(state): State<SharedState>,
) -> Result<ApiResponse<CurrentMatch>, AppError> {
    let current = state.match_service().await?.get_current_match_config().await?;
    Ok(ApiResponse::ok(current))
}

/// Roster, current match and schedule in one read.
#[utoipa::path(
    get,
    path = "/api/v1/tenis/estado",
    tag = "match",
    responses(
        (status = 200, description = "Aggregated scoreboard state", body = GlobalState),
        (status = 404, description = "A configured player does not exist", body = ErrorDetail)
    )
)]
pub async fn global_state(
    State(state): State<SharedState>,
) -> Result<ApiResponse<GlobalState>, AppError> {
    let global = state.match_service().await?.get_global_state().await?;
    Ok(ApiResponse::ok(global))
}

/// Archive a completed match and clear it from the live state.
#[utoipa::path(
    post,
    path = "/api/v1/tenis/guardar",
    tag = "match",
    request_body = SaveResultRequest,
    responses(
        (status = 201, description = "Result archived", body = FinalizeOutcome),
        (status = 400, description = "Missing tournament, players or result", body = ErrorDetail)
    )
)]
pub async fn save_result(
    State(state): State<SharedState>,
    payload: Result<Json<SaveResultRequest>, JsonRejection>,
) -> Result<ApiResponse<FinalizeOutcome>, AppError> {
    let Json(payload) = payload?;
    let outcome = state.match_service().await?.save_final_result(payload).await?;
    Ok(ApiResponse::created(outcome))
}

/// Finalize a match, archiving it unless `guardar` is false.
#[utoipa::path(
    post,
    path = "/api/v1/tenis/finalizar",
    tag = "match",
    request_body = FinalizeRequest,
    responses(
        (status = 201, description = "Match archived and finalized", body = FinalizeOutcome),
        (status = 200, description = "Match finalized without archiving", body = FinalizeOutcome),
        (status = 400, description = "Match record without id", body = ErrorDetail),
        (status = 404, description = "Match not scheduled (strict removal)", body = ErrorDetail)
    )
)]
pub async fn finalize_match(
    State(state): State<SharedState>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Result<ApiResponse<FinalizeOutcome>, AppError> {
    let Json(FinalizeRequest { partido, guardar }) = payload?;
    if partido.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "the finished match must carry a non-empty `id`".into(),
        ));
    }

    let outcome = state
        .match_service()
        .await?
        .finalize_match(partido, guardar)
        .await?;
    let status = if outcome.guardado {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(ApiResponse::with_status(status, outcome))
}

/// Scheduled matches.
#[utoipa::path(
    get,
    path = "/api/v1/tenis/partidos-futuros",
    tag = "match",
    responses((status = 200, description = "Scheduled matches", body = [FutureMatch]))
)]
pub async fn list_future_matches(
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<FutureMatch>>, AppError> {
    let matches = state.match_service().await?.list_future_matches().await?;
    Ok(ApiResponse::ok(matches))
}

/// Schedule a match.
#[utoipa::path(
    post,
    path = "/api/v1/tenis/partidos-futuros",
    tag = "match",
    request_body = NewFutureMatch,
    responses(
        (status = 201, description = "Match scheduled", body = FutureMatch),
        (status = 400, description = "Missing tournament or players", body = ErrorDetail)
    )
)]
pub async fn create_future_match(
    State(state): State<SharedState>,
    payload: Result<Json<NewFutureMatch>, JsonRejection>,
) -> Result<ApiResponse<FutureMatch>, AppError> {
    let Json(payload) = payload?;
    let created = state
        .match_service()
        .await?
        .create_future_match(payload)
        .await?;
    Ok(ApiResponse::created(created))
}

/// Remove a scheduled match by model id. Unknown ids are reported, not rejected.
#[utoipa::path(
    delete,
    path = "/api/v1/tenis/partidos-futuros/{id}",
    tag = "match",
    params(("id" = String, Path, description = "Model id of the scheduled match")),
    responses((status = 200, description = "Removal outcome", body = RemovalOutcome))
)]
pub async fn remove_future_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RemovalOutcome>, AppError> {
    let outcome = state.match_service().await?.remove_future_match(&id).await?;
    Ok(ApiResponse::ok(outcome))
}

/// Archived matches, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/tenis/historial",
    tag = "match",
    responses((status = 200, description = "Archived matches", body = [PlayedMatch]))
)]
pub async fn list_played_matches(
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<PlayedMatch>>, AppError> {
    let played = state.match_service().await?.list_played_matches().await?;
    Ok(ApiResponse::ok(played))
}
