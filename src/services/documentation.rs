use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the tennis scoreboard backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::current_match,
        crate::routes::matches::global_state,
        crate::routes::matches::save_result,
        crate::routes::matches::finalize_match,
        crate::routes::matches::list_future_matches,
        crate::routes::matches::create_future_match,
        crate::routes::matches::remove_future_match,
        crate::routes::matches::list_played_matches,
        crate::routes::admin::list_players,
        crate::routes::admin::create_player,
        crate::routes::admin::update_player,
        crate::routes::admin::update_match_config,
        crate::routes::admin::clear_match_config,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::envelope::ApiStatus,
            crate::dto::envelope::ErrorDetail,
            crate::dto::player::Player,
            crate::dto::player::NewPlayer,
            crate::dto::player::PlayerChanges,
            crate::dto::matches::MatchConfigChanges,
            crate::dto::matches::ResolvedMatchConfig,
            crate::dto::matches::CurrentMatch,
            crate::dto::matches::GlobalState,
            crate::dto::matches::FutureMatch,
            crate::dto::matches::NewFutureMatch,
            crate::dto::matches::FinishedMatch,
            crate::dto::matches::FinalizeRequest,
            crate::dto::matches::SaveResultRequest,
            crate::dto::matches::FinalizeOutcome,
            crate::dto::matches::RemovalOutcome,
            crate::dto::matches::PlayedMatch,
            crate::dto::matches::ActionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "match", description = "Current match, schedule and archive; every body is wrapped in `{status, data}`"),
        (name = "admin", description = "Roster and match configuration management"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_prefixed_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/healthcheck"));
        assert!(paths.contains_key("/api/v1/tenis/finalizar"));
        assert!(paths.contains_key("/api/v1/tenis/admin/jugadores/{id}"));
    }
}
