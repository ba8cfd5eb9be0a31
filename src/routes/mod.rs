use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod admin;
pub mod health;
pub mod matches;

/// Prefix shared by every scoreboard route.
pub const API_PREFIX: &str = "/api/v1/tenis";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = matches::router().merge(admin::router());

    let docs_router: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    health::router()
        .nest(API_PREFIX, api_router)
        .merge(docs_router)
        .with_state(state)
}
