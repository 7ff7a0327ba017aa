use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod auditoria;
pub mod carteirinhas;
pub mod divergencias;
pub mod guias;

#[utoipa::path(
    get, path = "/health", tag = "health",
    responses((status = 200, description = "OK", body = crate::openapi::HealthResponse))
)]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    common::metrics::encode_metrics()
}

/// Build the full application router: API, health, metrics and docs.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let public: Router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    let api: Router = Router::new()
        .route("/api/unimed/guias", post(guias::list))
        .route("/api/unimed/guias/status", post(guias::update_status))
        .route("/api/divergencias", post(divergencias::list))
        .route("/api/divergencias/resumo", get(divergencias::resumo))
        .route("/api/divergencias/status", post(divergencias::update_status))
        .route("/api/divergencias/:id", get(divergencias::get))
        .route("/api/auditoria", post(auditoria::auditar))
        .route("/api/carteirinhas", get(carteirinhas::list).post(carteirinhas::create))
        .route("/api/carteirinhas/:id", get(carteirinhas::get).put(carteirinhas::update))
        .with_state(state);

    public
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
