use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use service::divergencia::domain::{AuditoriaResumo, DivergenciaStatusInput, ListDivergenciasInput};
use service::input::require_uuid;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DivergenciasPage {
    pub divergencias: Vec<models::divergencia::Model>,
    pub total: u64,
    pub pages: u64,
}

#[utoipa::path(
    post, path = "/api/divergencias", tag = "divergencias",
    request_body = crate::openapi::ListDivergenciasInputDoc,
    responses(
        (status = 200, description = "Page of divergences", body = crate::openapi::DivergenciasPageDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to fetch divergences", body = crate::errors::ErrorBody)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    body: Result<Json<ListDivergenciasInput>, JsonRejection>,
) -> Result<Json<DivergenciasPage>, JsonApiError> {
    let Json(input) = body?;
    let page = state
        .divergencias
        .list(input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to fetch divergences"))?;
    info!(count = page.items.len(), total = page.total, "list divergencias");
    Ok(Json(DivergenciasPage { divergencias: page.items, total: page.total, pages: page.pages }))
}

#[utoipa::path(
    get, path = "/api/divergencias/resumo", tag = "divergencias",
    responses(
        (status = 200, description = "Counts by status and type", body = crate::openapi::AuditoriaResumoDoc),
        (status = 500, description = "Failed to summarize divergences", body = crate::errors::ErrorBody)
    )
)]
pub async fn resumo(State(state): State<AppState>) -> Result<Json<AuditoriaResumo>, JsonApiError> {
    let r = state
        .divergencias
        .resumo()
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to summarize divergences"))?;
    Ok(Json(r))
}

#[utoipa::path(
    get, path = "/api/divergencias/{id}", tag = "divergencias",
    params(("id" = String, Path, description = "Divergence ID (UUID)")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::DivergenciaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 404, description = "Not Found", body = crate::errors::ErrorBody)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<models::divergencia::Model>, JsonApiError> {
    let id = require_uuid("id", Some(&id)).map_err(|e| JsonApiError::from_service(e, "Failed to fetch divergence"))?;
    let d = state
        .divergencias
        .get(id)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to fetch divergence"))?;
    Ok(Json(d))
}

#[utoipa::path(
    post, path = "/api/divergencias/status", tag = "divergencias",
    request_body = crate::openapi::DivergenciaStatusInputDoc,
    responses(
        (status = 200, description = "Updated divergence", body = crate::openapi::DivergenciaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 404, description = "Not Found", body = crate::errors::ErrorBody),
        (status = 409, description = "Invalid Transition", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to update divergence", body = crate::errors::ErrorBody)
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    body: Result<Json<DivergenciaStatusInput>, JsonRejection>,
) -> Result<Json<models::divergencia::Model>, JsonApiError> {
    let Json(input) = body?;
    let d = state
        .divergencias
        .update_status(input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to update divergence"))?;
    Ok(Json(d))
}
