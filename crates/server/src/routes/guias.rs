use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use service::guia::domain::{ListGuiasInput, StatusUpdateInput};

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GuiasPage {
    pub guides: Vec<models::guia::Model>,
    pub total: u64,
    pub pages: u64,
}

#[utoipa::path(
    post, path = "/api/unimed/guias", tag = "guias",
    request_body = crate::openapi::ListGuiasInputDoc,
    responses(
        (status = 200, description = "Page of guides", body = crate::openapi::GuiasPageDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to fetch guides", body = crate::errors::ErrorBody)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    body: Result<Json<ListGuiasInput>, JsonRejection>,
) -> Result<Json<GuiasPage>, JsonApiError> {
    let Json(input) = body?;
    let page = state
        .guias
        .list(input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to fetch guides"))?;
    info!(count = page.items.len(), total = page.total, "list guias");
    Ok(Json(GuiasPage { guides: page.items, total: page.total, pages: page.pages }))
}

#[utoipa::path(
    post, path = "/api/unimed/guias/status", tag = "guias",
    request_body = crate::openapi::StatusUpdateInputDoc,
    responses(
        (status = 200, description = "Updated guide, or null when the id is unknown", body = crate::openapi::GuiaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 409, description = "Invalid Transition", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to update guide", body = crate::errors::ErrorBody)
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    body: Result<Json<StatusUpdateInput>, JsonRejection>,
) -> Result<Json<Option<models::guia::Model>>, JsonApiError> {
    let Json(input) = body?;
    let updated = state
        .guias
        .update_status(input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to update guide"))?;
    Ok(Json(updated))
}
