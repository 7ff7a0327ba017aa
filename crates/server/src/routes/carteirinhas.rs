use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::info;

use service::carteirinha::domain::{CarteirinhaView, CreateCarteirinhaInput, ListCarteirinhasQuery, UpdateCarteirinhaInput};
use service::carteirinha::service::CarteirinhaService;
use service::input::require_uuid;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[utoipa::path(
    get, path = "/api/carteirinhas", tag = "carteirinhas",
    params(
        ("paciente_id" = Option<String>, Query, description = "Patient ID (UUID)"),
        ("status" = Option<String>, Query, description = "ativa | inativa")
    ),
    responses(
        (status = 200, description = "Cards ordered by numero", body = [crate::openapi::CarteirinhaDoc]),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to fetch cards", body = crate::errors::ErrorBody)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListCarteirinhasQuery>, QueryRejection>,
) -> Result<Json<Vec<CarteirinhaView>>, JsonApiError> {
    let Query(q) = query?;
    let rows = state
        .carteirinhas
        .list(q)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to fetch cards"))?;
    info!(count = rows.len(), "list carteirinhas");
    Ok(Json(rows.into_iter().map(CarteirinhaService::view).collect()))
}

#[utoipa::path(
    post, path = "/api/carteirinhas", tag = "carteirinhas",
    request_body = crate::openapi::CreateCarteirinhaInputDoc,
    responses(
        (status = 200, description = "Created", body = crate::openapi::CarteirinhaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 409, description = "Conflict", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to create card", body = crate::errors::ErrorBody)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateCarteirinhaInput>, JsonRejection>,
) -> Result<Json<CarteirinhaView>, JsonApiError> {
    let Json(input) = body?;
    let c = state
        .carteirinhas
        .create(input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to create card"))?;
    Ok(Json(CarteirinhaService::view(c)))
}

#[utoipa::path(
    get, path = "/api/carteirinhas/{id}", tag = "carteirinhas",
    params(("id" = String, Path, description = "Card ID (UUID)")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::CarteirinhaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 404, description = "Not Found", body = crate::errors::ErrorBody)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CarteirinhaView>, JsonApiError> {
    let id = require_uuid("id", Some(&id)).map_err(|e| JsonApiError::from_service(e, "Failed to fetch card"))?;
    let c = state
        .carteirinhas
        .get(id)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to fetch card"))?;
    Ok(Json(CarteirinhaService::view(c)))
}

#[utoipa::path(
    put, path = "/api/carteirinhas/{id}", tag = "carteirinhas",
    params(("id" = String, Path, description = "Card ID (UUID)")),
    request_body = crate::openapi::UpdateCarteirinhaInputDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::CarteirinhaDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 404, description = "Not Found", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to update card", body = crate::errors::ErrorBody)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateCarteirinhaInput>, JsonRejection>,
) -> Result<Json<CarteirinhaView>, JsonApiError> {
    let id = require_uuid("id", Some(&id)).map_err(|e| JsonApiError::from_service(e, "Failed to update card"))?;
    let Json(input) = body?;
    let c = state
        .carteirinhas
        .update(id, input)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to update card"))?;
    Ok(Json(CarteirinhaService::view(c)))
}
