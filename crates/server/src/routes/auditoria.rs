use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use service::auditoria::reconcile::{AuditoriaEntrada, AuditoriaResultado};

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct AuditoriaRequest {
    #[serde(flatten)]
    pub entrada: AuditoriaEntrada,
    /// Store findings as `pendente` divergences.
    #[serde(default)]
    pub registrar: bool,
}

#[utoipa::path(
    post, path = "/api/auditoria", tag = "auditoria",
    request_body = crate::openapi::AuditoriaRequestDoc,
    responses(
        (status = 200, description = "Reconciliation result", body = crate::openapi::AuditoriaResultadoDoc),
        (status = 400, description = "Validation Error", body = crate::errors::ErrorBody),
        (status = 409, description = "Conflict: a concurrent run filed the same finding", body = crate::errors::ErrorBody),
        (status = 500, description = "Failed to run audit", body = crate::errors::ErrorBody)
    )
)]
pub async fn auditar(
    State(state): State<AppState>,
    body: Result<Json<AuditoriaRequest>, JsonRejection>,
) -> Result<Json<AuditoriaResultado>, JsonApiError> {
    let Json(req) = body?;
    let r = state
        .auditoria
        .auditar(req.entrada, req.registrar)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to run audit"))?;
    Ok(Json(r))
}
