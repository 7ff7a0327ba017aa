use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use service::errors::ServiceError;

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &str, detail: Option<String>) -> Self {
        Self { status, body: ErrorBody { error: error.to_string(), detail } }
    }

    /// Maps a service failure to its HTTP status. Store failures answer with
    /// `failure` only; the cause goes to the log.
    pub fn from_service(e: ServiceError, failure: &str) -> Self {
        match e {
            ServiceError::Validation(m) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(m)),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, "Not Found", Some(m)),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, "Conflict", Some(m)),
            ServiceError::InvalidTransition(m) => Self::new(StatusCode::CONFLICT, "Invalid Transition", Some(m)),
            ServiceError::Db(m) => {
                error!(err = %m, "{}", failure);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure, None)
            }
        }
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(r: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Body", Some(r.body_text()))
    }
}

impl From<QueryRejection> for JsonApiError {
    fn from(r: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Query", Some(r.body_text()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidTransition("x".into()), StatusCode::CONFLICT),
            (ServiceError::Db("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (e, status) in cases {
            assert_eq!(JsonApiError::from_service(e, "Failed").status, status);
        }
    }

    #[test]
    fn store_failures_hide_the_cause() {
        let e = JsonApiError::from_service(ServiceError::Db("password authentication failed".into()), "Failed to fetch guides");
        assert_eq!(e.body.error, "Failed to fetch guides");
        assert!(e.body.detail.is_none());
    }
}
