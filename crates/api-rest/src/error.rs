//! Mapping of core errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispensary_core::{DispensaryError, ErrorKind};
use serde::Serialize;

/// JSON error body: `{ "error": <kind>, "message": <text> }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidInput.as_str(),
            message,
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorKind::Forbidden.as_str(), message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PreconditionFailed
        | ErrorKind::InsufficientStock
        | ErrorKind::ReferentialBlock => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DispensaryError> for ApiError {
    fn from(err: DispensaryError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Storage {
            tracing::error!("storage error: {:?}", err);
        }
        Self::new(status_for(kind), kind.as_str(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispensary_types::MedicationId;

    #[test]
    fn kinds_map_to_statuses() {
        let err = ApiError::from(DispensaryError::MedicationNotFound(MedicationId::from("m1")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body.error, "not_found");

        let err = ApiError::from(DispensaryError::MedicationInPendingOrder {
            medication: MedicationId::from("m1"),
            count: 2,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.body.error, "referential_block");
    }
}
