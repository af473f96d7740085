use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::error::TransitionError;
use crate::domain::repository::RepositoryError;

// ApiSuccess is a wrapper around a response that includes a status code.

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub(crate) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Failure surface of the API. Every variant carries a stable status code
/// and a human message; internal causes are logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    UnprocessableEntity(String),
    ConflictWithServerState(String),
    NotFound(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound("Record not found".to_string()),
            RepositoryError::VersionConflict => {
                Self::ConflictWithServerState("Record was modified concurrently".to_string())
            }
            RepositoryError::UniqueViolation(cause) => Self::ConflictWithServerState(cause),
            RepositoryError::DatabaseError(cause) => {
                tracing::error!("{:?}", cause);
                Self::InternalServerError("Database server error".to_string())
            }
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::NotFound => Self::NotFound("Response not found".to_string()),
            TransitionError::InvalidStatus(cause) => Self::BadRequest(cause.to_string()),
            TransitionError::SignatureRequired => {
                Self::BadRequest("A signature is required to approve this submission".to_string())
            }
            TransitionError::ConflictingTransition => Self::ConflictWithServerState(
                "Submission was updated by someone else; reload and retry".to_string(),
            ),
            TransitionError::Storage(cause) | TransitionError::Internal(cause) => {
                tracing::error!("{:?}", cause);
                Self::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;

        let (status, message) = match self {
            InternalServerError(e) => {
                tracing::error!("{}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            UnprocessableEntity(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ConflictWithServerState(message) => (StatusCode::CONFLICT, message),
            NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

// Generic response structure shared by all API responses.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    pub status_code: u16,
    pub data: T,
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

/// The response data format for all error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_map_to_stable_status_codes() {
        let cases = [
            (TransitionError::NotFound, StatusCode::NOT_FOUND),
            (
                TransitionError::SignatureRequired,
                StatusCode::BAD_REQUEST,
            ),
            (
                TransitionError::ConflictingTransition,
                StatusCode::CONFLICT,
            ),
            (
                TransitionError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn internal_causes_never_leak() {
        let error = ApiError::from(TransitionError::Internal("secret dsn".to_string()));
        assert_eq!(
            error,
            ApiError::InternalServerError("Internal server error".to_string())
        );
    }
}
