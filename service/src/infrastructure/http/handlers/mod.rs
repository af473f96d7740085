use axum::http::StatusCode;

pub mod documents;
pub mod notifications;
pub mod responses;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
