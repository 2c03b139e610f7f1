use axum::http::StatusCode;

pub mod account;
pub mod courses;
pub mod payments;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
