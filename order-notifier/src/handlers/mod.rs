//! HTTP handlers for order-notifier.

pub mod health;
pub mod orders;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use service_core::error::AppError;

pub use health::health_check;
pub use orders::send_order;

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        crate::services::get_metrics(),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Not found"))
}
