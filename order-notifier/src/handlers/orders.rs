use axum::{body::Bytes, extract::State, http::Method, Json};
use service_core::error::AppError;

use crate::models::SendOrderResponse;
use crate::startup::AppState;

/// `/api/sendOrder`. Mounted for every method so the handler itself answers
/// non-POST requests with 405 and an `Allow` header.
pub async fn send_order(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<SendOrderResponse>, AppError> {
    state.orders.handle(&method, &body).await.map(Json)
}
