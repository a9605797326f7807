//! Serverless entry point: the same router served through the Lambda runtime.

use lambda_http::{run, Error};
use order_notifier::config::OrderNotifierConfig;
use order_notifier::services::{init_metrics, TelegramNotifier};
use order_notifier::startup::{build_router, AppState};
use service_core::observability::init_tracing;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = OrderNotifierConfig::load()?;

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("order-notifier-lambda", "info", otlp_endpoint.as_deref());

    init_metrics().map_err(|e| {
        tracing::error!("Failed to install metrics recorder: {}", e);
        format!("Metrics error: {}", e)
    })?;

    let notifier = TelegramNotifier::new(&config.telegram)?;
    let router = build_router(AppState::new(&config, Arc::new(notifier)));

    run(router).await
}
