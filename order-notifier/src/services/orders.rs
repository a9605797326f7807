//! Order submission pipeline shared by every hosting shell.
//!
//! Checks run in a fixed order: method, body, items, credentials. Callers
//! rely on which error fires first, so the order must not change.

use axum::http::Method;
use chrono::{Local, Utc};
use serde_json::Value;
use service_core::error::AppError;
use std::sync::Arc;

use super::message::{format_order_message, resolve_placed_at};
use super::metrics::record_order_notification;
use super::notifier::{ChatCredentials, ChatNotifier, NotifierError};
use crate::config::{DisplayConfig, OrderNotifierConfig};
use crate::models::{OrderRequest, SendOrderResponse};

pub const UPSTREAM_ERROR: &str = "Telegram API error";

pub struct OrderHandler {
    credentials: Option<ChatCredentials>,
    display: DisplayConfig,
    notifier: Arc<dyn ChatNotifier>,
}

impl OrderHandler {
    pub fn new(config: &OrderNotifierConfig, notifier: Arc<dyn ChatNotifier>) -> Self {
        let credentials = match (&config.telegram.bot_token, &config.telegram.chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(ChatCredentials {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        };

        tracing::info!(
            bot = config.telegram.bot_token.is_some(),
            chat = config.telegram.chat_id.is_some(),
            notifier = notifier.name(),
            "Order handler configured"
        );

        Self {
            credentials,
            display: config.display.clone(),
            notifier,
        }
    }

    /// Validate the submission, send the chat message, and map the reply.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Result<SendOrderResponse, AppError> {
        let result = self.process(method, body).await;

        match &result {
            Ok(_) => {
                record_order_notification(self.notifier.name(), "delivered");
                tracing::info!("Order notification delivered");
            }
            Err(err) => {
                record_order_notification(self.notifier.name(), outcome_label(err));
                if err.status_code().is_server_error() {
                    tracing::error!(error = %err, "Order notification failed");
                } else {
                    tracing::warn!(error = %err, "Order submission rejected");
                }
            }
        }

        result
    }

    async fn process(&self, method: &Method, body: &[u8]) -> Result<SendOrderResponse, AppError> {
        if *method != Method::POST {
            return Err(AppError::MethodNotAllowed { allow: "POST" });
        }

        let payload = parse_body(body)?;
        let order = OrderRequest::from_json(&payload)
            .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;

        tracing::debug!(
            item_count = order.items.len(),
            has_phone = order.phone.is_some(),
            "Order received"
        );

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("TELEGRAM env vars missing"))
        })?;

        let created_at = order.created_at.as_ref();
        let placed_at = match self.display.fixed_offset() {
            Some(offset) => resolve_placed_at(created_at, Utc::now(), &offset),
            None => resolve_placed_at(created_at, Utc::now(), &Local),
        };
        let text = format_order_message(&order, placed_at);

        let response = self
            .notifier
            .send(credentials, &text)
            .await
            .map_err(|err| match err {
                NotifierError::Timeout(_) => AppError::BadGateway {
                    message: UPSTREAM_ERROR.to_string(),
                    detail: Value::String(err.to_string()),
                },
                NotifierError::Transport(_) => AppError::InternalError(anyhow::Error::new(err)),
            })?;

        response
            .into_outcome()
            .map(SendOrderResponse::delivered)
            .map_err(|detail| AppError::BadGateway {
                message: UPSTREAM_ERROR.to_string(),
                detail,
            })
    }
}

/// An empty body is an empty object; anything else must be JSON.
fn parse_body(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Order body is not valid JSON");
        AppError::BadRequest(anyhow::anyhow!("Invalid JSON body"))
    })
}

fn outcome_label(err: &AppError) -> &'static str {
    match err {
        AppError::MethodNotAllowed { .. } => "method_not_allowed",
        AppError::BadRequest(_) => "rejected",
        AppError::ConfigError(_) => "misconfigured",
        AppError::BadGateway { .. } => "upstream_error",
        _ => "internal_error",
    }
}
