//! Telegram Bot API client for the `sendMessage` method.

use super::notifier::{ChatCredentials, ChatNotifier, NotifierError, NotifierResponse, ReplyBody};
use crate::config::TelegramConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;

pub struct TelegramNotifier {
    client: Client,
    api_base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    /// Fails only if the HTTP client cannot be constructed, which is fatal at
    /// startup.
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn send_message_url(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, bot_token)
    }

    fn classify(&self, err: reqwest::Error) -> NotifierError {
        if err.is_timeout() {
            NotifierError::Timeout(self.timeout)
        } else {
            // The URL embeds the bot token; keep it out of messages.
            NotifierError::Transport(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn send(
        &self,
        credentials: &ChatCredentials,
        text: &str,
    ) -> Result<NotifierResponse, NotifierError> {
        let request = SendMessageRequest {
            chat_id: &credentials.chat_id,
            text,
        };

        tracing::info!(chat_id = %credentials.chat_id, "Sending message to Telegram chat");

        let response = self
            .client
            .post(self.send_message_url(credentials.bot_token.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| self.classify(e))?;
        let body = ReplyBody::from_text(&raw);

        tracing::info!(
            status = status.as_u16(),
            parsed = matches!(body, ReplyBody::Parsed(_)),
            "Telegram response received"
        );

        Ok(NotifierResponse::new(status.as_u16(), body))
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
