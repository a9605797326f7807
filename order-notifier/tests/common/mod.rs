use order_notifier::config::{DisplayConfig, OrderNotifierConfig, TelegramConfig};
use order_notifier::startup::Application;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use wiremock::MockServer;

pub const BOT_TOKEN: &str = "123456:test-token";
pub const CHAT_ID: &str = "-100200300";

pub struct TestApp {
    pub address: String,
    client: reqwest::Client,
}

impl TestApp {
    /// Spawn the server on a random port, pointing the Telegram client at the
    /// given mock server.
    pub async fn spawn(telegram: &MockServer) -> Self {
        Self::spawn_with(telegram, Some(BOT_TOKEN), Some(CHAT_ID), 5).await
    }

    pub async fn spawn_with(
        telegram: &MockServer,
        bot_token: Option<&str>,
        chat_id: Option<&str>,
        timeout_secs: u64,
    ) -> Self {
        let config = OrderNotifierConfig {
            common: CoreConfig { port: 0 },
            telegram: TelegramConfig {
                bot_token: bot_token.map(|t| Secret::new(t.to_string())),
                chat_id: chat_id.map(str::to_string),
                api_base_url: telegram.uri(),
                timeout_secs,
            },
            display: DisplayConfig {
                utc_offset_minutes: Some(300),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/api/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn post_order(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/sendOrder", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn send_message_path() -> String {
    format!("/bot{}/sendMessage", BOT_TOKEN)
}
