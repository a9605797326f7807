use async_trait::async_trait;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    /// The messaging API did not answer within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be made or its body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Bot token and destination chat for one send.
#[derive(Debug, Clone)]
pub struct ChatCredentials {
    pub bot_token: Secret<String>,
    pub chat_id: String,
}

/// The messaging API's reply body. Its contract is not trusted, so a body
/// that is not JSON is kept as text instead of failing the request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Parsed(Value),
    Raw(String),
}

impl ReplyBody {
    /// An empty body counts as an empty JSON object.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return ReplyBody::Parsed(json!({}));
        }

        match serde_json::from_str(text) {
            Ok(value) => ReplyBody::Parsed(value),
            Err(_) => ReplyBody::Raw(text.to_string()),
        }
    }

    /// JSON form forwarded to callers: the parsed payload or `{"raw": text}`.
    pub fn into_value(self) -> Value {
        match self {
            ReplyBody::Parsed(value) => value,
            ReplyBody::Raw(text) => json!({ "raw": text }),
        }
    }

    fn explicitly_failed(&self) -> bool {
        matches!(self, ReplyBody::Parsed(value) if value.get("ok") == Some(&Value::Bool(false)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifierResponse {
    pub status: u16,
    pub body: ReplyBody,
}

impl NotifierResponse {
    pub fn new(status: u16, body: ReplyBody) -> Self {
        Self { status, body }
    }

    /// Successful unless the HTTP status is not 2xx or the payload says
    /// `"ok": false`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && !self.body.explicitly_failed()
    }

    /// `Ok(result)` on success, where result is the payload's `result` field
    /// or the whole payload when that field is absent or falsy.
    /// `Err(detail)` carries the payload to forward to the caller.
    pub fn into_outcome(self) -> Result<Value, Value> {
        let success = self.is_success();
        let payload = self.body.into_value();

        if !success {
            return Err(payload);
        }

        match payload.get("result") {
            Some(result) if is_truthy(result) => Ok(result.clone()),
            _ => Ok(payload),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Outbound delivery of a chat message.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send(
        &self,
        credentials: &ChatCredentials,
        text: &str,
    ) -> Result<NotifierResponse, NotifierError>;

    fn name(&self) -> &'static str;
}

/// Canned-reply notifier for local runs and tests.
pub struct MockChatNotifier {
    reply: Result<NotifierResponse, NotifierError>,
    send_count: AtomicU64,
    last_text: Mutex<Option<String>>,
}

impl MockChatNotifier {
    pub fn new(reply: Result<NotifierResponse, NotifierError>) -> Self {
        Self {
            reply,
            send_count: AtomicU64::new(0),
            last_text: Mutex::new(None),
        }
    }

    /// Replies with `{"ok": true, "result": <result>}`.
    pub fn accepting(result: Value) -> Self {
        Self::new(Ok(NotifierResponse::new(
            200,
            ReplyBody::Parsed(json!({ "ok": true, "result": result })),
        )))
    }

    /// Replies with the given status and raw body text.
    pub fn replying(status: u16, body: &str) -> Self {
        Self::new(Ok(NotifierResponse::new(status, ReplyBody::from_text(body))))
    }

    pub fn failing(error: NotifierError) -> Self {
        Self::new(Err(error))
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn last_text(&self) -> Option<String> {
        self.last_text
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatNotifier for MockChatNotifier {
    async fn send(
        &self,
        credentials: &ChatCredentials,
        text: &str,
    ) -> Result<NotifierResponse, NotifierError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_text.lock() {
            *last = Some(text.to_string());
        }

        tracing::info!(
            chat_id = %credentials.chat_id,
            text_length = text.len(),
            "[MOCK] chat message would be sent"
        );

        self.reply.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
