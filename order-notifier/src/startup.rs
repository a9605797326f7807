//! Application startup and lifecycle management.

use crate::config::OrderNotifierConfig;
use crate::handlers;
use crate::services::{ChatNotifier, OrderHandler, TelegramNotifier};
use axum::{
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    http_request_span, metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderHandler>,
}

impl AppState {
    pub fn new(config: &OrderNotifierConfig, notifier: Arc<dyn ChatNotifier>) -> Self {
        Self {
            orders: Arc::new(OrderHandler::new(config, notifier)),
        }
    }
}

/// Routes and middleware shared by the standalone server and the serverless
/// function.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sendOrder", any(handlers::send_order))
        .route("/api/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "request handler panicked".to_string()
    };

    tracing::error!(detail = %detail, "Request handler panicked");
    AppError::InternalError(anyhow::anyhow!(detail)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: OrderNotifierConfig) -> Result<Self, AppError> {
        let notifier = TelegramNotifier::new(&config.telegram).map_err(|e| {
            tracing::error!("Failed to initialize Telegram notifier: {}", e);
            AppError::InternalError(anyhow::Error::new(e))
        })?;

        let state = AppState::new(&config, Arc::new(notifier));
        let router = build_router(state);

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("API server listening on {}", self.port);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, TelegramConfig};
    use crate::services::MockChatNotifier;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use secrecy::Secret;
    use serde_json::{json, Value};
    use service_core::config::Config as CoreConfig;
    use tower::ServiceExt;

    fn router(notifier: MockChatNotifier) -> Router {
        let config = OrderNotifierConfig {
            common: CoreConfig { port: 0 },
            telegram: TelegramConfig {
                bot_token: Some(Secret::new("token".to_string())),
                chat_id: Some("42".to_string()),
                api_base_url: "http://telegram.invalid".to_string(),
                timeout_secs: 10,
            },
            display: DisplayConfig::default(),
        };
        build_router(AppState::new(&config, Arc::new(notifier)))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn every_non_post_method_gets_405_with_allow_header() {
        let app = router(MockChatNotifier::accepting(json!("123")));

        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri("/api/sendOrder")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
            assert_eq!(body_json(response).await, json!({ "error": "Method not allowed" }));
        }
    }

    #[tokio::test]
    async fn mocked_notifier_round_trip() {
        let app = router(MockChatNotifier::accepting(json!("123")));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/sendOrder")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"items":[{"title":"Pizza","qty":2,"price":50000}],"total":100000}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, json!({ "ok": true, "result": "123" }));
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let app = router(MockChatNotifier::accepting(json!("123")));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/sendOrder")
                    .header(header::ORIGIN, "https://shop.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn plain_options_is_answered_by_cors_not_405() {
        let notifier = Arc::new(MockChatNotifier::accepting(json!("123")));
        let config = OrderNotifierConfig {
            common: CoreConfig { port: 0 },
            telegram: TelegramConfig {
                bot_token: Some(Secret::new("token".to_string())),
                chat_id: Some("42".to_string()),
                api_base_url: "http://telegram.invalid".to_string(),
                timeout_secs: 10,
            },
            display: DisplayConfig::default(),
        };
        let app = build_router(AppState::new(&config, notifier.clone()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/sendOrder")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::ALLOW).is_none());
        assert_eq!(notifier.send_count(), 0);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let app = router(MockChatNotifier::accepting(json!("123")));

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "Not found" }));
    }
}
