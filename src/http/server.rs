//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Accumulate the full request body before dispatching
//! - Bound each dispatch by the request deadline
//! - Render the dispatcher's response as JSON or plain text
//! - Serve until a shutdown signal arrives
//!
//! # Design Decisions
//! - Axum only provides framing; all matching happens in the dispatcher
//! - Body read failures never reach the dispatcher: they answer
//!   `500 {"message":"Unknown error"}` directly
//! - An expired request deadline drops the chain and answers a JSON
//!   `TimeoutError` body with status 500, never an empty response

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, HandlerError};
use crate::http::request::{RawRequest, RequestView};
use crate::http::request_id::UuidRequestId;
use crate::http::response::ResponseParts;
use crate::lifecycle::shutdown_signal;
use crate::observability::metrics;

/// Application state injected into the catch-all handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

/// HTTP front end for a frozen dispatcher.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            max_body_size: config.limits.max_body_size,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires or a signal arrives.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Accumulates the body, dispatches, and renders the result.
async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, uri = %parts.uri, error = %e, "Failed to read request body");
            metrics::record_request(&method, 500, start_time);
            return transport_fault();
        }
    };

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let raw = RawRequest {
        method: method.clone(),
        url,
        headers: parts.headers,
        body,
    };

    let dispatch = state.dispatcher.dispatch(RequestView::from_raw(raw));
    let response = match tokio::time::timeout(state.request_timeout, dispatch).await {
        Ok(sink) => render(sink.snapshot()),
        Err(_) => {
            tracing::warn!(
                method = %method,
                limit_ms = state.request_timeout.as_millis() as u64,
                "Request deadline expired, chain abandoned"
            );
            metrics::record_fault("TimeoutError");
            request_expired(state.request_timeout)
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

/// String bodies go out as `text/plain`, everything else as JSON.
pub fn render(parts: ResponseParts) -> Response {
    let status = StatusCode::from_u16(parts.status).unwrap_or_else(|_| {
        tracing::warn!(status = parts.status, "Handler set an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    match parts.body {
        Value::String(text) => (status, [(header::CONTENT_TYPE, "text/plain")], text).into_response(),
        body => (status, Json(body)).into_response(),
    }
}

fn transport_fault() -> Response {
    render(ResponseParts {
        status: 500,
        body: json!({ "message": "Unknown error" }),
    })
}

fn request_expired(limit: Duration) -> Response {
    let error = HandlerError::new(
        "TimeoutError",
        format!("request did not finish within {}ms", limit.as_millis()),
    );
    render(ResponseParts {
        status: 500,
        body: error.to_json().unwrap_or_else(|| json!({ "message": "Unknown error" })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn strings_render_as_plain_text() {
        let response = render(ResponseParts {
            status: 201,
            body: json!("hello"),
        });
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(content_type(&response), "text/plain");
    }

    #[test]
    fn structured_values_render_as_json() {
        for body in [json!({"a": 1}), json!([1, 2]), json!(3), json!(true), Value::Null] {
            let response = render(ResponseParts { status: 200, body });
            assert_eq!(content_type(&response), "application/json");
        }
    }

    #[test]
    fn invalid_status_becomes_500() {
        let response = render(ResponseParts {
            status: 1000,
            body: json!(""),
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn transport_fault_is_unknown_error() {
        let response = transport_fault();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), "application/json");
    }

    #[test]
    fn expired_request_is_json_timeout() {
        let response = request_expired(Duration::from_millis(1500));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), "application/json");
    }
}
