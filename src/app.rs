//! Route and error-handler registration.
//!
//! # Responsibilities
//! - Collect routes and error handlers in registration order
//! - Freeze them into a `Dispatcher` (and optionally an `HttpServer`)
//! - Bind and serve
//!
//! # Design Decisions
//! - `App` is consumed when frozen, so nothing can be registered once
//!   requests are being served
//! - Every registration call returns `&mut Self` for chaining

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, ErrorHandler, HandlerError, HandlerResult, Next};
use crate::http::{HttpServer, RequestView, ResponseSink};
use crate::lifecycle::Shutdown;
use crate::routing::{Method, Pattern, RouteTable};

/// Error type for serving an application.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// An application under construction.
#[derive(Default)]
pub struct App {
    routes: RouteTable,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    config: ServerConfig,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            routes: RouteTable::new(config.routing.match_policy),
            error_handlers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Registers `handler` for `pattern` and `method`.
    pub fn on<F, Fut>(&mut self, method: Method, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.register(pattern, method, Arc::new(handler));
        self
    }

    /// Registers `handler` for every method.
    pub fn route<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Any, pattern, handler)
    }

    pub fn get<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn del<F, Fut>(&mut self, pattern: impl Into<Pattern>, handler: F) -> &mut Self
    where
        F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::Delete, pattern, handler)
    }

    /// Appends an error handler. Error handlers run in registration order.
    pub fn on_error<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<HandlerError>, RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handlers.push(Arc::new(handler));
        self
    }

    /// Freezes the registered routes and error handlers.
    pub fn into_dispatcher(self) -> Dispatcher {
        let handler_timeout = self.config.timeouts.handler_timeout();
        tracing::debug!(
            routes = self.routes.len(),
            error_handlers = self.error_handlers.len(),
            policy = ?self.routes.policy(),
            "Route table frozen"
        );
        Dispatcher::new(self.routes, self.error_handlers).with_handler_timeout(handler_timeout)
    }

    pub fn into_server(self) -> HttpServer {
        let config = self.config.clone();
        HttpServer::new(config, self.into_dispatcher())
    }

    /// Serves on `0.0.0.0:<port>` until Ctrl+C or SIGTERM.
    pub async fn listen(mut self, port: u16) -> Result<(), ServeError> {
        self.config.listener.bind_address = SocketAddr::from(([0, 0, 0, 0], port)).to_string();
        self.serve().await
    }

    /// Serves on the configured bind address until Ctrl+C or SIGTERM.
    pub async fn serve(self) -> Result<(), ServeError> {
        let addr = self.config.listener.bind_address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        let shutdown = Shutdown::new();
        let result = self.into_server().run(listener, shutdown.subscribe()).await;
        drop(shutdown);
        result.map_err(ServeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Reply;
    use crate::http::RawRequest;
    use crate::routing::MatchPolicy;
    use serde_json::json;

    #[tokio::test]
    async fn sugar_registers_expected_methods() {
        let mut app = App::new();
        app.get("/r", |_req, _res, _next| async { Ok(Reply::value("get")) })
            .post("/r", |_req, _res, _next| async { Ok(Reply::value("post")) })
            .put("/r", |_req, _res, _next| async { Ok(Reply::value("put")) })
            .patch("/r", |_req, _res, _next| async { Ok(Reply::value("patch")) })
            .del("/r", |_req, _res, _next| async { Ok(Reply::value("delete")) })
            .route("/any", |req: RequestView, _res, _next| async move {
                Ok(Reply::value(req.method().to_string()))
            });
        let dispatcher = app.into_dispatcher();

        for (method, expected) in [
            ("GET", "get"),
            ("POST", "post"),
            ("PUT", "put"),
            ("PATCH", "patch"),
            ("DELETE", "delete"),
        ] {
            let res = dispatcher.dispatch_raw(RawRequest::new(method, "/r")).await;
            assert_eq!(res.body(), json!(expected));
        }

        let res = dispatcher.dispatch_raw(RawRequest::new("OPTIONS", "/r")).await;
        assert_eq!(res.status_code(), 404);

        let res = dispatcher.dispatch_raw(RawRequest::new("TRACE", "/any")).await;
        assert_eq!(res.body(), json!("TRACE"));
    }

    #[tokio::test]
    async fn config_selects_match_policy() {
        let mut config = ServerConfig::default();
        config.routing.match_policy = MatchPolicy::RequestBounded;

        let mut app = App::with_config(config);
        app.get("/a/:b", |_req, _res, _next| async { Ok(Reply::value("hit")) });
        let dispatcher = app.into_dispatcher();
        assert_eq!(dispatcher.routes().policy(), MatchPolicy::RequestBounded);

        let res = dispatcher.dispatch_raw(RawRequest::new("GET", "/a")).await;
        assert_eq!(res.body(), json!("hit"));
    }

    #[tokio::test]
    async fn error_handlers_are_registered() {
        let mut app = App::new();
        app.on_error(|_err, _req, _res, next: Next| async move {
            next.advance();
            Ok(Reply::NoValue)
        })
        .on_error(|_err, _req, _res, _next| async { Ok(Reply::value("second")) });

        let dispatcher = app.into_dispatcher();
        assert_eq!(dispatcher.error_handler_count(), 2);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        let err = App::with_config(config).serve().await.unwrap_err();
        assert!(matches!(err, ServeError::Bind { .. }));
    }
}
