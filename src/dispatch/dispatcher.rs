//! The continuation-chain dispatcher.
//!
//! # Responsibilities
//! - Find every route matching the request, in registration order
//! - Run their handlers one at a time, advancing only on `Next::advance`
//! - Route handler faults into the error chain, which always ends in the
//!   built-in default handler
//!
//! # State Machine
//! ```text
//! Matching ──(no routes)──────────────────────────────▶ Done (404)
//!    │
//!    ▼
//! Running(i) ──advance, i+1 < n──▶ Running(i+1)
//!    │  └──no advance / last route──────────────────────▶ Done
//!    └──fault──▶ ErrorRunning(0) ──advance──▶ ErrorRunning(j+1) ... ──▶ default ──▶ Done
//!                     └──no advance──────────────────────────────────────────────▶ Done
//! ```
//!
//! # Design Decisions
//! - The dispatcher owns the cursor; handlers only record a decision on `Next`
//! - Each invocation gets a `RequestView` carrying only its own route's params
//! - Panics and timeouts are faults like any returned error
//! - A failing error handler is logged and skipped over to the default handler

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::json;
use tracing::Instrument;

use crate::dispatch::error::{default_error_handler, HandlerError};
use crate::dispatch::handler::{ErrorHandler, HandlerResult, Next};
use crate::http::request::{RawRequest, RequestView};
use crate::http::request_id::X_REQUEST_ID;
use crate::http::response::ResponseSink;
use crate::observability::metrics;
use crate::routing::router::RouteTable;

/// A fault and the request view of the handler that raised it.
struct Fault {
    error: Arc<HandlerError>,
    request: RequestView,
}

enum Stage {
    Matching,
    Running(usize),
    ErrorRunning(usize, Fault),
    Done,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Matching => "matching",
            Stage::Running(_) => "running",
            Stage::ErrorRunning(..) => "error_running",
            Stage::Done => "done",
        }
    }
}

/// Immutable routing engine shared by every request.
pub struct Dispatcher {
    routes: RouteTable,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, error_handlers: Vec<Arc<dyn ErrorHandler>>) -> Self {
        Self {
            routes,
            error_handlers,
            handler_timeout: None,
        }
    }

    /// Bounds every handler invocation. `None` lets handlers run forever.
    pub fn with_handler_timeout(mut self, limit: Option<Duration>) -> Self {
        self.handler_timeout = limit;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn error_handler_count(&self) -> usize {
        self.error_handlers.len()
    }

    pub async fn dispatch_raw(&self, raw: RawRequest) -> ResponseSink {
        self.dispatch(RequestView::from_raw(raw)).await
    }

    /// Runs one request through the chain and returns the finished response.
    pub async fn dispatch(&self, request: RequestView) -> ResponseSink {
        let response = ResponseSink::new();
        let span = tracing::debug_span!(
            "dispatch",
            method = %request.method(),
            path = %request.path(),
            request_id = request.header(X_REQUEST_ID).unwrap_or("-"),
        );
        self.run(request, response.clone()).instrument(span).await;
        response
    }

    async fn run(&self, request: RequestView, response: ResponseSink) {
        let matched = self.routes.all_matching(request.path(), request.method());
        let mut stage = Stage::Matching;

        loop {
            tracing::trace!(stage = stage.label(), "Dispatch stage");

            stage = match stage {
                Stage::Matching if matched.is_empty() => {
                    tracing::debug!("No route matched");
                    response.status(404).send(json!({ "message": "Not found" }));
                    Stage::Done
                }
                Stage::Matching => {
                    tracing::debug!(routes = matched.len(), "Routes matched");
                    Stage::Running(0)
                }
                Stage::Running(index) => {
                    let route = matched[index];
                    let scoped = request.with_params(route.params_for(request.path()));
                    let next = Next::new();

                    let outcome = self
                        .guard(|| route.handler().call(scoped.clone(), response.clone(), next.clone()))
                        .await;

                    match outcome {
                        Ok(reply) => {
                            reply.apply(&response);
                            if next.is_advanced() && index + 1 < matched.len() {
                                Stage::Running(index + 1)
                            } else {
                                Stage::Done
                            }
                        }
                        Err(error) => {
                            tracing::warn!(
                                route = %route.pattern().as_str(),
                                error = %error,
                                "Handler failed, entering error chain"
                            );
                            metrics::record_fault(error.name());
                            response.status(500);
                            Stage::ErrorRunning(
                                0,
                                Fault {
                                    error: Arc::new(error),
                                    request: scoped,
                                },
                            )
                        }
                    }
                }
                Stage::ErrorRunning(index, fault) => match self.error_handlers.get(index) {
                    None => {
                        default_error_handler(&fault.error, &fault.request, &response);
                        Stage::Done
                    }
                    Some(handler) => {
                        let next = Next::new();
                        let outcome = self
                            .guard(|| {
                                handler.call(
                                    Arc::clone(&fault.error),
                                    fault.request.clone(),
                                    response.clone(),
                                    next.clone(),
                                )
                            })
                            .await;

                        match outcome {
                            Ok(reply) => {
                                reply.apply(&response);
                                if next.is_advanced() {
                                    Stage::ErrorRunning(index + 1, fault)
                                } else {
                                    Stage::Done
                                }
                            }
                            Err(error) => {
                                tracing::error!(
                                    position = index,
                                    error = %error,
                                    "Error handler failed, falling back to default"
                                );
                                metrics::record_fault(error.name());
                                Stage::ErrorRunning(self.error_handlers.len(), fault)
                            }
                        }
                    }
                },
                Stage::Done => break,
            };
        }
    }

    /// Invokes a handler, turning panics and missed deadlines into faults.
    async fn guard<F>(&self, start: F) -> HandlerResult
    where
        F: FnOnce() -> BoxFuture<'static, HandlerResult>,
    {
        let call = match std::panic::catch_unwind(AssertUnwindSafe(start)) {
            Ok(call) => AssertUnwindSafe(call).catch_unwind(),
            Err(panic) => return Err(HandlerError::from_panic(panic)),
        };

        let outcome = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(HandlerError::timeout(limit)),
            },
            None => call.await,
        };

        outcome.unwrap_or_else(|panic| Err(HandlerError::from_panic(panic)))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("error_handlers", &self.error_handlers.len())
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}
