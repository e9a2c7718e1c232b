//! Handler traits and the continuation token.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::dispatch::error::HandlerError;
use crate::http::request::RequestView;
use crate::http::response::ResponseSink;

/// What a handler hands back once it resolves.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// Leave the response body as the handler left it.
    #[default]
    NoValue,
    /// Overwrite the response body.
    Value(Value),
}

impl Reply {
    pub fn value(value: impl Into<Value>) -> Self {
        Reply::Value(value.into())
    }

    pub(crate) fn apply(self, response: &ResponseSink) {
        if let Reply::Value(body) = self {
            response.send(body);
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::NoValue
    }
}

pub type HandlerResult = Result<Reply, HandlerError>;

/// Continuation handed to every handler invocation.
///
/// Calling [`Next::advance`] before the handler's future resolves passes
/// control to the next matching handler. A handler that never advances ends
/// the chain. Clones share the same decision, so the token can be moved into
/// spawned work and advanced later; only calls made before the handler
/// resolves are observed.
#[derive(Debug, Clone, Default)]
pub struct Next {
    advanced: Arc<AtomicBool>,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self) {
        self.advanced.store(true, Ordering::Release);
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced.load(Ordering::Acquire)
    }
}

/// A route handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: RequestView, response: ResponseSink, next: Next) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: RequestView, response: ResponseSink, next: Next) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request, response, next))
    }
}

/// A handler in the error chain. Receives the fault that started the chain.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(
        &self,
        error: Arc<HandlerError>,
        request: RequestView,
        response: ResponseSink,
        next: Next,
    ) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(Arc<HandlerError>, RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        error: Arc<HandlerError>,
        request: RequestView,
        response: ResponseSink,
        next: Next,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(error, request, response, next))
    }
}

/// Boxes a closure as a route handler, pinning down its argument types.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// Boxes a closure as an error handler.
pub fn error_handler_fn<F, Fut>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(Arc<HandlerError>, RequestView, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}
