//! Minimal HTTP routing and middleware-dispatch engine.
//!
//! Routes and error handlers are registered on an [`App`], frozen into a
//! [`Dispatcher`], and served over HTTP by [`HttpServer`].

pub mod app;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use app::{App, ServeError};
pub use config::ServerConfig;
pub use dispatch::{Dispatcher, HandlerError, HandlerResult, Next, Reply};
pub use http::{HttpServer, RawRequest, RequestView, ResponseSink};
pub use lifecycle::Shutdown;
pub use routing::Method;
