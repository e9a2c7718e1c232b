//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestView
//!     → dispatcher.rs (RouteTable::all_matching, registration order)
//!     → handler.rs (route handlers, advanced through Next)
//!     → on fault: error handlers, then error.rs default handler
//!     → ResponseSink
//! ```
//!
//! # Design Decisions
//! - One request runs one handler at a time; no fan-out across matches
//! - Handlers finish the response unless they explicitly advance
//! - The error chain always terminates in the built-in default handler

pub mod dispatcher;
pub mod error;
pub mod handler;

pub use dispatcher::Dispatcher;
pub use error::HandlerError;
pub use handler::{
    error_handler_fn, handler_fn, ErrorHandler, Handler, HandlerResult, Next, Reply,
};
