//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body accumulation)
//!     → request.rs (RawRequest → RequestView)
//!     → dispatch (route matching + handler chain)
//!     → response.rs (ResponseSink → status + JSON/text body)
//!     → Send to client
//! ```

pub mod request;
pub mod request_id;
pub mod response;
pub mod server;

pub use request::{BodyError, RawRequest, RequestView};
pub use request_id::{UuidRequestId, X_REQUEST_ID};
pub use response::{ResponseParts, ResponseSink};
pub use server::HttpServer;
