//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (app.rs):
//!     Register routes → Freeze dispatcher → Bind listener → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → Stop accepting → Drain in-flight → Exit
//! ```
//!
//! # Design Decisions
//! - Routes are frozen before the listener binds
//! - Ordered shutdown: stop accept, drain, close

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
