//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered scan of registered routes)
//!     → matcher.rs (method filter + segment walk)
//!     → Return: every matching Route, in registration order
//!
//! Route Registration (at startup):
//!     pattern string
//!     → Parse into literal / `*` / `:param` segments
//!     → Append to RouteTable
//!     → Freeze inside the Dispatcher
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: registration order is the only ordering
//! - All matches returned; the dispatcher decides how many run

pub mod matcher;
pub mod method;
pub mod router;

pub use matcher::{extract_params, matches, MatchPolicy, Params, Pattern, Segment};
pub use method::Method;
pub use router::{Route, RouteTable};
