//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → read once at startup by the app, server and observability layers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes are registered in code, not here
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, RoutingConfig, ServerConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
