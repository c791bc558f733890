//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AnchorConfig (validated, immutable)
//!
//! named values (RPC URL, key, explorer base)
//!     → source.rs (environment lookup, once per process)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the config file, only their names

pub mod loader;
pub mod schema;
pub mod source;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AnchorConfig, AnchorSettings, LogFormat, ObservabilityConfig, ServerConfig};
pub use source::{EnvSource, MapSource, ValueSource};
