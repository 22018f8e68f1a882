//! # Playwatch Config
//!
//! Configuration management for Playwatch: TOML files with `${VAR}`
//! expansion, typed sections with defaults, and validation.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
