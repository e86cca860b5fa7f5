//! Parsing and validation of `volta.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`]: which design to compile, where its library lives, compile
//! options, and the refinement directives (class and instance substitutions,
//! parameter value overrides) applied during instantiation.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_project, CompileOverrides, ResolvedProject};
pub use types::*;
