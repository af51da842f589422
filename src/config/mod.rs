//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ListenConfig, ...)
//! - [`authz`]: Role-to-action grant mapping (RoleBlock, RoleMap)
//! - [`validation`]: Startup validation collecting all errors at once

pub mod authz;
mod types;
pub mod validation;

pub use authz::{RoleBlock, RoleMap};
pub use types::{
    AuthzConfig, Config, ConfigError, DatabaseConfig, ListenConfig, SecurityConfig, ServerConfig,
    TokensConfig, is_default_secret,
};
