//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, IdentityConfig, ServerConfig, ...)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup checks that serde cannot express
//!
//! `Config` also implements [`crate::prefs::Preferences`], which is how the
//! engine reads it.

mod defaults;
mod prefs;
mod types;
mod validation;

pub use types::{
    Config, ConfigError, EncodingConfig, IdentifyBlock, IdentityConfig, KeepaliveConfig,
    ServerConfig,
};
pub use validation::{ValidationError, validate};
