//! Configuration management for bentoctl
//!
//! This crate handles two kinds of configuration: the tool's own settings,
//! loaded from an optional YAML file and environment variables, and
//! deployment configs, the user documents validated against an operator's
//! schema.

pub mod deployment;
pub mod loader;
pub mod settings;

pub use deployment::{DeploymentConfig, Instances};
pub use loader::SettingsLoader;
pub use settings::*;
