//! Core types and configuration for the recruit devops tool.
//!
//! This crate defines the `devops.toml` schema ([`DevopsConfig`]), the fixed
//! set of deployable components ([`ComponentId`]), the lifecycle actions that
//! can be run against them ([`Action`]), and shared error types.

pub mod component;
pub mod config;
pub mod error;

pub use component::{Action, ComponentId, Stage};
pub use config::{AwsConfig, ComponentConfig, DevopsConfig, ExecConfig, ToolsConfig};
pub use error::{Error, Result};
