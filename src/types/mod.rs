//! Core types for the gateway.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for servers, sync, executor and store

mod config;
mod errors;

pub use config::{
    Config, ExecutorConfig, IpcConfig, ObservabilityConfig, ServerConfig, StoreConfig, SyncConfig,
};
pub use errors::{Error, Result};
