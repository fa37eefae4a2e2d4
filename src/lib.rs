//! # Toolgate - Dynamic Tool-Invocation Gateway
//!
//! Tool definitions live as JSON rows in a store and are hot-reloaded into an
//! in-memory registry. Callers list and invoke tools over:
//! - a plain REST surface
//! - JSON-RPC 2.0 over WebSocket
//! - JSON-RPC 2.0 over length-prefixed TCP frames
//!
//! ## Architecture
//!
//! One sync actor writes the registry; every protocol loop reads it:
//! ```text
//!   ┌────────────┐  tick / force   ┌─────────────┐  swap   ┌──────────────┐
//!   │ ToolStore  │ ──────────────► │ RegistrySync│ ──────► │ ToolRegistry │
//!   └────────────┘                 └─────────────┘         └──────┬───────┘
//!         ▲                                                        │ get/list
//!         │ admin mutations                                        ▼
//!   ┌─────┴──────────────────────────────────────┐         ┌──────────────┐
//!   │ ProtocolGateway (REST, WS, TCP frames)     │ ──────► │ ToolExecutor │
//!   └────────────────────────────────────────────┘         └──────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod executor;
pub mod gateway;
pub mod ipc;
pub mod store;
pub mod sync;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
