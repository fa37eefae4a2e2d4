//! Tool infrastructure: definitions, template rendering and the live registry.
//!
//! Tools are data: a definition describes how to build a downstream call and
//! the registry serves the currently enabled set to the front ends.

pub mod definition;
pub mod registry;
pub mod template;

pub use definition::{HttpSpec, RpcClientSpec, ToolDefinition, TransportKind, TransportSpec};
pub use registry::{RegistrySnapshot, ToolHandle, ToolRegistry, ToolSummary};
pub use template::render;
