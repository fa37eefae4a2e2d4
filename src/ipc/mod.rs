//! Framed TCP transport for JSON-RPC.
//!
//! Same per-frame semantics as the WebSocket surface, carried in
//! length-prefixed frames (see [`codec`]).

pub mod codec;
pub mod server;

pub use codec::{Frame, FrameKind};
pub use server::IpcServer;
