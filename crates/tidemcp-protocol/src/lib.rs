//! Wire types for the Model Context Protocol session core: the dynamic
//! [`Value`], the JSON-RPC 2.0 envelope, capability bags, the initialize
//! handshake, task subsystem payloads, and method-name constants.
//!
//! This crate has no async runtime dependency — it only encodes/decodes.

pub mod capabilities;
pub mod initialization;
pub mod jsonrpc;
pub mod methods;
pub mod tasks;
pub mod value;

pub use capabilities::{ClientCapabilities, ServerCapabilities, TasksCapability};
pub use initialization::{Implementation, InitializeRequest, InitializeResult};
pub use jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, ResponseId,
};
pub use tasks::{Task, TaskStatus};
pub use value::{ExtraFields, Value};
