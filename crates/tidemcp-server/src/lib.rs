//! Server-role building blocks: the responder half of the session engine,
//! the long-running task subsystem, and the tool/resource/prompt
//! registries a server exposes to clients.

pub mod registry;
pub mod session;
pub mod task;

pub use registry::prompts::{PromptDefinition, PromptRegistry};
pub use registry::resources::{ResourceDefinition, ResourceRegistry};
pub use registry::tools::{ToolDefinition, ToolRegistry};
pub use session::ServerSession;
pub use task::gating;
pub use task::queue::TaskQueueRegistry;
pub use task::store::{TaskOutcome, TaskStore};
