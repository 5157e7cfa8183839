//! Session engine and message dispatcher shared by both the client and
//! server halves of the session core, plus the unified [`error::McpError`].

pub mod dispatcher;
pub mod error;
pub mod resolver;
pub mod session;

pub use dispatcher::MessageDispatcher;
pub use error::{ErrorKind, McpError, McpResult};
pub use resolver::{pair as resolver_pair, Resolver, Waiter};
pub use session::{NegotiatedCapabilities, Session, SessionState};
