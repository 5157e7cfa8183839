//! Client-role building blocks: the initiator half of the session engine,
//! and a resilient wrapper that reconnects and re-handshakes automatically
//! across transport failures.

pub mod reconnection;
pub mod resilient;
pub mod session;

pub use reconnection::ReconnectPolicy;
pub use resilient::{ChangeHandler, ConnectionState, ResilientClient};
pub use session::ClientSession;
