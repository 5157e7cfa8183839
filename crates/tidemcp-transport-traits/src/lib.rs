//! The transport contract shared by every concrete transport: framed
//! byte-message duplex, fatal/transient error classification, and a
//! factory trait the resilient client uses to rebuild connections.

pub mod error;
pub mod message;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use message::{TransportMessage, TransportMessageMetadata};
pub use traits::{Transport, TransportCapabilities, TransportFactory, TransportState};
