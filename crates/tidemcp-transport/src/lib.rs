//! Concrete [`tidemcp_transport_traits::Transport`] implementations: an
//! in-memory paired transport for intra-process use and tests, and a
//! resumable HTTP streaming transport backed by a per-stream event log.

pub mod event_store;
pub mod http;
pub mod memory;

pub use event_store::{Event, EventStore};
pub use http::client::{HttpStreamingTransport, HttpStreamingTransportFactory};
pub use http::config::{HttpStreamingClientConfig, HttpStreamingConfig, HttpStreamingConfigBuilder};
pub use http::retry::RetryPolicy;
pub use http::server::{HttpServerSession, HttpStreamingServer};
pub use memory::{pair as memory_pair, MemoryTransport};
