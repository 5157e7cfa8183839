//! Configuration for the resumable HTTP streaming transport, both the
//! server-exposed endpoint and the client that consumes it.

use std::time::Duration;

use super::retry::RetryPolicy;

/// Server-side endpoint configuration.
#[derive(Debug, Clone)]
pub struct HttpStreamingConfig {
    pub bind_addr: String,
    pub endpoint_path: String,
    pub keep_alive: Duration,
    pub max_events_per_stream: usize,
    pub priming_event: bool,
}

impl Default for HttpStreamingConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            endpoint_path: "/mcp".to_string(),
            keep_alive: Duration::from_secs(30),
            max_events_per_stream: 1024,
            priming_event: true,
        }
    }
}

impl HttpStreamingConfig {
    pub fn builder() -> HttpStreamingConfigBuilder {
        HttpStreamingConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpStreamingConfigBuilder {
    config: HttpStreamingConfig,
}

impl HttpStreamingConfigBuilder {
    pub fn with_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.config.endpoint_path = path.into();
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn with_max_events_per_stream(mut self, max: usize) -> Self {
        self.config.max_events_per_stream = max;
        self
    }

    pub fn without_priming_event(mut self) -> Self {
        self.config.priming_event = false;
        self
    }

    pub fn build(self) -> HttpStreamingConfig {
        self.config
    }
}

/// Client-side configuration: where to connect, and how hard to retry.
#[derive(Debug, Clone)]
pub struct HttpStreamingClientConfig {
    pub base_url: String,
    pub endpoint_path: String,
    pub retry_policy: RetryPolicy,
    pub max_retries: u32,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
}

impl Default for HttpStreamingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            endpoint_path: "/mcp".to_string(),
            retry_policy: RetryPolicy::exponential_default(),
            max_retries: 5,
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(15),
        }
    }
}

impl HttpStreamingClientConfig {
    /// Full URL the client issues requests against.
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = HttpStreamingConfig::builder()
            .with_bind_address("0.0.0.0:9000")
            .with_endpoint_path("/rpc")
            .without_priming_event()
            .build();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.endpoint_path, "/rpc");
        assert!(!config.priming_event);
    }

    #[test]
    fn endpoint_url_joins_base_and_path_without_double_slash() {
        let config = HttpStreamingClientConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint_url(), "http://localhost:8080/mcp");
    }
}
