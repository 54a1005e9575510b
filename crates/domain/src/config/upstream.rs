use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<UpstreamResolver>,

    /// TCP connections kept per resolver.
    #[serde(default = "default_tcp_pool_size")]
    pub tcp_pool_size: usize,

    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    /// Attempts per resolver before failing over.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Consecutive exhausted rounds before a resolver is taken out of
    /// rotation. 0 keeps degraded resolvers in rotation forever.
    #[serde(default = "default_down_after")]
    pub down_after: u32,
}

impl UpstreamConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            tcp_pool_size: default_tcp_pool_size(),
            query_timeout_ms: default_query_timeout(),
            max_retries: default_max_retries(),
            down_after: default_down_after(),
        }
    }
}

/// Static description of one upstream resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamResolver {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Lower is tried first.
    #[serde(default)]
    pub priority: i32,
}

impl UpstreamResolver {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16, priority: i32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            address: address.into(),
            port,
            priority,
        }
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

fn default_resolvers() -> Vec<UpstreamResolver> {
    vec![
        UpstreamResolver {
            id: "cloudflare".to_string(),
            name: "Cloudflare".to_string(),
            address: "1.1.1.1".to_string(),
            port: 53,
            priority: 0,
        },
        UpstreamResolver {
            id: "google".to_string(),
            name: "Google".to_string(),
            address: "8.8.8.8".to_string(),
            port: 53,
            priority: 1,
        },
    ]
}

fn default_port() -> u16 {
    53
}

fn default_tcp_pool_size() -> usize {
    4
}

fn default_query_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    2
}

fn default_down_after() -> u32 {
    3
}
