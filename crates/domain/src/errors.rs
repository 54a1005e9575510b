use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirectTarget(String),

    #[error("Invalid upstream address: {0}")]
    InvalidUpstreamAddress(String),

    #[error("Blocklist check failed: {0}")]
    BlocklistCheckFailed(String),

    #[error("Policy evaluation failed: {0}")]
    PolicyEvaluationFailed(String),

    #[error("Transport timeout talking to {server}")]
    TransportTimeout { server: String },

    #[error("Transport I/O error with {server}: {reason}")]
    TransportIo { server: String, reason: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Upstream pool exhausted for {server}")]
    PoolExhausted { server: String },

    #[error("Upstream pool is closed for {server}")]
    PoolClosed { server: String },

    #[error("Failed to bind {transport} listener on {addr}: {reason}")]
    BindFailed {
        transport: &'static str,
        addr: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No healthy upstream servers available")]
    TransportNoHealthyServers,
}
