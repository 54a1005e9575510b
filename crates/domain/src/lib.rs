//! Warden DNS Domain Layer
pub mod config;
pub mod decision;
pub mod dns_query;
pub mod errors;
pub mod resolver;
pub mod status;

pub use config::{
    BlockingConfig, CliOverrides, Config, ConfigError, HealthConfig, LoggingConfig,
    MetricsConfig, PolicyConfig, PolicyRule, ServerConfig, UpstreamConfig, UpstreamResolver,
};
pub use decision::{Decision, PolicyAction};
pub use dns_query::{DnsQuery, Transport};
pub use errors::DomainError;
pub use resolver::{ResolverSnapshot, ResolverState};
pub use status::EngineStatus;
