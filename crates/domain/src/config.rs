pub mod blocking;
pub mod errors;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod root;
pub mod server;
pub mod upstream;

pub use blocking::BlockingConfig;
pub use errors::ConfigError;
pub use health::HealthConfig;
pub use logging::LoggingConfig;
pub use metrics::MetricsConfig;
pub use policy::{PolicyConfig, PolicyRule};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use upstream::{UpstreamConfig, UpstreamResolver};
