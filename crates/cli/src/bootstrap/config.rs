use tracing::info;
use warden_dns_domain::{CliOverrides, Config};

/// Loads, overrides and validates the configuration. Logging is not up yet,
/// so failures surface through the returned error.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    Ok(config)
}

pub fn log_summary(config: &Config) {
    info!(
        listen = %config.server.listen_addr(),
        resolvers = config.upstream.resolvers.len(),
        tcp_pool_size = config.upstream.tcp_pool_size,
        query_timeout_ms = config.upstream.query_timeout_ms,
        max_retries = config.upstream.max_retries,
        blocking = config.blocking.enabled,
        policy_rules = config.policy.rules.len(),
        "Configuration loaded"
    );
}
