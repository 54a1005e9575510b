use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use warden_dns_application::use_cases::QueryEngine;
use warden_dns_domain::ServerConfig;
use warden_dns_infrastructure::dns::DnsServer;

/// Binds both listeners and serves until `shutdown` fires.
pub async fn start_dns_server(
    config: &ServerConfig,
    engine: Arc<QueryEngine>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let server = match DnsServer::bind(config, engine.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!(listen = %config.listen_addr(), error = %e, "Failed to bind DNS listeners");
            return Err(e.into());
        }
    };

    server.serve(shutdown).await;
    Ok(())
}
