use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use warden_dns_domain::CliOverrides;

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "warden-dns")]
#[command(version)]
#[command(about = "Warden DNS - filtering DNS forwarder with per-domain policy")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config.logging);
    bootstrap::log_summary(&config);

    info!("Starting Warden DNS v{}", env!("CARGO_PKG_VERSION"));

    let services = di::DnsServices::new(&config).await?;
    let shutdown = CancellationToken::new();

    services.start_jobs(&config, shutdown.clone());
    tokio::spawn(server::wait_for_signal(shutdown.clone()));

    let result = server::start_dns_server(&config.server, services.engine.clone(), shutdown.clone()).await;
    shutdown.cancel();
    services.upstream.close().await;

    if let Err(e) = result {
        error!(error = %e, "DNS server error");
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
