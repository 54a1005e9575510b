use crate::dns::upstream::UpstreamManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Periodically probes resolvers that are not `Healthy`. This is the only
/// way a resolver marked down gets back into rotation.
pub struct ResolverRecoveryJob {
    upstream: Arc<UpstreamManager>,
    interval_secs: u64,
    probe_timeout: Duration,
    shutdown: CancellationToken,
}

impl ResolverRecoveryJob {
    pub fn new(upstream: Arc<UpstreamManager>) -> Self {
        Self {
            upstream,
            interval_secs: DEFAULT_INTERVAL_SECS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn run_once(&self) -> usize {
        let recovered = self.upstream.probe_unhealthy(self.probe_timeout).await;
        if recovered > 0 {
            info!(recovered, "Resolver recovery cycle completed");
        }
        recovered
    }

    pub async fn start(self: Arc<Self>) {
        if self.interval_secs == 0 {
            info!("ResolverRecoveryJob: disabled");
            return;
        }

        info!(
            interval_secs = self.interval_secs,
            "Starting resolver recovery job"
        );

        tokio::spawn(async move {
            let period = Duration::from_secs(self.interval_secs);
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("ResolverRecoveryJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }
        });
    }
}
