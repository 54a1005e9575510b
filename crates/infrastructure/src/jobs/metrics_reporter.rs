use crate::dns::upstream::UpstreamManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_dns_application::services::AggregatedMetrics;
use warden_dns_application::use_cases::QueryEngine;

const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Logs the sliding-window latency summary and one line per resolver.
pub struct MetricsReporterJob {
    engine: Arc<QueryEngine>,
    upstream: Option<Arc<UpstreamManager>>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl MetricsReporterJob {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self {
            engine,
            upstream: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    /// Adds TCP pool usage to each resolver line.
    pub fn with_upstream(mut self, upstream: Arc<UpstreamManager>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn report(&self) -> AggregatedMetrics {
        let metrics = self.engine.metrics();
        let agg = metrics.aggregate();
        let status = self.engine.status();

        info!(
            window_secs = metrics.window().as_secs(),
            total = agg.total,
            errors = agg.errors,
            error_rate = format_args!("{:.3}", agg.error_rate()),
            p50_ms = agg.p50().as_millis() as u64,
            p95_ms = agg.p95().as_millis() as u64,
            p99_ms = agg.p99().as_millis() as u64,
            accepting = status.accepting_queries,
            "Query metrics"
        );

        for resolver in self.engine.resolver_snapshot() {
            info!(
                resolver = %resolver.id,
                state = %resolver.state,
                healthy = resolver.healthy,
                avg_latency_ms = resolver.avg_latency_ms,
                successes = resolver.success_count,
                errors = resolver.error_count,
                last_error = resolver.last_error.as_deref().unwrap_or("-"),
                "Resolver status"
            );
        }

        if let Some(upstream) = &self.upstream {
            for resolver in upstream.resolvers() {
                let pool = resolver.pool_stats();
                info!(
                    resolver = %resolver.id(),
                    tcp_slots = pool.tcp_slots,
                    tcp_in_use = pool.tcp_in_use,
                    tcp_open = pool.tcp_open,
                    "Resolver TCP pool"
                );
            }
        }

        agg
    }

    pub async fn start(self: Arc<Self>) {
        if self.interval_secs == 0 {
            info!("MetricsReporterJob: disabled");
            return;
        }

        info!(interval_secs = self.interval_secs, "Starting metrics reporter job");

        tokio::spawn(async move {
            let period = Duration::from_secs(self.interval_secs);
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("MetricsReporterJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.report();
                    }
                }
            }
        });
    }
}
