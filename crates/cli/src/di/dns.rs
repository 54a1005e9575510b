use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_dns_application::services::LatencyMetrics;
use warden_dns_application::use_cases::QueryEngine;
use warden_dns_domain::Config;
use warden_dns_infrastructure::dns::UpstreamManager;
use warden_dns_infrastructure::filters::{StaticBlocklist, StaticPolicyEngine};
use warden_dns_infrastructure::jobs::{MetricsReporterJob, ResolverRecoveryJob};

pub struct DnsServices {
    pub engine: Arc<QueryEngine>,
    pub upstream: Arc<UpstreamManager>,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing DNS services");

        let upstream = Arc::new(UpstreamManager::connect(&config.upstream).await?);

        let policy = StaticPolicyEngine::from_config(&config.policy);
        info!(
            enabled = config.policy.enabled,
            rules = policy.rule_count(),
            "Policy engine ready"
        );

        let metrics = Arc::new(LatencyMetrics::new(
            config.metrics.window(),
            config.metrics.slice(),
        ));

        let mut engine = QueryEngine::new(
            Arc::new(policy),
            upstream.clone(),
            metrics,
            config.upstream.query_timeout(),
            config.upstream.max_retries,
        );

        if config.blocking.enabled {
            let blocklist = StaticBlocklist::from_config(&config.blocking);
            info!(domains = blocklist.len(), "Blocklist loaded");
            engine = engine.with_blocklist(Arc::new(blocklist));
        }

        Ok(Self {
            engine: Arc::new(engine),
            upstream,
        })
    }

    pub fn start_jobs(&self, config: &Config, shutdown: CancellationToken) {
        let recovery = Arc::new(
            ResolverRecoveryJob::new(self.upstream.clone())
                .with_interval(config.health.probe_interval_secs)
                .with_probe_timeout(Duration::from_millis(config.health.probe_timeout_ms))
                .with_cancellation(shutdown.clone()),
        );
        tokio::spawn(recovery.start());

        let reporter = Arc::new(
            MetricsReporterJob::new(self.engine.clone())
                .with_upstream(self.upstream.clone())
                .with_interval(config.metrics.report_interval_secs)
                .with_cancellation(shutdown),
        );
        tokio::spawn(reporter.start());
    }
}
