use crate::dns::transport::{ConnectionPool, PoolStats};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use warden_dns_domain::{DomainError, ResolverSnapshot, ResolverState, UpstreamResolver};

/// A resolver counts as healthy for reporting if it answered this recently.
const FRESHNESS_WINDOW_MS: i64 = 30_000;

#[derive(Default)]
struct ResolverStats {
    avg_latency_ms: AtomicU32,
    /// Unix millis of the last success, 0 if never.
    last_success_ms: AtomicI64,
    last_error: ArcSwapOption<DomainError>,
    success_count: AtomicU64,
    error_count: AtomicU64,
    consecutive_exhaustions: AtomicU32,
}

/// One configured upstream with its pool, routing state and counters.
pub struct ManagedResolver {
    config: UpstreamResolver,
    pool: ConnectionPool,
    state: AtomicU8,
    stats: ResolverStats,
}

impl ManagedResolver {
    pub async fn connect(config: UpstreamResolver, tcp_slots: usize) -> Result<Self, DomainError> {
        let addr = socket_addr(&config)?;
        let pool = ConnectionPool::connect(addr, tcp_slots).await?;

        Ok(Self {
            config,
            pool,
            state: AtomicU8::new(ResolverState::Healthy.as_u8()),
            stats: ResolverStats::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.pool.server()
    }

    pub fn state(&self) -> ResolverState {
        ResolverState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn swap_state(&self, next: ResolverState) -> ResolverState {
        ResolverState::from_u8(self.state.swap(next.as_u8(), Ordering::AcqRel))
    }

    /// One pool exchange, with the outcome recorded in the stats.
    pub async fn exchange(&self, query: &Message, timeout: Duration) -> Result<Message, DomainError> {
        let start = Instant::now();
        match self.pool.exchange(query, timeout).await {
            Ok(response) => {
                self.record_success(start.elapsed());
                Ok(response)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_success(&self, latency: Duration) {
        let sample = latency.as_millis().min(u32::MAX as u128) as u32;
        let _ = self
            .stats
            .avg_latency_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |avg| {
                Some(if avg == 0 {
                    sample
                } else {
                    avg.saturating_mul(7).saturating_add(sample) / 8
                })
            });
        self.stats
            .last_success_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        self.stats.success_count.fetch_add(1, Ordering::Relaxed);
        self.stats.last_error.store(None);
        self.stats.consecutive_exhaustions.store(0, Ordering::Release);

        let previous = self.swap_state(ResolverState::Healthy);
        if previous != ResolverState::Healthy {
            info!(resolver = %self.config.id, previous = %previous, "Resolver marked HEALTHY");
        }
    }

    fn record_failure(&self, error: &DomainError) {
        self.stats.error_count.fetch_add(1, Ordering::Relaxed);
        self.stats.last_error.store(Some(Arc::new(error.clone())));
    }

    /// Called after every attempt against this resolver failed. Returns the
    /// new state: `Down` once `down_after` rounds failed back to back, else
    /// `Degraded`.
    pub fn mark_exhausted(&self, down_after: u32) -> ResolverState {
        let rounds = self
            .stats
            .consecutive_exhaustions
            .fetch_add(1, Ordering::AcqRel)
            + 1;

        let next = if down_after > 0 && rounds >= down_after {
            ResolverState::Down
        } else {
            ResolverState::Degraded
        };

        let previous = self.swap_state(next);
        if previous != next {
            warn!(resolver = %self.config.id, rounds, state = %next, "Resolver downgraded");
        }
        next
    }

    pub fn is_healthy(&self) -> bool {
        let last = self.stats.last_success_ms.load(Ordering::Acquire);
        last > 0 && Utc::now().timestamp_millis() - last < FRESHNESS_WINDOW_MS
    }

    pub fn snapshot(&self) -> ResolverSnapshot {
        let last_success_ms = self.stats.last_success_ms.load(Ordering::Acquire);
        ResolverSnapshot {
            id: self.config.id.clone(),
            name: self.config.display_name().to_string(),
            healthy: self.is_healthy(),
            state: self.state(),
            avg_latency_ms: self.stats.avg_latency_ms.load(Ordering::Relaxed),
            last_error: self.stats.last_error.load_full().map(|e| e.to_string()),
            last_success: (last_success_ms > 0)
                .then(|| DateTime::<Utc>::from_timestamp_millis(last_success_ms))
                .flatten(),
            success_count: self.stats.success_count.load(Ordering::Relaxed),
            error_count: self.stats.error_count.load(Ordering::Relaxed),
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn socket_addr(config: &UpstreamResolver) -> Result<SocketAddr, DomainError> {
    config.endpoint().parse().map_err(|_| {
        DomainError::InvalidUpstreamAddress(format!(
            "resolver '{}' has unparsable address '{}'",
            config.id, config.address
        ))
    })
}
