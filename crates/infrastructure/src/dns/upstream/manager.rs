use super::managed_resolver::ManagedResolver;
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_dns_application::ports::UpstreamExchanger;
use warden_dns_domain::{DomainError, ResolverSnapshot, ResolverState, UpstreamConfig};

/// Priority-ordered resolver set with retry and failover.
pub struct UpstreamManager {
    resolvers: Vec<Arc<ManagedResolver>>,
    down_after: u32,
}

impl UpstreamManager {
    /// Connects one pool per configured resolver. Resolvers are ordered by
    /// ascending priority once; equal priorities keep their config order.
    pub async fn connect(config: &UpstreamConfig) -> Result<Self, DomainError> {
        let mut configured = config.resolvers.clone();
        configured.sort_by_key(|r| r.priority);

        let mut resolvers = Vec::with_capacity(configured.len());
        for resolver in configured {
            let managed = ManagedResolver::connect(resolver, config.tcp_pool_size).await?;
            info!(
                resolver = %managed.id(),
                server = %managed.server_addr(),
                priority = managed.priority(),
                "Upstream resolver ready"
            );
            resolvers.push(Arc::new(managed));
        }

        Ok(Self {
            resolvers,
            down_after: config.down_after,
        })
    }

    pub fn resolvers(&self) -> &[Arc<ManagedResolver>] {
        &self.resolvers
    }

    pub async fn exchange(
        &self,
        query: &Message,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Message, DomainError> {
        let attempts = max_retries.max(1);
        let mut last_error = None;

        for resolver in &self.resolvers {
            if resolver.state() == ResolverState::Down {
                debug!(resolver = %resolver.id(), "Skipping resolver marked down");
                continue;
            }

            for attempt in 1..=attempts {
                match resolver.exchange(query, timeout).await {
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        warn!(
                            resolver = %resolver.id(),
                            attempt,
                            attempts,
                            error = %e,
                            "Upstream attempt failed"
                        );
                        last_error = Some(e);
                    }
                }
            }

            resolver.mark_exhausted(self.down_after);
        }

        Err(last_error.unwrap_or(DomainError::TransportNoHealthyServers))
    }

    /// Sends a root NS query to every resolver that is not `Healthy`. A
    /// successful answer promotes it back. Returns how many recovered.
    pub async fn probe_unhealthy(&self, timeout: Duration) -> usize {
        let mut recovered = 0;

        for resolver in &self.resolvers {
            if resolver.state() == ResolverState::Healthy {
                continue;
            }

            match resolver.exchange(&probe_query(), timeout).await {
                Ok(_) => {
                    info!(resolver = %resolver.id(), "Recovery probe succeeded");
                    recovered += 1;
                }
                Err(e) => {
                    debug!(resolver = %resolver.id(), error = %e, "Recovery probe failed");
                }
            }
        }

        recovered
    }

    pub fn snapshot(&self) -> Vec<ResolverSnapshot> {
        self.resolvers.iter().map(|r| r.snapshot()).collect()
    }

    pub async fn close(&self) {
        for resolver in &self.resolvers {
            resolver.close().await;
        }
    }
}

#[async_trait]
impl UpstreamExchanger for UpstreamManager {
    async fn exchange(
        &self,
        query: &Message,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Message, DomainError> {
        UpstreamManager::exchange(self, query, timeout, max_retries).await
    }

    fn snapshot(&self) -> Vec<ResolverSnapshot> {
        UpstreamManager::snapshot(self)
    }
}

fn probe_query() -> Message {
    let mut message = Message::new();
    message
        .set_id(fastrand::u16(..))
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::root(), RecordType::NS));
    message
}
