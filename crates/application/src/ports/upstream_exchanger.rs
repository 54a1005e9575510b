use async_trait::async_trait;
use hickory_proto::op::Message;
use std::time::Duration;
use warden_dns_domain::{DomainError, ResolverSnapshot};

/// Forwards a full DNS message to the upstream resolver set.
///
/// Implementations either return a complete response or an error, never a
/// partial answer. `max_retries` is the number of attempts made against each
/// resolver before moving on to the next one.
#[async_trait]
pub trait UpstreamExchanger: Send + Sync {
    async fn exchange(
        &self,
        query: &Message,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Message, DomainError>;

    fn snapshot(&self) -> Vec<ResolverSnapshot>;
}
