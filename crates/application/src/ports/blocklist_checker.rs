use async_trait::async_trait;
use warden_dns_domain::DomainError;

#[async_trait]
pub trait BlocklistChecker: Send + Sync {
    /// `domain` is the question name as received, fully qualified.
    async fn is_blocked(&self, domain: &str) -> Result<bool, DomainError>;
}
