use async_trait::async_trait;
use warden_dns_domain::{Decision, DomainError};

#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn evaluate(&self, domain: &str) -> Result<Decision, DomainError>;

    /// Reported in engine status only; the pipeline always calls `evaluate`.
    fn is_enabled(&self) -> bool {
        true
    }
}
