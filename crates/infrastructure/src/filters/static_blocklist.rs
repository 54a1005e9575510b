use super::{domain_suffixes, normalize_domain};
use async_trait::async_trait;
use rustc_hash::FxHashSet;
use warden_dns_application::ports::BlocklistChecker;
use warden_dns_domain::{BlockingConfig, DomainError};

/// In-memory blocklist. An entry blocks the domain itself and every
/// subdomain under it.
#[derive(Debug, Default)]
pub struct StaticBlocklist {
    domains: FxHashSet<String>,
}

impl StaticBlocklist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| normalize_domain(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn from_config(config: &BlockingConfig) -> Self {
        Self::new(&config.domains)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let blocked = domain_suffixes(&domain).any(|suffix| self.domains.contains(suffix));
        blocked
    }
}

#[async_trait]
impl BlocklistChecker for StaticBlocklist {
    async fn is_blocked(&self, domain: &str) -> Result<bool, DomainError> {
        Ok(self.contains(domain))
    }
}
