use super::{domain_suffixes, normalize_domain};
use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tracing::debug;
use warden_dns_application::ports::PolicyEngine;
use warden_dns_domain::{Decision, DomainError, PolicyAction, PolicyConfig, PolicyRule};

#[derive(Debug)]
struct CompiledRule {
    decision: Decision,
    domains: FxHashSet<String>,
}

impl CompiledRule {
    fn compile(rule: &PolicyRule) -> Self {
        let decision = Decision {
            action: rule.action,
            policy_id: Some(rule.id.clone()),
            category: rule.category.clone(),
            redirect_ip: match rule.action {
                PolicyAction::Redirect => rule.redirect_ip.clone(),
                _ => None,
            },
        };

        let domains = rule
            .domains
            .iter()
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty())
            .collect();

        Self { decision, domains }
    }

    fn matches(&self, domain: &str) -> bool {
        domain_suffixes(domain).any(|suffix| self.domains.contains(suffix))
    }
}

/// Ordered rule list from configuration. The first rule listing the domain
/// or one of its parents decides; anything else is allowed.
#[derive(Debug)]
pub struct StaticPolicyEngine {
    enabled: bool,
    rules: Vec<CompiledRule>,
}

impl StaticPolicyEngine {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            enabled: config.enabled,
            rules: config.rules.iter().map(CompiledRule::compile).collect(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn decide(&self, domain: &str) -> Decision {
        if !self.enabled {
            return Decision::allow();
        }

        let domain = normalize_domain(domain);
        self.rules
            .iter()
            .find(|rule| rule.matches(&domain))
            .map(|rule| {
                debug!(domain = %domain, policy = ?rule.decision.policy_id, action = %rule.decision.action, "Policy matched");
                rule.decision.clone()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl PolicyEngine for StaticPolicyEngine {
    async fn evaluate(&self, domain: &str) -> Result<Decision, DomainError> {
        Ok(self.decide(domain))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
