use crate::decision::PolicyAction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Evaluated in order; the first matching rule wins.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            rules: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyRule {
    pub id: String,

    #[serde(default)]
    pub category: Option<String>,

    pub action: PolicyAction,

    #[serde(default)]
    pub domains: Vec<String>,

    #[serde(default)]
    pub redirect_ip: Option<String>,
}

fn default_enabled() -> bool {
    true
}
