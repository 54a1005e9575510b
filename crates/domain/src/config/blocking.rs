use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Domains refused outright; subdomains are covered too.
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            domains: vec![],
        }
    }
}

fn default_enabled() -> bool {
    true
}
