use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    #[default]
    Allow,
    Deny,
    Redirect,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "block",
            Self::Redirect => "redirect",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one domain against the policy set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub action: PolicyAction,
    pub policy_id: Option<String>,
    pub category: Option<String>,
    /// Raw target as the policy stores it; parsed when the answer is built.
    pub redirect_ip: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn deny(policy_id: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::Deny,
            policy_id: Some(policy_id.into()),
            ..Self::default()
        }
    }

    pub fn redirect(policy_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::Redirect,
            policy_id: Some(policy_id.into()),
            redirect_ip: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Reason attached to refusals in logs.
    pub fn reason(&self) -> &str {
        self.policy_id.as_deref().unwrap_or("policy")
    }
}
