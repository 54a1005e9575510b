use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub accepting_queries: bool,
    pub policy_enabled: bool,
    pub last_error: Option<String>,
}
