use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Routing state of an upstream resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ResolverState {
    Healthy = 0,
    Degraded = 1,
    Down = 2,
}

impl ResolverState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Healthy,
            1 => Self::Degraded,
            _ => Self::Down,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one resolver for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolverSnapshot {
    pub id: String,
    pub name: String,
    /// A success was seen within the freshness window.
    pub healthy: bool,
    pub state: ResolverState,
    pub avg_latency_ms: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub error_count: u64,
}
