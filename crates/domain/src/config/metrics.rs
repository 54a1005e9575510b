use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_slice_secs")]
    pub slice_secs: u64,

    /// 0 disables the periodic reporter.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

impl MetricsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn slice(&self) -> Duration {
        Duration::from_secs(self.slice_secs)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            slice_secs: default_slice_secs(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    300
}

fn default_slice_secs() -> u64 {
    30
}

fn default_report_interval_secs() -> u64 {
    10
}
