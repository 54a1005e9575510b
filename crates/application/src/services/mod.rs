pub mod latency_metrics;
pub mod response_builder;
pub mod runtime_state;

pub use latency_metrics::{
    estimate_percentile, AggregatedMetrics, Clock, LatencyMetrics, ManualClock, SystemClock,
    BUCKET_BOUNDS_MS, BUCKET_COUNT,
};
pub use response_builder::{ResponseBuilder, REDIRECT_TTL};
pub use runtime_state::RuntimeState;
