pub mod metrics_reporter;
pub mod resolver_recovery;

pub use metrics_reporter::MetricsReporterJob;
pub use resolver_recovery::ResolverRecoveryJob;
