pub mod managed_resolver;
pub mod manager;

pub use managed_resolver::ManagedResolver;
pub use manager::UpstreamManager;
