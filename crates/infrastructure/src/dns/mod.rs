pub mod server;
pub mod transport;
pub mod upstream;

pub use server::DnsServer;
pub use transport::{ConnectionPool, PoolStats};
pub use upstream::{ManagedResolver, UpstreamManager};
