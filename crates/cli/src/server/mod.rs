pub mod dns;
pub mod signal;

pub use dns::start_dns_server;
pub use signal::wait_for_signal;
