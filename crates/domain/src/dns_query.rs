use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Transport a query arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound query, alive only while it is being answered.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    /// First question name, fully qualified (`ads.example.com.`).
    pub domain: Arc<str>,
    pub client: SocketAddr,
    pub transport: Transport,
}

impl DnsQuery {
    pub fn new(domain: impl Into<Arc<str>>, client: SocketAddr, transport: Transport) -> Self {
        Self {
            domain: domain.into(),
            client,
            transport,
        }
    }
}
