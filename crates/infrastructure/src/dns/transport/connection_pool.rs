use super::tcp::TcpSlots;
use super::udp::UdpChannel;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use warden_dns_domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub tcp_slots: usize,
    pub tcp_in_use: usize,
    pub tcp_open: usize,
}

/// UDP fast path plus bounded TCP fallback for a single upstream address.
pub struct ConnectionPool {
    server: SocketAddr,
    udp: UdpChannel,
    tcp: TcpSlots,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub async fn connect(server: SocketAddr, tcp_slots: usize) -> Result<Self, DomainError> {
        if tcp_slots == 0 {
            return Err(DomainError::ConfigError(format!(
                "TCP pool for {} needs at least one slot",
                server
            )));
        }

        let udp = UdpChannel::connect(server).await?;

        Ok(Self {
            server,
            udp,
            tcp: TcpSlots::new(server, tcp_slots),
            closed: AtomicBool::new(false),
        })
    }

    /// UDP first; TCP when UDP fails or the answer is truncated.
    pub async fn exchange(&self, query: &Message, timeout: Duration) -> Result<Message, DomainError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }

        let bytes = query
            .to_vec()
            .map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))?;

        match self.udp.exchange(&bytes, query.id(), timeout).await {
            Ok(raw) => match Message::from_vec(&raw) {
                Ok(response) if !response.truncated() => return Ok(response),
                Ok(_) => debug!(server = %self.server, "Truncated UDP response, retrying over TCP"),
                Err(e) => debug!(server = %self.server, error = %e, "Unparsable UDP response, retrying over TCP"),
            },
            Err(e @ DomainError::PoolClosed { .. }) => return Err(e),
            Err(e) => debug!(server = %self.server, error = %e, "UDP exchange failed, retrying over TCP"),
        }

        let raw = self.tcp.exchange(&bytes, timeout).await?;
        let response =
            Message::from_vec(&raw).map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))?;

        if response.id() != query.id() {
            return Err(DomainError::InvalidDnsMessage(format!(
                "TCP response id {} does not match query id {} from {}",
                response.id(),
                query.id(),
                self.server
            )));
        }

        Ok(response)
    }

    /// Idempotent. Later exchanges fail with `PoolClosed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.tcp.close();
        self.udp.close().await;
        debug!(server = %self.server, "Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let (tcp_slots, tcp_in_use, tcp_open) = self.tcp.stats();
        PoolStats {
            tcp_slots,
            tcp_in_use,
            tcp_open,
        }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    fn closed_error(&self) -> DomainError {
        DomainError::PoolClosed {
            server: self.server.to_string(),
        }
    }
}
