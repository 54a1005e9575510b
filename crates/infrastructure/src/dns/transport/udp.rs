//! Shared UDP channel to one upstream (RFC 1035 §4.2.1).
//!
//! The socket is connected, so the kernel filters datagrams from other
//! sources. Exchanges are serialized behind an async mutex; answers to an
//! earlier, timed-out query are skipped by message id.

use super::io_error;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use warden_dns_domain::DomainError;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpChannel {
    server: SocketAddr,
    socket: Mutex<Option<UdpSocket>>,
}

impl UdpChannel {
    pub async fn connect(server: SocketAddr) -> Result<Self, DomainError> {
        let bind_addr = if server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| io_error(server, e))?;
        socket
            .connect(server)
            .await
            .map_err(|e| io_error(server, e))?;

        Ok(Self {
            server,
            socket: Mutex::new(Some(socket)),
        })
    }

    pub async fn exchange(
        &self,
        query: &[u8],
        id: u16,
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        let guard = self.socket.lock().await;
        let socket = guard.as_ref().ok_or_else(|| DomainError::PoolClosed {
            server: self.server.to_string(),
        })?;
        // Waiting for the socket does not count against the exchange.
        let deadline = Instant::now() + timeout;

        let exchange = async {
            socket.send(query).await?;

            let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
            loop {
                let len = socket.recv(&mut buf).await?;
                if len >= 2 && u16::from_be_bytes([buf[0], buf[1]]) == id {
                    buf.truncate(len);
                    return Ok::<_, std::io::Error>(buf);
                }
                debug!(server = %self.server, len, "Discarding stale UDP response");
            }
        };

        match tokio::time::timeout_at(deadline, exchange).await {
            Ok(Ok(bytes)) => {
                debug!(server = %self.server, bytes = bytes.len(), "UDP response received");
                Ok(bytes)
            }
            Ok(Err(e)) => Err(io_error(self.server, e)),
            Err(_) => Err(DomainError::TransportTimeout {
                server: self.server.to_string(),
            }),
        }
    }

    /// Waits for an in-flight exchange, then drops the socket.
    pub async fn close(&self) {
        self.socket.lock().await.take();
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}
