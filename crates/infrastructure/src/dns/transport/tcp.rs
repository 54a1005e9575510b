//! Bounded TCP fallback for one upstream.
//!
//! A fixed set of slots, each holding at most one persistent connection.
//! A slot is reserved under the lock, the connection is moved out and used
//! without the lock, and the slot is finalized under the lock again. When
//! every slot is in use the exchange fails immediately.

use super::{io_error, read_framed, write_framed};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;
use warden_dns_domain::DomainError;

struct Slots {
    conns: Vec<Option<TcpStream>>,
    in_use: Vec<bool>,
    next: usize,
    closed: bool,
}

pub struct TcpSlots {
    server: SocketAddr,
    slots: Mutex<Slots>,
}

/// A reserved slot. Dropping it without `release` clears the slot, so a
/// cancelled exchange never leaves a half-used connection behind.
struct Reservation<'a> {
    pool: &'a TcpSlots,
    index: usize,
    stream: Option<TcpStream>,
    released: bool,
}

impl Reservation<'_> {
    fn release(mut self, stream: TcpStream) {
        self.released = true;
        self.pool.finalize(self.index, Some(stream));
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.pool.finalize(self.index, None);
        }
    }
}

impl TcpSlots {
    pub fn new(server: SocketAddr, size: usize) -> Self {
        Self {
            server,
            slots: Mutex::new(Slots {
                conns: (0..size).map(|_| None).collect(),
                in_use: vec![false; size],
                next: 0,
                closed: false,
            }),
        }
    }

    fn reserve(&self) -> Result<Reservation<'_>, DomainError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        if slots.closed {
            return Err(DomainError::PoolClosed {
                server: self.server.to_string(),
            });
        }

        let size = slots.in_use.len();
        for offset in 0..size {
            let index = (slots.next + offset) % size;
            if !slots.in_use[index] {
                slots.in_use[index] = true;
                slots.next = (index + 1) % size;
                let stream = slots.conns[index].take();
                return Ok(Reservation {
                    pool: self,
                    index,
                    stream,
                    released: false,
                });
            }
        }

        Err(DomainError::PoolExhausted {
            server: self.server.to_string(),
        })
    }

    fn finalize(&self, index: usize, stream: Option<TcpStream>) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.in_use[index] = false;
        if !slots.closed {
            slots.conns[index] = stream;
        }
    }

    pub async fn exchange(&self, query: &[u8], timeout: Duration) -> Result<Vec<u8>, DomainError> {
        let deadline = Instant::now() + timeout;
        let mut reservation = self.reserve()?;

        if let Some(stream) = reservation.stream.take() {
            match self.round_trip(stream, query, deadline).await {
                Ok((stream, response)) => {
                    reservation.release(stream);
                    return Ok(response);
                }
                Err(e) => {
                    debug!(server = %self.server, error = %e, "Pooled TCP connection failed, redialing");
                }
            }
        }

        let stream = self.dial(deadline).await?;
        let (stream, response) = self.round_trip(stream, query, deadline).await?;
        reservation.release(stream);
        Ok(response)
    }

    async fn dial(&self, deadline: Instant) -> Result<TcpStream, DomainError> {
        let stream = tokio::time::timeout_at(deadline, TcpStream::connect(self.server))
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: self.server.to_string(),
            })?
            .map_err(|e| io_error(self.server, e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| io_error(self.server, e))?;

        debug!(server = %self.server, "TCP connection established");
        Ok(stream)
    }

    async fn round_trip(
        &self,
        mut stream: TcpStream,
        query: &[u8],
        deadline: Instant,
    ) -> Result<(TcpStream, Vec<u8>), DomainError> {
        let io = async {
            write_framed(&mut stream, query).await?;
            read_framed(&mut stream).await
        };

        let result = tokio::time::timeout_at(deadline, io).await;
        match result {
            Ok(Ok(response)) => Ok((stream, response)),
            Ok(Err(e)) => Err(io_error(self.server, e)),
            Err(_) => Err(DomainError::TransportTimeout {
                server: self.server.to_string(),
            }),
        }
    }

    /// Drops every idle connection and rejects further reservations.
    /// Connections checked out at this moment are dropped on finalize.
    pub fn close(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.closed = true;
        slots.conns.iter_mut().for_each(|conn| *conn = None);
    }

    /// `(slots, in use, open connections)`
    pub fn stats(&self) -> (usize, usize, usize) {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let in_use = slots.in_use.iter().filter(|&&used| used).count();
        let open = slots.conns.iter().filter(|conn| conn.is_some()).count();
        (slots.in_use.len(), in_use, open)
    }
}
