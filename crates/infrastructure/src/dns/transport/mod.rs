pub mod connection_pool;
pub mod tcp;
pub mod udp;

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use warden_dns_domain::DomainError;

pub use connection_pool::{ConnectionPool, PoolStats};

pub(crate) const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Writes one DNS message with its 2-byte big-endian length prefix.
pub(crate) async fn write_framed<S>(stream: &mut S, message: &[u8]) -> io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    if message.len() > MAX_TCP_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message of {} bytes does not fit a TCP frame", message.len()),
        ));
    }
    let length = message.len() as u16;

    let mut frame = Vec::with_capacity(message.len() + 2);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(message);

    stream.write_all(&frame).await?;
    stream.flush().await
}

/// Reads one length-prefixed DNS message. A clean EOF before the prefix
/// surfaces as `UnexpectedEof`.
pub(crate) async fn read_framed<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let length = u16::from_be_bytes(len_buf) as usize;
    let mut message = vec![0u8; length];
    stream.read_exact(&mut message).await?;

    Ok(message)
}

pub(crate) fn io_error(server: SocketAddr, error: io::Error) -> DomainError {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => DomainError::TransportConnectionRefused {
            server: server.to_string(),
        },
        io::ErrorKind::TimedOut => DomainError::TransportTimeout {
            server: server.to_string(),
        },
        _ => DomainError::TransportIo {
            server: server.to_string(),
            reason: error.to_string(),
        },
    }
}
