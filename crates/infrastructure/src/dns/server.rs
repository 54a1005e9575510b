use crate::dns::transport::{read_framed, write_framed};
use hickory_proto::op::Message;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use warden_dns_application::services::ResponseBuilder;
use warden_dns_application::use_cases::QueryEngine;
use warden_dns_domain::{DomainError, ServerConfig, Transport};

const UDP_RECV_BUFFER: usize = 4096;
const MIN_UDP_PAYLOAD: u16 = 512;
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// UDP and TCP listeners on one address, both feeding the query engine.
pub struct DnsServer {
    engine: Arc<QueryEngine>,
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    local_addr: SocketAddr,
    tcp_idle_timeout: Duration,
    drain_timeout: Duration,
}

impl DnsServer {
    /// Binds TCP first, then UDP on the port TCP got, so port 0 yields one
    /// shared ephemeral port. Fails without touching the engine state.
    pub async fn bind(config: &ServerConfig, engine: Arc<QueryEngine>) -> Result<Self, DomainError> {
        let listen = config.listen_addr();
        let addr: SocketAddr = listen
            .parse()
            .map_err(|e| DomainError::ConfigError(format!("Invalid listen address {}: {}", listen, e)))?;

        let tcp = create_tcp_listener(addr).map_err(|e| DomainError::BindFailed {
            transport: "TCP",
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let local_addr = tcp.local_addr().map_err(|e| DomainError::BindFailed {
            transport: "TCP",
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        let udp = create_udp_socket(local_addr).map_err(|e| DomainError::BindFailed {
            transport: "UDP",
            addr: local_addr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            engine,
            udp: Arc::new(udp),
            tcp,
            local_addr,
            tcp_idle_timeout: config.tcp_idle_timeout(),
            drain_timeout: config.drain_timeout(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until `shutdown` fires, then drains in-flight queries for at
    /// most the drain timeout.
    pub async fn serve(self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();

        self.engine.set_running(true);
        self.engine.set_accept_queries(true);
        info!(bind_address = %self.local_addr, "DNS server ready (UDP + TCP)");

        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = run_udp(Arc::clone(&self.engine), Arc::clone(&self.udp), tracker.clone()) => {}
            _ = run_tcp(
                Arc::clone(&self.engine),
                &self.tcp,
                tracker.clone(),
                self.tcp_idle_timeout,
                shutdown.clone(),
            ) => {}
        }

        self.engine.set_accept_queries(false);
        tracker.close();
        info!(in_flight = tracker.len(), "DNS server draining");

        if tokio::time::timeout(self.drain_timeout, tracker.wait())
            .await
            .is_err()
        {
            warn!(
                abandoned = tracker.len(),
                drain_timeout_secs = self.drain_timeout.as_secs(),
                "Drain timeout elapsed with queries still in flight"
            );
        }

        self.engine.set_running(false);
        info!("DNS server stopped");
    }
}

async fn run_udp(engine: Arc<QueryEngine>, socket: Arc<UdpSocket>, tracker: TaskTracker) {
    let mut buf = vec![0u8; UDP_RECV_BUFFER];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                debug!(error = %e, "UDP recv error");
                continue;
            }
        };

        if !engine.accepting_queries() {
            debug!(client = %peer, "Not accepting queries, dropping datagram");
            continue;
        }

        let request = match Message::from_vec(&buf[..len]) {
            Ok(message) => message,
            Err(e) => {
                debug!(client = %peer, error = %e, "Dropping malformed datagram");
                continue;
            }
        };

        let engine = Arc::clone(&engine);
        let socket = Arc::clone(&socket);
        tracker.spawn(async move {
            let Some(response) = engine.process_query(&request, peer, Transport::Udp).await else {
                return;
            };
            let Some(bytes) = encode_for_udp(&request, &response) else {
                return;
            };
            if let Err(e) = socket.send_to(&bytes, peer).await {
                debug!(client = %peer, error = %e, "Failed to send UDP response");
            }
        });
    }
}

/// Serializes a UDP reply, truncating it to header and question when it
/// exceeds what the client advertised.
fn encode_for_udp(request: &Message, response: &Message) -> Option<Vec<u8>> {
    let limit = request.max_payload().max(MIN_UDP_PAYLOAD) as usize;

    let bytes = match response.to_vec() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to encode response");
            return None;
        }
    };
    if bytes.len() <= limit {
        return Some(bytes);
    }

    debug!(size = bytes.len(), limit, "Truncating UDP response");
    ResponseBuilder::truncate(response).to_vec().ok()
}

async fn run_tcp(
    engine: Arc<QueryEngine>,
    listener: &TcpListener,
    tracker: TaskTracker,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    let mut failures = 0u32;

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                failures = 0;
                let engine = Arc::clone(&engine);
                let shutdown = shutdown.clone();
                tracker.spawn(serve_connection(engine, stream, peer, idle_timeout, shutdown));
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = accept_backoff(failures);
                warn!(error = %e, failures, backoff_ms = delay.as_millis() as u64, "TCP accept failed");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Doubles from `ACCEPT_BACKOFF_MIN` per consecutive failure, capped at
/// `ACCEPT_BACKOFF_MAX`.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

async fn serve_connection(
    engine: Arc<QueryEngine>,
    mut stream: TcpStream,
    peer: SocketAddr,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = tokio::time::timeout(idle_timeout, read_framed(&mut stream)) => read,
        };

        let bytes = match read {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    debug!(client = %peer, error = %e, "TCP read failed");
                }
                break;
            }
            Err(_) => {
                debug!(client = %peer, "TCP connection idle, closing");
                break;
            }
        };

        if !engine.accepting_queries() {
            continue;
        }

        let request = match Message::from_vec(&bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!(client = %peer, error = %e, "Dropping malformed TCP message");
                continue;
            }
        };

        let Some(response) = engine.process_query(&request, peer, Transport::Tcp).await else {
            continue;
        };

        let encoded = match response.to_vec() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(client = %peer, error = %e, "Failed to encode response");
                continue;
            }
        };
        if let Err(e) = write_framed(&mut stream, &encoded).await {
            debug!(client = %peer, error = %e, "TCP write failed");
            break;
        }
    }
}

fn socket_domain(addr: SocketAddr) -> Domain {
    if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}

fn create_udp_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(socket_domain(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

fn create_tcp_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(socket_domain(addr), Type::STREAM, Some(Protocol::TCP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}
