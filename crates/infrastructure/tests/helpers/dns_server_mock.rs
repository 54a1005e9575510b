#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::oneshot;

pub const MOCK_ANSWER: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// One A record over both transports.
    Answer,
    /// UDP replies carry TC; TCP answers after `tcp_delay`.
    TruncateUdp { tcp_delay: Duration },
    /// Like `TruncateUdp` without delay, but every TCP connection is closed
    /// right after its first answer.
    TcpHangUp,
    /// Enough A records to overflow a 512-byte UDP reply.
    LargeAnswer { records: usize },
}

#[derive(Default)]
pub struct MockCounters {
    pub udp_queries: AtomicUsize,
    pub tcp_queries: AtomicUsize,
    pub tcp_in_flight: AtomicUsize,
    pub tcp_peak: AtomicUsize,
}

/// In-process upstream listening on UDP and TCP on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    counters: Arc<MockCounters>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(behavior: MockBehavior) -> Result<Self, std::io::Error> {
        Self::start_on(SocketAddr::from(([127, 0, 0, 1], 0)), behavior).await
    }

    pub async fn start_on(addr: SocketAddr, behavior: MockBehavior) -> Result<Self, std::io::Error> {
        let tcp = TcpListener::bind(addr).await?;
        let local_addr = tcp.local_addr()?;
        let udp = UdpSocket::bind(local_addr).await?;

        let counters = Arc::new(MockCounters::default());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let udp_counters = Arc::clone(&counters);
        let tcp_counters = Arc::clone(&counters);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = udp.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            udp_counters.udp_queries.fetch_add(1, Ordering::SeqCst);
                            if let Some(response) = build_response(&buf[..len], behavior, true) {
                                let _ = udp.send_to(&response, peer).await;
                            }
                        }
                    }
                    accepted = tcp.accept() => {
                        if let Ok((stream, _)) = accepted {
                            let counters = Arc::clone(&tcp_counters);
                            tokio::spawn(serve_tcp(stream, behavior, counters));
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr: local_addr,
            counters,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn udp_queries(&self) -> usize {
        self.counters.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.counters.tcp_queries.load(Ordering::SeqCst)
    }

    pub fn total_queries(&self) -> usize {
        self.udp_queries() + self.tcp_queries()
    }

    pub fn tcp_peak(&self) -> usize {
        self.counters.tcp_peak.load(Ordering::SeqCst)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve_tcp(mut stream: TcpStream, behavior: MockBehavior, counters: Arc<MockCounters>) {
    loop {
        let mut len_buf = [0u8; 2];
        if stream.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
        if stream.read_exact(&mut query).await.is_err() {
            return;
        }

        counters.tcp_queries.fetch_add(1, Ordering::SeqCst);
        let in_flight = counters.tcp_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.tcp_peak.fetch_max(in_flight, Ordering::SeqCst);

        if let MockBehavior::TruncateUdp { tcp_delay } = behavior {
            tokio::time::sleep(tcp_delay).await;
        }

        let response = build_response(&query, behavior, false);
        counters.tcp_in_flight.fetch_sub(1, Ordering::SeqCst);

        let Some(response) = response else {
            return;
        };
        let mut frame = (response.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(&response);
        if stream.write_all(&frame).await.is_err() {
            return;
        }
        if matches!(behavior, MockBehavior::TcpHangUp) {
            return;
        }
    }
}

fn build_response(query: &[u8], behavior: MockBehavior, over_udp: bool) -> Option<Vec<u8>> {
    let request = Message::from_vec(query).ok()?;

    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(ResponseCode::NoError);

    let question = request.queries().first()?.clone();
    response.add_query(question.clone());

    match behavior {
        MockBehavior::TruncateUdp { .. } | MockBehavior::TcpHangUp if over_udp => {
            response.set_truncated(true);
        }
        MockBehavior::LargeAnswer { records } => {
            for i in 0..records {
                response.add_answer(Record::from_rdata(
                    question.name().clone(),
                    300,
                    RData::A(A(Ipv4Addr::new(10, 1, (i / 256) as u8, (i % 256) as u8))),
                ));
            }
        }
        _ => {
            response.add_answer(Record::from_rdata(
                question.name().clone(),
                300,
                RData::A(A(MOCK_ANSWER)),
            ));
        }
    }

    response.to_vec().ok()
}

/// An address with nothing listening on it. UDP sends there come back as
/// connection refused, TCP dials are refused outright.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
