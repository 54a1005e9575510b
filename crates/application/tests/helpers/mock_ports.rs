use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use warden_dns_application::ports::{BlocklistChecker, PolicyEngine, UpstreamExchanger};
use warden_dns_domain::{Decision, DomainError, ResolverSnapshot, ResolverState};

pub const UPSTREAM_ANSWER: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

pub fn query_message(domain: &str, id: u16) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(domain).unwrap(), RecordType::A));
    message
}

pub fn client_addr() -> SocketAddr {
    "192.168.1.100:53000".parse().unwrap()
}

// ── Blocklist ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockBlocklist {
    domains: Arc<RwLock<HashSet<String>>>,
    should_fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn block(&self, domain: &str) {
        self.domains.write().await.insert(normalize(domain));
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlocklistChecker for MockBlocklist {
    async fn is_blocked(&self, domain: &str) -> Result<bool, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::BlocklistCheckFailed("mock failure".into()));
        }
        Ok(self.domains.read().await.contains(&normalize(domain)))
    }
}

// ── Policy ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockPolicyEngine {
    decisions: Arc<RwLock<HashMap<String, Decision>>>,
    should_fail: Arc<AtomicBool>,
    enabled: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockPolicyEngine {
    pub fn new() -> Self {
        Self {
            decisions: Arc::new(RwLock::new(HashMap::new())),
            should_fail: Arc::new(AtomicBool::new(false)),
            enabled: Arc::new(AtomicBool::new(true)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn set_decision(&self, domain: &str, decision: Decision) {
        self.decisions
            .write()
            .await
            .insert(normalize(domain), decision);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyEngine for MockPolicyEngine {
    async fn evaluate(&self, domain: &str) -> Result<Decision, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::PolicyEvaluationFailed("mock failure".into()));
        }
        Ok(self
            .decisions
            .read()
            .await
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

// ── Upstream ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockUpstream {
    should_fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    last_params: Arc<std::sync::Mutex<Option<(Duration, u32)>>>,
    delay: Arc<std::sync::Mutex<Option<Duration>>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<(Duration, u32)> {
        *self.last_params.lock().unwrap()
    }
}

#[async_trait]
impl UpstreamExchanger for MockUpstream {
    async fn exchange(
        &self,
        query: &Message,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Message, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some((timeout, max_retries));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::TransportNoHealthyServers);
        }

        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(query.op_code())
            .set_recursion_desired(query.recursion_desired())
            .set_recursion_available(true)
            .set_response_code(ResponseCode::NoError);
        for q in query.queries() {
            response.add_query(q.clone());
            response.add_answer(Record::from_rdata(
                q.name().clone(),
                300,
                RData::A(A(UPSTREAM_ANSWER)),
            ));
        }
        Ok(response)
    }

    fn snapshot(&self) -> Vec<ResolverSnapshot> {
        vec![ResolverSnapshot {
            id: "mock".to_string(),
            name: "Mock upstream".to_string(),
            healthy: true,
            state: ResolverState::Healthy,
            avg_latency_ms: 1,
            last_error: None,
            last_success: None,
            success_count: self.calls() as u64,
            error_count: 0,
        }]
    }
}
