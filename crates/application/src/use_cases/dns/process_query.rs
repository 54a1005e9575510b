use crate::ports::{BlocklistChecker, PolicyEngine, UpstreamExchanger};
use crate::services::{LatencyMetrics, ResponseBuilder, RuntimeState};
use hickory_proto::op::Message;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use warden_dns_domain::{
    Decision, DnsQuery, DomainError, EngineStatus, PolicyAction, ResolverSnapshot, Transport,
};

/// Decision pipeline shared by every inbound query.
///
/// Steps short-circuit in order: blocklist, policy, dispatch. Each query that
/// gets past question parsing records exactly one latency sample.
pub struct QueryEngine {
    state: RuntimeState,
    blocklist: Option<Arc<dyn BlocklistChecker>>,
    policy: Arc<dyn PolicyEngine>,
    upstream: Arc<dyn UpstreamExchanger>,
    metrics: Arc<LatencyMetrics>,
    query_timeout: Duration,
    max_retries: u32,
}

impl QueryEngine {
    pub fn new(
        policy: Arc<dyn PolicyEngine>,
        upstream: Arc<dyn UpstreamExchanger>,
        metrics: Arc<LatencyMetrics>,
        query_timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            state: RuntimeState::new(),
            blocklist: None,
            policy,
            upstream,
            metrics,
            query_timeout,
            max_retries,
        }
    }

    pub fn with_blocklist(mut self, blocklist: Arc<dyn BlocklistChecker>) -> Self {
        self.blocklist = Some(blocklist);
        self
    }

    /// Answers one DNS message. `None` means nothing should be sent back.
    pub async fn process_query(
        &self,
        request: &Message,
        client: SocketAddr,
        transport: Transport,
    ) -> Option<Message> {
        let Some(question) = request.queries().first() else {
            warn!(client = %client, transport = %transport, "Dropping query without a question");
            return None;
        };

        let query = DnsQuery::new(question.name().to_ascii(), client, transport);
        let start = Instant::now();

        let (response, success) = self.run_pipeline(request, &query).await;

        self.metrics.record(start.elapsed(), success);
        response
    }

    async fn run_pipeline(&self, request: &Message, query: &DnsQuery) -> (Option<Message>, bool) {
        if let Some(blocklist) = &self.blocklist {
            match blocklist.is_blocked(&query.domain).await {
                Ok(true) => {
                    info!(
                        domain = %query.domain,
                        client = %query.client,
                        reason = "blocklist",
                        "Query refused"
                    );
                    return (Some(ResponseBuilder::refused(request)), true);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(domain = %query.domain, error = %e, "Blocklist check failed, continuing to policy");
                    self.state.record_error(&e);
                }
            }
        }

        let decision = match self.policy.evaluate(&query.domain).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(domain = %query.domain, client = %query.client, error = %e, "Policy evaluation failed, dropping query");
                self.state.record_error(&e);
                return (None, false);
            }
        };

        match decision.action {
            PolicyAction::Deny => {
                info!(
                    domain = %query.domain,
                    client = %query.client,
                    reason = decision.reason(),
                    "Query refused"
                );
                (Some(ResponseBuilder::refused(request)), true)
            }
            PolicyAction::Redirect => self.redirect(request, query, &decision),
            PolicyAction::Allow => self.forward(request, query).await,
        }
    }

    fn redirect(
        &self,
        request: &Message,
        query: &DnsQuery,
        decision: &Decision,
    ) -> (Option<Message>, bool) {
        let raw = decision.redirect_ip.as_deref().unwrap_or_default().trim();

        match raw.parse::<Ipv4Addr>() {
            Ok(target) => {
                info!(
                    domain = %query.domain,
                    client = %query.client,
                    reason = decision.reason(),
                    target = %target,
                    "Query redirected"
                );
                (Some(ResponseBuilder::redirect(request, target)), true)
            }
            Err(_) => {
                let e = DomainError::InvalidRedirectTarget(raw.to_string());
                error!(domain = %query.domain, reason = decision.reason(), error = %e, "Redirect failed");
                self.state.record_error(&e);
                (Some(ResponseBuilder::servfail(request)), false)
            }
        }
    }

    async fn forward(&self, request: &Message, query: &DnsQuery) -> (Option<Message>, bool) {
        match self
            .upstream
            .exchange(request, self.query_timeout, self.max_retries)
            .await
        {
            Ok(response) => {
                debug!(
                    domain = %query.domain,
                    transport = %query.transport,
                    answers = response.answers().len(),
                    "Upstream answered"
                );
                (Some(response), true)
            }
            Err(e) => {
                error!(domain = %query.domain, client = %query.client, error = %e, "Upstream exchange failed");
                self.state.record_error(&e);
                (Some(ResponseBuilder::servfail(request)), false)
            }
        }
    }

    pub fn set_accept_queries(&self, accept: bool) {
        self.state.set_accept_queries(accept);
    }

    pub fn accepting_queries(&self) -> bool {
        self.state.accepting_queries()
    }

    pub fn set_running(&self, running: bool) {
        self.state.set_running(running);
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.state.is_running(),
            accepting_queries: self.state.accepting_queries(),
            policy_enabled: self.policy.is_enabled(),
            last_error: self.state.last_error().map(|e| e.to_string()),
        }
    }

    pub fn metrics(&self) -> &LatencyMetrics {
        &self.metrics
    }

    pub fn resolver_snapshot(&self) -> Vec<ResolverSnapshot> {
        self.upstream.snapshot()
    }
}
