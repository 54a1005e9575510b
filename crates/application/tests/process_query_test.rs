mod helpers;

use helpers::{
    client_addr, query_message, MockBlocklist, MockPolicyEngine, MockUpstream, UPSTREAM_ANSWER,
};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::RData;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use warden_dns_application::services::LatencyMetrics;
use warden_dns_application::use_cases::QueryEngine;
use warden_dns_domain::{Decision, Transport};

const TIMEOUT: Duration = Duration::from_millis(750);
const RETRIES: u32 = 3;

struct Fixture {
    engine: Arc<QueryEngine>,
    blocklist: MockBlocklist,
    policy: MockPolicyEngine,
    upstream: MockUpstream,
}

fn make_engine() -> Fixture {
    let blocklist = MockBlocklist::new();
    let policy = MockPolicyEngine::new();
    let upstream = MockUpstream::new();
    let metrics = Arc::new(LatencyMetrics::new(
        Duration::from_secs(300),
        Duration::from_secs(30),
    ));

    let engine = QueryEngine::new(
        Arc::new(policy.clone()),
        Arc::new(upstream.clone()),
        metrics,
        TIMEOUT,
        RETRIES,
    )
    .with_blocklist(Arc::new(blocklist.clone()));

    Fixture {
        engine: Arc::new(engine),
        blocklist,
        policy,
        upstream,
    }
}

async fn process(engine: &QueryEngine, domain: &str) -> Option<Message> {
    engine
        .process_query(&query_message(domain, 777), client_addr(), Transport::Udp)
        .await
}

// ── blocklist ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_blocklisted_domain_is_refused_without_policy_or_upstream() {
    let f = make_engine();
    f.blocklist.block("ads.example.com.").await;

    let response = process(&f.engine, "ads.example.com.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::Refused);
    assert_eq!(response.id(), 777);
    assert_eq!(f.policy.calls(), 0);
    assert_eq!(f.upstream.calls(), 0);
    assert_eq!(f.engine.metrics().aggregate().total, 1);
    assert_eq!(f.engine.metrics().aggregate().errors, 0);
}

#[tokio::test]
async fn test_blocklist_error_falls_through_to_policy() {
    let f = make_engine();
    f.blocklist.set_should_fail(true);

    let response = process(&f.engine, "example.com.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(f.policy.calls(), 1);
    assert_eq!(f.upstream.calls(), 1);
    assert!(f.engine.status().last_error.is_some());
}

#[tokio::test]
async fn test_engine_without_blocklist_goes_straight_to_policy() {
    let policy = MockPolicyEngine::new();
    let upstream = MockUpstream::new();
    let engine = QueryEngine::new(
        Arc::new(policy.clone()),
        Arc::new(upstream.clone()),
        Arc::new(LatencyMetrics::new(
            Duration::from_secs(60),
            Duration::from_secs(10),
        )),
        TIMEOUT,
        RETRIES,
    );

    let response = process(&engine, "example.com.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(policy.calls(), 1);
}

// ── policy dispatch ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_deny_returns_refused() {
    let f = make_engine();
    f.policy
        .set_decision("casino.example.", Decision::deny("gambling").with_category("gambling"))
        .await;

    let response = process(&f.engine, "casino.example.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::Refused);
    assert!(response.answers().is_empty());
    assert_eq!(response.queries().len(), 1);
    assert_eq!(f.upstream.calls(), 0);
}

#[tokio::test]
async fn test_redirect_returns_single_a_record() {
    let f = make_engine();
    f.policy
        .set_decision("adult.example.", Decision::redirect("parental", "10.0.0.99"))
        .await;

    let response = process(&f.engine, "adult.example.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    let answer = &response.answers()[0];
    assert_eq!(answer.ttl(), 60);
    assert_eq!(answer.name().to_ascii(), "adult.example.");
    assert_eq!(answer.data(), &RData::A(A(Ipv4Addr::new(10, 0, 0, 99))));
    assert!(response.recursion_available());
    assert_eq!(f.upstream.calls(), 0);
}

#[tokio::test]
async fn test_malformed_redirect_target_returns_servfail() {
    let f = make_engine();
    f.policy
        .set_decision("broken.example.", Decision::redirect("parental", "not-an-ip"))
        .await;

    let response = process(&f.engine, "broken.example.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
    let agg = f.engine.metrics().aggregate();
    assert_eq!(agg.total, 1);
    assert_eq!(agg.errors, 1);
}

#[tokio::test]
async fn test_ipv6_redirect_target_is_rejected() {
    let f = make_engine();
    f.policy
        .set_decision("v6.example.", Decision::redirect("parental", "2001:db8::1"))
        .await;

    let response = process(&f.engine, "v6.example.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
}

#[tokio::test]
async fn test_policy_error_drops_query_and_records_failure() {
    let f = make_engine();
    f.policy.set_should_fail(true);

    let response = process(&f.engine, "example.com.").await;

    assert!(response.is_none());
    assert_eq!(f.upstream.calls(), 0);
    let agg = f.engine.metrics().aggregate();
    assert_eq!(agg.total, 1);
    assert_eq!(agg.errors, 1);
    assert!(f
        .engine
        .status()
        .last_error
        .unwrap()
        .contains("Policy evaluation failed"));
}

// ── forwarding ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_allow_relays_upstream_response() {
    let f = make_engine();

    let response = process(&f.engine, "example.com.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.id(), 777);
    assert_eq!(response.answers().len(), 1);
    assert_eq!(response.answers()[0].data(), &RData::A(A(UPSTREAM_ANSWER)));
    assert_eq!(f.upstream.calls(), 1);
    assert_eq!(f.upstream.last_params(), Some((TIMEOUT, RETRIES)));
}

#[tokio::test]
async fn test_upstream_failure_returns_servfail() {
    let f = make_engine();
    f.upstream.set_should_fail(true);

    let response = process(&f.engine, "example.com.").await.unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
    assert_eq!(response.id(), 777);
    assert_eq!(f.engine.metrics().aggregate().errors, 1);
}

// ── edge cases ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_message_without_question_is_dropped_without_metric() {
    let f = make_engine();
    let mut empty = query_message("example.com.", 1);
    empty.take_queries();

    let response = f
        .engine
        .process_query(&empty, client_addr(), Transport::Tcp)
        .await;

    assert!(response.is_none());
    assert_eq!(f.blocklist.calls(), 0);
    assert_eq!(f.policy.calls(), 0);
    assert_eq!(f.engine.metrics().aggregate().total, 0);
}

#[tokio::test]
async fn test_status_reflects_runtime_flags() {
    let f = make_engine();
    f.policy.set_enabled(false);

    let status = f.engine.status();
    assert!(!status.running);
    assert!(!status.accepting_queries);
    assert!(!status.policy_enabled);

    f.engine.set_running(true);
    f.engine.set_accept_queries(true);
    let status = f.engine.status();
    assert!(status.running);
    assert!(status.accepting_queries);

    assert_eq!(f.engine.resolver_snapshot().len(), 1);
}

#[tokio::test]
async fn test_concurrent_queries_record_one_metric_each() {
    let f = make_engine();
    f.upstream.set_delay(Duration::from_millis(5));
    f.blocklist.block("tracker.example.").await;

    let tasks: Vec<_> = (0..64u16)
        .map(|i| {
            let engine = Arc::clone(&f.engine);
            tokio::spawn(async move {
                let domain = if i % 2 == 0 {
                    "tracker.example."
                } else {
                    "example.com."
                };
                engine
                    .process_query(&query_message(domain, i), client_addr(), Transport::Udp)
                    .await
            })
        })
        .collect();

    let responses = futures::future::join_all(tasks).await;

    for (i, response) in responses.into_iter().enumerate() {
        let response = response.unwrap().unwrap();
        assert_eq!(response.id(), i as u16);
    }
    assert_eq!(f.engine.metrics().aggregate().total, 64);
    assert_eq!(f.upstream.calls(), 32);
}
