#![allow(dead_code)]

mod dns_server_mock;

pub use dns_server_mock::*;

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;
use warden_dns_domain::{DomainError, UpstreamConfig, UpstreamResolver};

pub fn query(domain: &str, id: u16) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(domain).unwrap(), RecordType::A));
    message
}

pub fn resolver(id: &str, addr: SocketAddr, priority: i32) -> UpstreamResolver {
    UpstreamResolver::new(id, addr.ip().to_string(), addr.port(), priority)
}

pub fn upstream_config(resolvers: Vec<UpstreamResolver>) -> UpstreamConfig {
    UpstreamConfig {
        resolvers,
        tcp_pool_size: 2,
        query_timeout_ms: 500,
        max_retries: 2,
        down_after: 3,
    }
}

/// What a dead upstream looks like from the caller's side.
pub fn is_unreachable(err: &DomainError) -> bool {
    matches!(
        err,
        DomainError::TransportConnectionRefused { .. }
            | DomainError::TransportTimeout { .. }
            | DomainError::TransportIo { .. }
    )
}
