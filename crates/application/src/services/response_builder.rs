use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::net::Ipv4Addr;

pub const REDIRECT_TTL: u32 = 60;

/// Synthesizes the responses the engine answers locally.
pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn refused(request: &Message) -> Message {
        Self::reply_to(request, ResponseCode::Refused)
    }

    pub fn servfail(request: &Message) -> Message {
        Self::reply_to(request, ResponseCode::ServFail)
    }

    /// Single A record for the first question name.
    pub fn redirect(request: &Message, target: Ipv4Addr) -> Message {
        let mut response = Self::reply_to(request, ResponseCode::NoError);
        if let Some(question) = request.queries().first() {
            response.add_answer(Record::from_rdata(
                question.name().clone(),
                REDIRECT_TTL,
                RData::A(A(target)),
            ));
        }
        response
    }

    /// Header and question only, with TC set, for UDP replies that exceed
    /// the client's advertised payload size.
    pub fn truncate(response: &Message) -> Message {
        let mut truncated = Message::new();
        truncated
            .set_id(response.id())
            .set_message_type(MessageType::Response)
            .set_op_code(response.op_code())
            .set_recursion_desired(response.recursion_desired())
            .set_recursion_available(response.recursion_available())
            .set_response_code(response.response_code())
            .set_truncated(true);
        for query in response.queries() {
            truncated.add_query(query.clone());
        }
        truncated
    }

    fn reply_to(request: &Message, code: ResponseCode) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true)
            .set_response_code(code);
        for query in request.queries() {
            response.add_query(query.clone());
        }
        response
    }
}
