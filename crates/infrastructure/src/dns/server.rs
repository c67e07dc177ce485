//! Inbound request handler: the seam between hickory-server and the
//! dispatcher. Applies the reject-qtype filter before dispatching and maps
//! a dispatch failure to SERVFAIL.

use super::dispatcher::Dispatcher;
use arc_swap::ArcSwap;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shared, atomically swappable runtime snapshot. Reload stores a freshly
/// built dispatcher; queries in flight keep the snapshot they loaded.
pub type SharedDispatcher = Arc<ArcSwap<Dispatcher>>;

pub fn shared(dispatcher: Dispatcher) -> SharedDispatcher {
    Arc::new(ArcSwap::from_pointee(dispatcher))
}

#[derive(Clone)]
pub struct DnsServerHandler {
    runtime: SharedDispatcher,
}

impl DnsServerHandler {
    pub fn new(runtime: SharedDispatcher) -> Self {
        Self { runtime }
    }
}

#[async_trait::async_trait]
impl RequestHandler for DnsServerHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let dispatcher = self.runtime.load_full();

        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "Failed to parse request info");
                return send_error_response(request, &mut response_handle, ResponseCode::FormErr)
                    .await;
            }
        };

        let query = &request_info.query;
        let qtype = query.query_type();
        let client_ip = request.src().ip().to_string();

        if dispatcher.reject_qtypes.contains(&u16::from(qtype)) {
            debug!(name = %query.name(), qtype = %qtype, client = %client_ip, "Rejected question type");
            return send_error_response(request, &mut response_handle, ResponseCode::Refused)
                .await;
        }

        let mut question = Message::new(request.header().id(), MessageType::Query, OpCode::Query);
        question.set_recursion_desired(request.header().recursion_desired());
        question.add_query(query.original().clone());

        debug!(name = %query.name(), qtype = %qtype, client = %client_ip, "Question received");

        match dispatcher.exchange(&question, &client_ip).await {
            Some(response) => send_response_message(request, &mut response_handle, &response).await,
            None => {
                warn!(name = %query.name(), "Dispatch produced no response");
                send_error_response(request, &mut response_handle, ResponseCode::ServFail).await
            }
        }
    }
}

async fn send_response_message<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    message: &Message,
) -> ResponseInfo {
    let builder = MessageResponseBuilder::from_message_request(request);
    let mut header = *request.header();
    header.set_message_type(MessageType::Response);
    header.set_response_code(message.response_code());
    header.set_recursion_available(true);
    header.set_authoritative(message.authoritative());

    let response = builder.build(
        header,
        message.answers().iter(),
        message.name_servers().iter(),
        &[],
        message.additionals().iter(),
    );

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "Failed to send response");
            ResponseInfo::from(*request.header())
        }
    }
}

async fn send_error_response<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: ResponseCode,
) -> ResponseInfo {
    let builder = MessageResponseBuilder::from_message_request(request);
    let mut header = *request.header();
    header.set_message_type(MessageType::Response);
    header.set_response_code(code);
    header.set_recursion_available(true);
    let response = builder.build(header, &[], &[], &[], &[]);

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "Failed to send error response");
            ResponseInfo::from(*request.header())
        }
    }
}
