//! Scripted transport for client tests.

use std::{sync::Mutex, time::Duration};

use merchant_core::ApiError;
use serde_json::Value;

use crate::transport::{ApiRequest, HttpResponse, Transport};

pub(crate) struct MockReply {
    pub delay: Duration,
    pub result: Result<HttpResponse, ApiError>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::new(status, body.to_string())),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::new(status, body)),
        }
    }

    pub fn error(err: ApiError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Box<dyn Fn(&ApiRequest) -> MockReply + Send + Sync>;

/// Records every request and answers from a handler.
///
/// `sent` holds requests as they start; `delivered` only those whose reply
/// completed.
pub(crate) struct MockTransport {
    handler: Handler,
    sent: Mutex<Vec<ApiRequest>>,
    delivered: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn replying(handler: impl Fn(&ApiRequest) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn always(status: u16, body: Value) -> Self {
        Self::replying(move |_| MockReply::json(status, body.clone()))
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn delivered(&self) -> Vec<ApiRequest> {
        self.delivered.lock().expect("delivered lock").clone()
    }

    pub fn only_request(&self) -> ApiRequest {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one request: {sent:?}");
        sent.into_iter().next().expect("one request")
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let reply = (self.handler)(&request);
        self.sent.lock().expect("sent lock").push(request.clone());
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.delivered.lock().expect("delivered lock").push(request);
        reply.result
    }
}
