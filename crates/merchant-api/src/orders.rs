//! Merchant order management on the order service.

use std::sync::Arc;

use merchant_core::{
    ApiError, ListOrderRequest, ListOrderResponse, OrderDetail, OrderEnvelope, OrderStats,
};
use serde_json::{Value, json};

use crate::transport::{ApiRequest, HttpResponse, Method, Transport, encode_segment};

pub const ORDER_BASE_PATH: &str = "/api/order-ms/v1/merchant";

pub fn list_orders_request(filter: &ListOrderRequest) -> Result<ApiRequest, ApiError> {
    ApiRequest::api(Method::Post, format!("{ORDER_BASE_PATH}/orders/list")).json(filter)
}

pub fn order_detail_request(order_no: &str) -> ApiRequest {
    ApiRequest::api(
        Method::Get,
        format!("{ORDER_BASE_PATH}/orders/{}", encode_segment(order_no)),
    )
}

pub fn ship_order_request(order_no: &str, tracking_no: &str) -> ApiRequest {
    ApiRequest::api(
        Method::Patch,
        format!("{ORDER_BASE_PATH}/orders/{}/ship", encode_segment(order_no)),
    )
    .json_value(json!({ "tracking_no": tracking_no }))
}

pub fn order_stats_request() -> ApiRequest {
    ApiRequest::api(Method::Get, format!("{ORDER_BASE_PATH}/order-stats"))
}

/// Turn a non-2xx stats response into a failure envelope.
///
/// The message is the body's `error`, then its `msg`, then `HTTP <status>`;
/// a body that does not parse is ignored.
pub fn stats_failure(response: &HttpResponse) -> OrderEnvelope<OrderStats> {
    let body = response.json().unwrap_or(Value::Null);
    let message = ["error", "msg"]
        .into_iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    OrderEnvelope::failure(i64::from(response.status), message)
}

pub struct OrderClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for OrderClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> OrderClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        filter: &ListOrderRequest,
    ) -> Result<OrderEnvelope<ListOrderResponse>, ApiError> {
        self.transport
            .send(list_orders_request(filter)?)
            .await?
            .decode()
    }

    pub async fn detail(&self, order_no: &str) -> Result<OrderEnvelope<OrderDetail>, ApiError> {
        self.transport
            .send(order_detail_request(order_no))
            .await?
            .decode()
    }

    pub async fn ship(&self, order_no: &str, tracking_no: &str) -> Result<OrderEnvelope, ApiError> {
        self.transport
            .send(ship_order_request(order_no, tracking_no))
            .await?
            .decode()
    }

    pub async fn stats(&self) -> Result<OrderEnvelope<OrderStats>, ApiError> {
        let response = self.transport.send(order_stats_request()).await?;
        if !response.is_success() {
            tracing::warn!(status = response.status, "order stats request failed");
            return Ok(stats_failure(&response));
        }
        response.decode()
    }
}
