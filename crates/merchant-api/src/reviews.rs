//! Review moderation on the comment service.
//!
//! Mutations never fail outward: a transport or decode failure comes back as
//! a `status: 500` envelope with a fixed message.

use std::sync::Arc;

use merchant_core::{
    ApiError, ApiErrorCategory, OrderEnvelope, ReplyReviewData, ReplyReviewRequest, ReviewInfo,
    ReviewListRequest,
};
use serde_json::{Value, json};

use crate::transport::{ApiRequest, Method, Transport, encode_segment};

pub const REVIEW_BASE_PATH: &str = "/api/comment-ms/v1/merchant";

pub const REPLY_FAILED_MESSAGE: &str = "Failed to reply to review";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete review";
pub const PIN_FAILED_MESSAGE: &str = "Failed to toggle pin review";

const FAILURE_STATUS: i64 = 500;

/// Unset filters are sent as `0`, meaning "all".
pub fn list_reviews_request(filter: &ReviewListRequest) -> ApiRequest {
    ApiRequest::api(Method::Post, format!("{REVIEW_BASE_PATH}/reviews/list")).json_value(json!({
        "product_id": filter.product_id.unwrap_or(0),
        "stars": filter.stars.unwrap_or(0),
    }))
}

/// `parentID` selects the review in the path and is left out of the body.
pub fn reply_request(reply: &ReplyReviewRequest) -> Result<ApiRequest, ApiError> {
    let mut body = serde_json::to_value(reply).map_err(|err| {
        ApiError::new(
            ApiErrorCategory::Internal,
            "request_encode_error",
            err.to_string(),
        )
    })?;
    if let Value::Object(map) = &mut body {
        map.remove("parentID");
    }
    Ok(ApiRequest::api(
        Method::Post,
        format!(
            "{REVIEW_BASE_PATH}/reviews/{}/replies",
            encode_segment(&reply.parent_id)
        ),
    )
    .json_value(body))
}

pub fn delete_review_request(review_id: &str) -> ApiRequest {
    ApiRequest::api(
        Method::Delete,
        format!("{REVIEW_BASE_PATH}/review/{}", encode_segment(review_id)),
    )
}

pub fn pin_review_request(review_id: &str, is_pinned: bool) -> ApiRequest {
    ApiRequest::api(
        Method::Patch,
        format!("{REVIEW_BASE_PATH}/reviews/{}", encode_segment(review_id)),
    )
    .json_value(json!({ "is_pinned": is_pinned }))
}

pub struct ReviewClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for ReviewClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> ReviewClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Failures propagate.
    pub async fn list(
        &self,
        filter: &ReviewListRequest,
    ) -> Result<OrderEnvelope<Vec<ReviewInfo>>, ApiError> {
        let result: Result<OrderEnvelope<Vec<ReviewInfo>>, ApiError> = async {
            self.transport
                .send(list_reviews_request(filter))
                .await?
                .decode()
        }
        .await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "failed to fetch review list");
        }
        result
    }

    pub async fn reply(&self, reply: &ReplyReviewRequest) -> OrderEnvelope<ReplyReviewData> {
        let result: Result<OrderEnvelope<ReplyReviewData>, ApiError> = async {
            self.transport
                .send(reply_request(reply)?)
                .await?
                .decode()
        }
        .await;
        recover(result, REPLY_FAILED_MESSAGE)
    }

    pub async fn delete(&self, review_id: &str) -> OrderEnvelope {
        let result: Result<OrderEnvelope, ApiError> = async {
            self.transport
                .send(delete_review_request(review_id))
                .await?
                .decode()
        }
        .await;
        recover(result, DELETE_FAILED_MESSAGE)
    }

    pub async fn set_pinned(&self, review_id: &str, is_pinned: bool) -> OrderEnvelope {
        let result: Result<OrderEnvelope, ApiError> = async {
            self.transport
                .send(pin_review_request(review_id, is_pinned))
                .await?
                .decode()
        }
        .await;
        recover(result, PIN_FAILED_MESSAGE)
    }
}

fn recover<D>(result: Result<OrderEnvelope<D>, ApiError>, message: &str) -> OrderEnvelope<D> {
    result.unwrap_or_else(|err| {
        tracing::error!(error = %err, "{message}");
        OrderEnvelope::failure(FAILURE_STATUS, message)
    })
}
