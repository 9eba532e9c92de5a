//! Core contract shared by the merchant console's clients and front ends.
//!
//! This crate defines the domain records, response envelope normalization,
//! the route table and navigation guard, the image upload state machine, and
//! the notification surface.

/// Response envelope families and success classification.
pub mod envelope;
/// Stable error type and HTTP classification helpers.
pub mod error;
/// Display helpers for amounts, dates and statuses.
pub mod format;
/// Route-transition guard.
pub mod guard;
/// Transient user notifications.
pub mod notification;
/// Route table and path matching.
pub mod route;
/// Session evidence storage contract.
pub mod session;
/// Wire-level domain records (products, orders, reviews, auth).
pub mod types;
/// Per-file image upload state machine.
pub mod upload;

pub use envelope::{
    AuthEnvelope, Envelope, ErrorMessages, OrderEnvelope, Verdict, classify, classify_value,
};
pub use error::{ApiError, ApiErrorCategory, classify_http_status, error_message};
pub use guard::{
    Navigation, NavigationDecision, NavigationError, NavigationEvent, NavigationGuard,
    NavigationObserver, TracingObserver, decide,
};
pub use notification::{
    Notification, NotificationCenter, NotificationEvent, NotificationKind, NotificationSink,
    NotificationStream,
};
pub use route::{HOME_PATH, LOGIN_PATH, Resolution, RouteDescriptor, RouteMatch, RouteTable};
pub use session::{SESSION_COOKIES_KEY, SESSION_TOKEN_KEY, SessionStore, StoreError};
pub use types::{
    ActivateRequest, CreateProductRequest, ImageType, ImageUploadRequest, ListOrderRequest,
    ListOrderResponse, OrderDetail, OrderInfoInList, OrderItemDetail, OrderStats, OrderStatus,
    OrderStatusLogDetail, PicInfo, ProductInfo, ProductListParams, ProductListResponse,
    ProductStatus, ReplyReviewData, ReplyReviewRequest, ReviewInfo, ReviewListRequest,
    UpdateProductRequest, UserCredentials,
};
pub use upload::{ImageFile, UploadState, UploadStateMachine, UploadTicket};
