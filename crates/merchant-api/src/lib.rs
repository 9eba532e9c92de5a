//! HTTP clients for the merchant backend services.
//!
//! Each backend domain gets its own client over a shared [`Transport`]; the
//! clients return raw envelopes and leave classification to the caller.

use std::sync::Arc;

use merchant_core::ApiError;
use url::Url;

/// Merchant account operations.
pub mod auth;
/// Order listing, detail, shipping and stats.
pub mod orders;
/// Product catalogue operations.
pub mod products;
/// Review moderation.
pub mod reviews;
/// Request/response model and the `reqwest` transport.
pub mod transport;
/// Image upload pipeline.
pub mod upload;

#[cfg(test)]
mod testing;

pub use auth::{AuthClient, LoginOutcome, session_token_from};
pub use orders::OrderClient;
pub use products::ProductClient;
pub use reviews::ReviewClient;
pub use transport::{ApiRequest, HttpResponse, Method, ReqwestTransport, Target, Transport};
pub use upload::ImageUploader;

/// All resource clients over one transport.
pub struct MerchantApi<T> {
    pub auth: AuthClient<T>,
    pub products: ProductClient<T>,
    pub orders: OrderClient<T>,
    pub reviews: ReviewClient<T>,
    pub uploads: ImageUploader<T>,
}

impl<T: Transport> MerchantApi<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            auth: AuthClient::new(Arc::clone(&transport)),
            products: ProductClient::new(Arc::clone(&transport)),
            orders: OrderClient::new(Arc::clone(&transport)),
            reviews: ReviewClient::new(Arc::clone(&transport)),
            uploads: ImageUploader::new(transport),
        }
    }
}

impl MerchantApi<ReqwestTransport> {
    /// Clients against `base_url`, restoring persisted session cookies.
    pub fn connect(base_url: Url, cookies: &[String]) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::with_cookies(base_url, cookies)?;
        Ok(Self::new(Arc::new(transport)))
    }
}
