use thiserror::Error;

use crate::error::{ApiError, ApiErrorCategory};

/// Storage key holding the opaque session token.
pub const SESSION_TOKEN_KEY: &str = "userToken";
/// Storage key holding persisted `Set-Cookie` values, one JSON array.
pub const SESSION_COOKIES_KEY: &str = "sessionCookies";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("item not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::NotFound => "store_item_missing",
            StoreError::Unavailable(_) => "store_unavailable",
            StoreError::Backend(_) => "store_error",
        };
        ApiError::new(ApiErrorCategory::Storage, code, err.to_string())
    }
}

/// Access to locally persisted session evidence.
///
/// Presence of a token means "authenticated"; nothing about the token is
/// validated here.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Result<Option<String>, StoreError>;

    fn set_token(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the token. Clearing an absent token is not an error.
    fn clear(&self) -> Result<(), StoreError>;

    /// Whether session evidence is present. Read failures count as absent.
    fn has_session(&self) -> bool {
        match self.token() {
            Ok(token) => token.is_some_and(|token| !token.is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "session store read failed; treating as anonymous");
                false
            }
        }
    }
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn token(&self) -> Result<Option<String>, StoreError> {
        (**self).token()
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        (**self).set_token(token)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
