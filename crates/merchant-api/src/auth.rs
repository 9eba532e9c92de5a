//! Merchant account operations on the user service.

use std::sync::Arc;

use merchant_core::{
    ActivateRequest, ApiError, AuthEnvelope, SessionStore, UserCredentials,
    envelope::DEFAULT_ERROR_MESSAGE,
};
use serde_json::Value;
use uuid::Uuid;

use crate::transport::{ApiRequest, HttpResponse, Method, Transport};

pub const USER_BASE_PATH: &str = "/api/user-ms/v1/merchant";

pub fn login_request(credentials: &UserCredentials) -> Result<ApiRequest, ApiError> {
    ApiRequest::api(Method::Post, format!("{USER_BASE_PATH}/login")).json(credentials)
}

pub fn logout_request() -> ApiRequest {
    ApiRequest::api(Method::Post, format!("{USER_BASE_PATH}/logout"))
}

pub fn register_request(credentials: &UserCredentials) -> Result<ApiRequest, ApiError> {
    Ok(ApiRequest::api(Method::Post, format!("{USER_BASE_PATH}/users"))
        .json(credentials)?
        .unscoped())
}

pub fn activate_request(request: &ActivateRequest) -> Result<ApiRequest, ApiError> {
    Ok(
        ApiRequest::api(Method::Put, format!("{USER_BASE_PATH}/users/activate"))
            .json(request)?
            .unscoped(),
    )
}

/// Session token carried by a login body.
///
/// The backend authenticates through its cookie, so when the body names no
/// token a random marker stands in as local session evidence.
pub fn session_token_from(data: Option<&Value>) -> String {
    match data {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        Some(Value::Object(map)) => match map.get("token") {
            Some(Value::String(token)) if !token.is_empty() => token.clone(),
            _ => fresh_marker(),
        },
        _ => fresh_marker(),
    }
}

fn fresh_marker() -> String {
    format!("session-{}", Uuid::new_v4())
}

/// Interpreted login response.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub status: u16,
    pub envelope: AuthEnvelope,
    /// Present only for a successful login.
    pub token: Option<String>,
    /// `Set-Cookie` values to persist with the session.
    pub cookies: Vec<String>,
}

impl LoginOutcome {
    /// Interpret a raw login response. A body that is not JSON reads as an
    /// empty envelope so the HTTP status still reaches the caller.
    pub fn from_response(response: &HttpResponse) -> Self {
        let envelope = response.decode::<AuthEnvelope>().unwrap_or_else(|err| {
            tracing::warn!(status = response.status, error = %err, "login body not understood");
            AuthEnvelope::default()
        });
        let ok = response.is_success() && envelope.is_success();
        let token = ok.then(|| session_token_from(envelope.data.as_ref()));

        Self {
            status: response.status,
            token,
            cookies: if ok {
                response.set_cookies.clone()
            } else {
                Vec::new()
            },
            envelope,
        }
    }

    pub fn is_success(&self) -> bool {
        self.token.is_some()
    }

    /// Failure message, or `HTTP <status>` when the body named none.
    pub fn message(&self) -> String {
        match self.envelope.messages.first_non_empty() {
            Some(message) => message.to_owned(),
            None if !(200..300).contains(&self.status) => format!("HTTP {}", self.status),
            None => DEFAULT_ERROR_MESSAGE.to_owned(),
        }
    }
}

pub struct AuthClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for AuthClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> AuthClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Raw login response, status and cookies included.
    pub async fn login(&self, credentials: &UserCredentials) -> Result<HttpResponse, ApiError> {
        self.transport.send(login_request(credentials)?).await
    }

    pub async fn logout(&self) -> Result<AuthEnvelope, ApiError> {
        self.transport.send(logout_request()).await?.decode()
    }

    pub async fn register(&self, credentials: &UserCredentials) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(register_request(credentials)?)
            .await?
            .decode()
    }

    pub async fn activate(&self, request: &ActivateRequest) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(activate_request(request)?)
            .await?
            .decode()
    }

    /// Log in and record the session token on success.
    pub async fn sign_in<S: SessionStore>(
        &self,
        credentials: &UserCredentials,
        session: &S,
    ) -> Result<LoginOutcome, ApiError> {
        let response = self.login(credentials).await?;
        let outcome = LoginOutcome::from_response(&response);
        if let Some(token) = &outcome.token {
            session.set_token(token)?;
            tracing::info!(email = %credentials.email, "signed in");
        } else {
            tracing::warn!(status = outcome.status, "login rejected");
        }
        Ok(outcome)
    }

    /// Log out and clear local session evidence whatever the backend answers.
    pub async fn sign_out<S: SessionStore>(&self, session: &S) -> Result<AuthEnvelope, ApiError> {
        let result = self.logout().await;
        session.clear()?;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "logout request failed; local session cleared");
        }
        result
    }
}
