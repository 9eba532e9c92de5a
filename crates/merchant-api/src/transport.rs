//! HTTP transport seam shared by every resource client.

use std::{fmt, future::Future, sync::Arc};

use merchant_core::{ApiError, ApiErrorCategory, classify_http_status};
use reqwest::{cookie::Jar, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// Namespace prefix that the backend gateway strips.
pub const API_PREFIX: &str = "/api";

const SEGMENT_BASE: &str = "http://segment.invalid/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path in the `/api` namespace, rewritten onto the backend base URL.
    Api(String),
    /// Absolute URL used verbatim (upload targets).
    Absolute(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes {
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// One outgoing HTTP request, fully described before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: Target,
    pub body: RequestBody,
    /// Attach session cookies.
    pub session_scoped: bool,
}

impl ApiRequest {
    /// Session-scoped request to an `/api` path without a body.
    pub fn api(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            target: Target::Api(path.into()),
            body: RequestBody::Empty,
            session_scoped: true,
        }
    }

    /// Unscoped request to an absolute URL.
    pub fn absolute(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            target: Target::Absolute(url.into()),
            body: RequestBody::Empty,
            session_scoped: false,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|err| {
            ApiError::new(
                ApiErrorCategory::Internal,
                "request_encode_error",
                err.to_string(),
            )
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes {
            content_type: content_type.into(),
            bytes,
        };
        self
    }

    pub fn unscoped(mut self) -> Self {
        self.session_scoped = false;
        self
    }

    pub fn path(&self) -> &str {
        match &self.target {
            Target::Api(path) | Target::Absolute(path) => path,
        }
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A received HTTP response, body not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. Failures keep the HTTP status.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_slice(&self.body).map_err(|err| {
            ApiError::decode(format!(
                "response with status {} is not JSON: {err}",
                self.status
            ))
            .with_status(self.status)
        })
    }

    /// Decode the body into a typed envelope regardless of HTTP status.
    pub fn decode<E: DeserializeOwned>(&self) -> Result<E, ApiError> {
        serde_json::from_slice(&self.body).map_err(|err| {
            ApiError::decode(format!(
                "unexpected response shape (status {}): {err}",
                self.status
            ))
            .with_status(self.status)
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations never retry and add no timeout.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send {
        (**self).send(request)
    }
}

/// Percent-encode one path segment so it cannot add or climb path levels.
pub fn encode_segment(segment: &str) -> String {
    // `path_segments_mut` drops dot segments instead of encoding them.
    if matches!(segment, "." | "..") {
        return segment.replace('.', "%2E");
    }
    if let Ok(mut url) = Url::parse(SEGMENT_BASE) {
        let pushed = match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.clear().push(segment);
                true
            }
            Err(()) => false,
        };
        if pushed {
            return url.path().trim_start_matches('/').to_owned();
        }
    }
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Rewrite an `/api` path onto `base`, dropping the prefix.
pub fn rewrite_api_path(base: &Url, path: &str) -> Result<Url, ApiError> {
    let stripped = path
        .strip_prefix(API_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
        .unwrap_or(path);
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        stripped.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|err| {
        ApiError::new(
            ApiErrorCategory::Internal,
            "invalid_request_url",
            format!("cannot build URL for '{path}': {err}"),
        )
    })
}

/// Production transport over `reqwest`.
///
/// Scoped requests share one cookie jar; unscoped requests use a client
/// without cookies.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    scoped: reqwest::Client,
    plain: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        Self::with_cookies(base_url, &[])
    }

    /// Build a transport whose cookie jar starts with persisted cookies.
    pub fn with_cookies(base_url: Url, cookies: &[String]) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        for cookie in cookies {
            jar.add_cookie_str(cookie, &base_url);
        }

        let scoped = reqwest::Client::builder()
            .cookie_provider(jar)
            .build()
            .map_err(map_client_build_error)?;
        let plain = reqwest::Client::builder()
            .build()
            .map_err(map_client_build_error)?;

        Ok(Self {
            base_url,
            scoped,
            plain,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, target: &Target) -> Result<Url, ApiError> {
        match target {
            Target::Api(path) => rewrite_api_path(&self.base_url, path),
            Target::Absolute(url) => Url::parse(url).map_err(|err| {
                ApiError::new(
                    ApiErrorCategory::Validation,
                    "invalid_absolute_url",
                    format!("invalid URL '{url}': {err}"),
                )
            }),
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let url = self.resolve(&request.target)?;
        let client = if request.session_scoped {
            &self.scoped
        } else {
            &self.plain
        };
        tracing::debug!(method = %request.method, %url, scoped = request.session_scoped, "http request");

        let mut builder = client.request(to_reqwest_method(request.method), url);
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes {
                content_type,
                bytes,
            } => builder.header(header::CONTENT_TYPE, content_type).body(bytes),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        if !(200..300).contains(&status) {
            tracing::warn!(status, "http request returned non-success status");
        }
        Ok(HttpResponse {
            status,
            body,
            set_cookies,
        })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if let Some(status) = err.status() {
        let status = status.as_u16();
        return ApiError::new(classify_http_status(status), "http_error", err.to_string())
            .with_status(status);
    }
    if err.is_decode() {
        return ApiError::decode(err.to_string());
    }
    ApiError::new(ApiErrorCategory::Network, "transport_error", err.to_string())
}

fn map_client_build_error(err: reqwest::Error) -> ApiError {
    ApiError::new(
        ApiErrorCategory::Internal,
        "client_build_error",
        err.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn base() -> Url {
        Url::parse("https://merchant.example.com").expect("base url")
    }

    #[test]
    fn strips_api_prefix_onto_base() {
        let url = rewrite_api_path(&base(), "/api/user-ms/v1/merchant/login").expect("url");
        assert_eq!(
            url.as_str(),
            "https://merchant.example.com/user-ms/v1/merchant/login"
        );
    }

    #[test]
    fn keeps_base_path_and_query() {
        let base = Url::parse("http://localhost:8080/gateway/").expect("base url");
        let url = rewrite_api_path(
            &base,
            "/api/product-ms/v1/merchant/products?keyword=mug&offset=20",
        )
        .expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/gateway/product-ms/v1/merchant/products?keyword=mug&offset=20"
        );
    }

    #[test]
    fn only_strips_whole_prefix_segment() {
        let url = rewrite_api_path(&base(), "/apiary/list").expect("url");
        assert_eq!(url.as_str(), "https://merchant.example.com/apiary/list");
    }

    #[test]
    fn encodes_path_segments() {
        assert_eq!(encode_segment("A-100_x.y~"), "A-100_x.y~");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("é"), "%C3%A9");
        assert_eq!(encode_segment("50%?#x"), "50%25%3F%23x");
        assert_eq!(encode_segment(".."), "%2E%2E");
        assert_eq!(encode_segment(""), "");
    }

    #[test]
    fn response_json_keeps_status_on_decode_failure() {
        let ok = HttpResponse::new(200, br#"{"code":200}"#.to_vec());
        assert_eq!(ok.json().expect("json"), json!({"code": 200}));

        let err = HttpResponse::new(502, b"<html>bad gateway</html>".to_vec())
            .json()
            .expect_err("html must fail");
        assert_eq!(err.category, ApiErrorCategory::Decode);
        assert_eq!(err.status, Some(502));
    }

    #[test]
    fn request_builders_set_scope_and_body() {
        let request = ApiRequest::api(Method::Post, "/api/x")
            .json(&json!({"a": 1}))
            .expect("encode")
            .unscoped();
        assert!(!request.session_scoped);
        assert_eq!(request.json_body(), Some(&json!({"a": 1})));

        let upload = ApiRequest::absolute(Method::Put, "https://s3/put").bytes("image/png", vec![1]);
        assert!(!upload.session_scoped);
        assert_eq!(upload.target, Target::Absolute("https://s3/put".into()));
    }

    #[test]
    fn seeds_cookie_jar_without_error() {
        let transport =
            ReqwestTransport::with_cookies(base(), &["sid=abc; Path=/".to_owned()]).expect("client");
        assert_eq!(transport.base_url(), &base());
    }
}
