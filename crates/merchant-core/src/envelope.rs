//! Backend response envelopes and the success/failure normalizer.
//!
//! The user and product services answer `{code, data?, err_msg?}` while the
//! order and comment services answer `{status, data?, msg?, error?}`. Both
//! families carry the same optional message fields so a message can be
//! resolved without knowing which service answered.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ApiError;

/// `code` value that marks success for the user/product services.
pub const AUTH_SUCCESS_CODE: i64 = 200;
/// `status` value that marks success for the order/comment services.
pub const ORDER_SUCCESS_STATUS: i64 = 0;
/// Fallback message used when an envelope carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Optional human-readable failure messages, shared by both envelope families.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessages {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub err_msg: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub msg: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl ErrorMessages {
    /// First non-empty of `err_msg`, `msg`, `error`.
    pub fn first_non_empty(&self) -> Option<&str> {
        [&self.err_msg, &self.msg, &self.error]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }

    /// Resolve a message, falling back to `default`.
    pub fn resolve(&self, default: &str) -> String {
        self.first_non_empty().unwrap_or(default).to_owned()
    }
}

/// Envelope returned by the user and product services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct AuthEnvelope<T = Value> {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(flatten)]
    pub messages: ErrorMessages,
}

impl<T> Default for AuthEnvelope<T> {
    fn default() -> Self {
        Self {
            code: None,
            data: None,
            messages: ErrorMessages::default(),
        }
    }
}

impl<T> AuthEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == Some(AUTH_SUCCESS_CODE)
    }
}

/// Envelope returned by the order and comment services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct OrderEnvelope<T = Value> {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(flatten)]
    pub messages: ErrorMessages,
}

impl<T> Default for OrderEnvelope<T> {
    fn default() -> Self {
        Self {
            status: None,
            data: None,
            messages: ErrorMessages::default(),
        }
    }
}

impl<T> OrderEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == Some(ORDER_SUCCESS_STATUS)
    }

    /// Build a failure envelope carrying only a status and an `error` message.
    pub fn failure(status: i64, error: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            data: None,
            messages: ErrorMessages {
                error: Some(error.into()),
                ..ErrorMessages::default()
            },
        }
    }
}

/// A response envelope tagged by backend family.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T = Value> {
    Auth(AuthEnvelope<T>),
    Order(OrderEnvelope<T>),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Auth(envelope) => envelope.is_success(),
            Self::Order(envelope) => envelope.is_success(),
        }
    }

    pub fn messages(&self) -> &ErrorMessages {
        match self {
            Self::Auth(envelope) => &envelope.messages,
            Self::Order(envelope) => &envelope.messages,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Auth(envelope) => envelope.data.as_ref(),
            Self::Order(envelope) => envelope.data.as_ref(),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Auth(envelope) => envelope.data,
            Self::Order(envelope) => envelope.data,
        }
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode an untyped JSON body, choosing the family by field presence.
    ///
    /// `status` wins when both `status` and `code` are present. A body that is
    /// not a JSON object decodes to an empty (failed) auth envelope.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let Value::Object(map) = &value else {
            return Ok(Self::Auth(AuthEnvelope::default()));
        };

        if map.contains_key("status") {
            serde_json::from_value(value)
                .map(Self::Order)
                .map_err(|err| ApiError::decode(format!("invalid order envelope: {err}")))
        } else {
            serde_json::from_value(value)
                .map(Self::Auth)
                .map_err(|err| ApiError::decode(format!("invalid envelope: {err}")))
        }
    }
}

impl<T> From<AuthEnvelope<T>> for Envelope<T> {
    fn from(envelope: AuthEnvelope<T>) -> Self {
        Self::Auth(envelope)
    }
}

impl<T> From<OrderEnvelope<T>> for Envelope<T> {
    fn from(envelope: OrderEnvelope<T>) -> Self {
        Self::Order(envelope)
    }
}

/// Normalized outcome of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub message: String,
}

/// Classify an envelope into a success flag and a display message.
pub fn classify<T>(envelope: &Envelope<T>, default: &str) -> Verdict {
    Verdict {
        ok: envelope.is_success(),
        message: envelope.messages().resolve(default),
    }
}

/// Classify a raw JSON body without knowing which service produced it.
///
/// Bodies whose `data` cannot be represented still classify; only the
/// success field and messages are inspected.
pub fn classify_value(value: &Value, default: &str) -> Verdict {
    let envelope = Envelope::<Value>::from_value(value.clone())
        .unwrap_or_else(|_| Envelope::Auth(AuthEnvelope::default()));
    classify(&envelope, default)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|number| number.fract() == 0.0)
                .map(|number| number as i64)
        })
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn verdict(value: Value) -> Verdict {
        classify_value(&value, "fallback")
    }

    #[test]
    fn auth_code_200_is_success() {
        let v = verdict(json!({"code": 200, "data": {"id": 1}}));
        assert!(v.ok);
    }

    #[test]
    fn order_status_zero_is_success() {
        let v = verdict(json!({"status": 0, "data": [], "msg": "ok", "error": ""}));
        assert!(v.ok);
        assert_eq!(v.message, "ok");
    }

    #[test]
    fn other_values_fail_with_preferred_message() {
        let v = verdict(json!({"code": 500, "err_msg": "boom"}));
        assert_eq!(
            v,
            Verdict {
                ok: false,
                message: "boom".into()
            }
        );

        let v = verdict(json!({"status": 3, "msg": "bad filter", "error": "ignored"}));
        assert!(!v.ok);
        assert_eq!(v.message, "bad filter");

        let v = verdict(json!({"status": 1, "msg": "", "error": "denied"}));
        assert_eq!(v.message, "denied");
    }

    #[test]
    fn message_order_spans_both_families() {
        let v = verdict(json!({"code": 400, "err_msg": "first", "msg": "second", "error": "third"}));
        assert_eq!(v.message, "first");
    }

    #[test]
    fn missing_success_field_fails_with_default() {
        let v = verdict(json!({"data": {"x": 1}}));
        assert!(!v.ok);
        assert_eq!(v.message, "fallback");
    }

    #[test]
    fn tolerates_null_and_wrongly_typed_fields() {
        let v = verdict(json!({"code": "200", "err_msg": 42, "msg": null, "error": ["x"]}));
        assert!(!v.ok);
        assert_eq!(v.message, "fallback");

        let v = verdict(json!({"status": null, "msg": {"nested": true}}));
        assert!(!v.ok);
        assert_eq!(v.message, "fallback");

        let v = verdict(json!("not an object"));
        assert!(!v.ok);
    }

    #[test]
    fn integral_floats_count_as_codes() {
        assert!(verdict(json!({"code": 200.0})).ok);
        assert!(!verdict(json!({"code": 200.5})).ok);
    }

    #[test]
    fn status_wins_when_both_fields_present() {
        let envelope = Envelope::<Value>::from_value(json!({"code": 200, "status": 7}))
            .expect("decode should work");
        assert!(matches!(envelope, Envelope::Order(_)));
        assert!(!envelope.is_success());

        let envelope = Envelope::<Value>::from_value(json!({"code": 500, "status": 0}))
            .expect("decode should work");
        assert!(envelope.is_success());
    }

    #[test]
    fn typed_data_decodes_into_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Payload {
            total: u32,
        }

        let envelope = Envelope::<Payload>::from_value(json!({"status": 0, "data": {"total": 3}}))
            .expect("decode should work");
        assert_eq!(envelope.into_data(), Some(Payload { total: 3 }));
    }

    #[test]
    fn failure_envelope_carries_error_message() {
        let envelope: Envelope = OrderEnvelope::failure(502, "HTTP 502").into();
        assert_eq!(
            classify(&envelope, "fallback"),
            Verdict {
                ok: false,
                message: "HTTP 502".into()
            }
        );
    }
}
