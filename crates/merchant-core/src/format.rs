//! Display helpers for amounts, timestamps, order statuses and image lists.

use chrono::DateTime;
use serde_json::Value;

use crate::types::OrderStatus;

/// Sentinel the order service uses for "never happened".
pub const ZERO_DATE: &str = "0001-01-01T00:00:00Z";
pub const EMPTY_DATE: &str = "-";

/// Format an amount in cents as a two-decimal string.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
}

/// Format an RFC 3339 timestamp as `YYYY/MM/DD HH:MM:SS` in its own offset.
///
/// Empty strings and the zero date render as `-`; unparseable input is
/// returned unchanged.
pub fn format_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == ZERO_DATE {
        return EMPTY_DATE.to_owned();
    }
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(parsed) => parsed.format("%Y/%m/%d %H:%M:%S").to_string(),
        Err(_) => value.to_owned(),
    }
}

/// CSS-style class for an order status label.
pub fn status_class(status: &str) -> String {
    match OrderStatus::from_label(status) {
        Some(known) => format!("status-{}", known.label().to_ascii_lowercase()),
        None => "status-unknown".to_owned(),
    }
}

/// Display name for an order status label; unknown labels pass through.
pub fn status_name(status: &str) -> String {
    OrderStatus::from_label(status)
        .map(|known| known.label().to_owned())
        .unwrap_or_else(|| status.to_owned())
}

/// Encode image identifiers for the `pic_info` field.
pub fn format_pic_info(image_ids: &[String]) -> String {
    Value::from(image_ids.to_vec()).to_string()
}

/// Decode a `pic_info` field into image identifiers.
///
/// Accepts a JSON array, a JSON string, or a bare identifier.
pub fn parse_pic_info(pic_info: Option<&str>) -> Vec<String> {
    let Some(raw) = pic_info.filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        Ok(Value::String(text)) => vec![text],
        Ok(_) => Vec::new(),
        Err(_) => vec![raw.to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents_with_two_decimals() {
        assert_eq!(format_amount(12345), "123.45");
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(-250), "-2.50");
    }

    #[test]
    fn empty_and_zero_dates_render_as_dash() {
        assert_eq!(format_date(""), "-");
        assert_eq!(format_date("0001-01-01T00:00:00Z"), "-");
    }

    #[test]
    fn formats_timestamps_in_their_offset() {
        assert_eq!(format_date("2024-03-05T09:07:02Z"), "2024/03/05 09:07:02");
        assert_eq!(
            format_date("2024-12-31T23:59:59+08:00"),
            "2024/12/31 23:59:59"
        );
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn maps_status_labels() {
        assert_eq!(status_class("Shipped"), "status-shipped");
        assert_eq!(status_class("Lost"), "status-unknown");
        assert_eq!(status_name("Paid"), "Paid");
        assert_eq!(status_name("Lost"), "Lost");
    }

    #[test]
    fn parses_pic_info_variants() {
        assert!(parse_pic_info(None).is_empty());
        assert!(parse_pic_info(Some("")).is_empty());
        assert_eq!(parse_pic_info(Some(r#"["a","b"]"#)), vec!["a", "b"]);
        assert_eq!(parse_pic_info(Some(r#""one""#)), vec!["one"]);
        assert!(parse_pic_info(Some("{\"x\":1}")).is_empty());
        assert_eq!(parse_pic_info(Some("img-77")), vec!["img-77"]);
    }

    #[test]
    fn pic_info_encodes_as_json_array() {
        let ids = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(format_pic_info(&ids), r#"["a","b"]"#);
        assert_eq!(parse_pic_info(Some(&format_pic_info(&ids))), ids);
    }
}
