use chrono::{FixedOffset, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured values are rendered as a pretty-printed dump; anything longer
/// than this is cut off rather than shipped to the browser whole.
pub const STRUCTURED_RENDER_LIMIT: usize = 4096;

/// All expiry timestamps are displayed in a fixed Pacific (UTC-8) offset.
/// This is a display convention, not a configuration knob.
static DISPLAY_OFFSET: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::west_opt(8 * 3600).expect("valid fixed offset"));

/// Logical kind of a stored value, derived after retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    /// A JSON object or array; rendered pretty-printed and flagged so the
    /// presentation layer can mark it visually.
    Structured,
}

/// One entry reconstructed from a slab dump plus a follow-up `get`.
///
/// Not authoritative: presence in a snapshot does not guarantee the key is
/// still in the cache, and absence does not guarantee it is gone. Built
/// fresh on every listing request and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub value_kind: ValueKind,
    /// Formatted display string: `no expire` or `YYYY-MM-DD HH:MM:SS`.
    pub expires_at: String,
    pub size_bytes: u64,
}

/// Classifies a raw retrieved value and produces its display rendering.
///
/// Values that parse as JSON objects or arrays count as structured and are
/// pretty-printed (bounded); JSON scalars map to their primitive kind and
/// are shown verbatim; everything else is a plain string.
pub fn classify_value(raw: &str) -> (ValueKind, String) {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            let rendered =
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string());
            (ValueKind::Structured, truncate_rendered(rendered))
        },
        Ok(serde_json::Value::Number(n)) => {
            let kind = if n.is_i64() || n.is_u64() {
                ValueKind::Integer
            } else {
                ValueKind::Float
            };
            (kind, raw.to_string())
        },
        Ok(serde_json::Value::Bool(_)) => (ValueKind::Boolean, raw.to_string()),
        _ => (ValueKind::String, raw.to_string()),
    }
}

fn truncate_rendered(rendered: String) -> String {
    if rendered.len() <= STRUCTURED_RENDER_LIMIT {
        return rendered;
    }

    let mut cut = STRUCTURED_RENDER_LIMIT;
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n… [truncated]", &rendered[..cut])
}

/// Formats an absolute expiry timestamp for display. Zero (and anything
/// negative or unrepresentable) means the entry never expires.
pub fn format_expiry(expires_at: i64) -> String {
    if expires_at <= 0 {
        return "no expire".to_string();
    }

    match Utc.timestamp_opt(expires_at, 0) {
        chrono::LocalResult::Single(ts) => ts
            .with_timezone(&*DISPLAY_OFFSET)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        _ => "no expire".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_expiry_renders_as_no_expire() {
        assert_eq!(format_expiry(0), "no expire");
        assert_eq!(format_expiry(-1), "no expire");
    }

    #[test]
    fn positive_expiry_renders_in_display_offset() {
        // 1700000000 = 2023-11-14 22:13:20 UTC, minus eight hours
        assert_eq!(format_expiry(1_700_000_000), "2023-11-14 14:13:20");
    }

    #[test]
    fn scalars_classify_by_parsed_type() {
        assert_eq!(classify_value("123"), (ValueKind::Integer, "123".into()));
        assert_eq!(classify_value("1.5"), (ValueKind::Float, "1.5".into()));
        assert_eq!(classify_value("true"), (ValueKind::Boolean, "true".into()));
        assert_eq!(
            classify_value("hello world"),
            (ValueKind::String, "hello world".into())
        );
    }

    #[test]
    fn json_objects_are_structured_and_pretty_printed() {
        let (kind, rendered) = classify_value(r#"{"a":1}"#);
        assert_eq!(kind, ValueKind::Structured);
        assert!(rendered.contains("\"a\": 1"));
    }

    #[test]
    fn oversized_structured_render_is_truncated() {
        let big: Vec<String> = (0..2000).map(|i| format!("item-{}", i)).collect();
        let raw = serde_json::to_string(&big).unwrap();
        let (kind, rendered) = classify_value(&raw);
        assert_eq!(kind, ValueKind::Structured);
        assert!(rendered.len() < raw.len() * 2);
        assert!(rendered.ends_with("[truncated]"));
    }

    #[test]
    fn quoted_json_string_stays_a_string() {
        let (kind, rendered) = classify_value(r#""quoted""#);
        assert_eq!(kind, ValueKind::String);
        assert_eq!(rendered, r#""quoted""#);
    }
}
