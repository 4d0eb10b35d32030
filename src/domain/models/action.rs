use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Keys longer than this are truncated before they reach the wire. The
/// boundary layer rejects them outright; the executor clamps as a last
/// defense so an oversized key never silently corrupts a command line.
pub const MAX_KEY_LEN: usize = 200;

/// Characters a key may not contain, in addition to any whitespace.
pub const DISALLOWED_KEY_CHARS: [char; 6] = ['<', '>', '\'', '"', '`', '%'];

/// Everything the request boundary extracted for one dashboard request,
/// assembled once and passed by value. No component reads ambient request
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardRequest {
    pub server: Option<usize>,
    pub get_key: Option<String>,
    pub set: Option<SetInput>,
    pub delete_key: Option<String>,
    pub flush: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetInput {
    pub key: String,
    pub value: String,
    /// Seconds (up to 30 days) or an absolute unix timestamp; 0 = never.
    pub expire: i64,
}

/// The single action a request performs, constructed once by the request
/// boundary. When several input signals arrive together, precedence is
/// Get, then Set, then Delete, then Flush; only the first match survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheAction {
    Get { key: String },
    Set { key: String, value: String, expire: i64 },
    Delete { key: String },
    Flush,
    None,
}

impl CacheAction {
    pub fn from_request(request: &DashboardRequest) -> Self {
        if let Some(key) = &request.get_key {
            return CacheAction::Get {
                key: key.trim().to_string(),
            };
        }
        if let Some(set) = &request.set {
            return CacheAction::Set {
                key: set.key.clone(),
                value: set.value.clone(),
                expire: set.expire,
            };
        }
        if let Some(key) = &request.delete_key {
            return CacheAction::Delete { key: key.clone() };
        }
        if request.flush {
            return CacheAction::Flush;
        }
        CacheAction::None
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            CacheAction::Get { .. } => ActionKind::Get,
            CacheAction::Set { .. } => ActionKind::Set,
            CacheAction::Delete { .. } => ActionKind::Delete,
            CacheAction::Flush => ActionKind::Flush,
            CacheAction::None => ActionKind::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Get,
    Set,
    Delete,
    Flush,
    None,
}

impl ActionKind {
    /// Set, Delete and Flush instruct the caller to re-issue a clean read
    /// request afterwards; Get is read-only and safe to repeat.
    pub fn is_mutation(&self) -> bool {
        matches!(self, ActionKind::Set | ActionKind::Delete | ActionKind::Flush)
    }
}

/// Outcome of the single action a request performed. A get-miss is a valid
/// outcome, not an error: the key is echoed back and the value is the
/// empty string, which is indistinguishable from a stored empty string by
/// design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActionResult {
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub succeeded: bool,
}

impl ActionResult {
    pub fn none() -> Self {
        Self {
            action: ActionKind::None,
            key: None,
            value: None,
            succeeded: true,
        }
    }
}

/// Checks the boundary-layer key constraints: non-empty, bounded length,
/// no whitespace, and none of the disallowed special characters.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("Key must not be empty".to_string());
    }
    if key.len() > MAX_KEY_LEN {
        return Err(format!("Key exceeds maximum length of {}", MAX_KEY_LEN));
    }
    if let Some(c) = key
        .chars()
        .find(|c| c.is_whitespace() || DISALLOWED_KEY_CHARS.contains(c))
    {
        return Err(format!("Key contains disallowed character '{}'", c));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_input() -> SetInput {
        SetInput {
            key: "k".into(),
            value: "v".into(),
            expire: 0,
        }
    }

    #[test]
    fn get_wins_over_all_other_signals() {
        let request = DashboardRequest {
            server: None,
            get_key: Some(" foo ".into()),
            set: Some(set_input()),
            delete_key: Some("bar".into()),
            flush: true,
        };
        assert_eq!(
            CacheAction::from_request(&request),
            CacheAction::Get { key: "foo".into() }
        );
    }

    #[test]
    fn set_wins_over_delete_and_flush() {
        let request = DashboardRequest {
            set: Some(set_input()),
            delete_key: Some("bar".into()),
            flush: true,
            ..Default::default()
        };
        assert_eq!(CacheAction::from_request(&request).kind(), ActionKind::Set);
    }

    #[test]
    fn delete_wins_over_flush() {
        let request = DashboardRequest {
            delete_key: Some("bar".into()),
            flush: true,
            ..Default::default()
        };
        assert_eq!(
            CacheAction::from_request(&request),
            CacheAction::Delete { key: "bar".into() }
        );
    }

    #[test]
    fn no_signal_means_no_action() {
        let request = DashboardRequest::default();
        assert_eq!(CacheAction::from_request(&request), CacheAction::None);
    }

    #[test]
    fn get_key_is_trimmed() {
        let request = DashboardRequest {
            get_key: Some("  spaced  ".into()),
            ..Default::default()
        };
        assert_eq!(
            CacheAction::from_request(&request),
            CacheAction::Get { key: "spaced".into() }
        );
    }

    #[test]
    fn only_mutations_request_a_redirect() {
        assert!(ActionKind::Set.is_mutation());
        assert!(ActionKind::Delete.is_mutation());
        assert!(ActionKind::Flush.is_mutation());
        assert!(!ActionKind::Get.is_mutation());
        assert!(!ActionKind::None.is_mutation());
    }

    #[test]
    fn key_validation_enforces_charset_and_length() {
        assert!(validate_key("session:user:42").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key("tab\there").is_err());
        for c in DISALLOWED_KEY_CHARS {
            assert!(validate_key(&format!("bad{}key", c)).is_err());
        }
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }
}
