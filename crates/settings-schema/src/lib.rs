//! Static settings schema for the snippet editor toolkit.
//!
//! Declares every known setting as a closed [`SettingKey`] with its type,
//! default, server-safe flag, UI category, and validation bounds. Pure data
//! plus validation; everything else in the workspace consumes this crate.

pub mod defs;
pub mod validation;

pub use defs::{SettingDef, definition, definitions, is_server_safe, list_paths};
pub use validation::{ValidationError, validate};

use serde::{Deserialize, Serialize};

/// Every setting known to the toolkit.
///
/// The enum is the canonical addressing scheme; the dotted string paths are
/// kept only for the operator-facing debug surface and the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    EditorTheme,
    EditorFontSize,
    EditorTabSize,
    EditorWordWrap,
    EditorMinimap,
    EditorLineNumbers,
    EditorFormatOnSave,
    SnippetsDefaultLanguage,
    SnippetsTrimTrailingWhitespace,
    AutosaveEnabled,
    AutosaveIntervalSeconds,
    NotificationsDurationSeconds,
    NotificationsPosition,
    PanelWidth,
    PanelHeight,
    PanelRememberPosition,
    SyncEnabled,
    AdvancedDebugLogging,
    AdvancedPreviewToken,
}

impl SettingKey {
    /// All keys, in schema order.
    pub const ALL: &'static [SettingKey] = &[
        SettingKey::EditorTheme,
        SettingKey::EditorFontSize,
        SettingKey::EditorTabSize,
        SettingKey::EditorWordWrap,
        SettingKey::EditorMinimap,
        SettingKey::EditorLineNumbers,
        SettingKey::EditorFormatOnSave,
        SettingKey::SnippetsDefaultLanguage,
        SettingKey::SnippetsTrimTrailingWhitespace,
        SettingKey::AutosaveEnabled,
        SettingKey::AutosaveIntervalSeconds,
        SettingKey::NotificationsDurationSeconds,
        SettingKey::NotificationsPosition,
        SettingKey::PanelWidth,
        SettingKey::PanelHeight,
        SettingKey::PanelRememberPosition,
        SettingKey::SyncEnabled,
        SettingKey::AdvancedDebugLogging,
        SettingKey::AdvancedPreviewToken,
    ];

    /// Canonical dotted path for this key.
    pub fn path(self) -> &'static str {
        match self {
            SettingKey::EditorTheme => "editor.theme",
            SettingKey::EditorFontSize => "editor.fontSize",
            SettingKey::EditorTabSize => "editor.tabSize",
            SettingKey::EditorWordWrap => "editor.wordWrap",
            SettingKey::EditorMinimap => "editor.minimap",
            SettingKey::EditorLineNumbers => "editor.lineNumbers",
            SettingKey::EditorFormatOnSave => "editor.formatOnSave",
            SettingKey::SnippetsDefaultLanguage => "snippets.defaultLanguage",
            SettingKey::SnippetsTrimTrailingWhitespace => "snippets.trimTrailingWhitespace",
            SettingKey::AutosaveEnabled => "autosave.enabled",
            SettingKey::AutosaveIntervalSeconds => "autosave.intervalSeconds",
            SettingKey::NotificationsDurationSeconds => "notifications.durationSeconds",
            SettingKey::NotificationsPosition => "notifications.position",
            SettingKey::PanelWidth => "panel.width",
            SettingKey::PanelHeight => "panel.height",
            SettingKey::PanelRememberPosition => "panel.rememberPosition",
            SettingKey::SyncEnabled => "sync.enabled",
            SettingKey::AdvancedDebugLogging => "advanced.debugLogging",
            SettingKey::AdvancedPreviewToken => "advanced.previewToken",
        }
    }

    /// Look up a key by its dotted path. Unknown paths return `None`.
    pub fn from_path(path: &str) -> Option<SettingKey> {
        SettingKey::ALL.iter().copied().find(|k| k.path() == path)
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Value type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    String,
    Number,
    Boolean,
    Enum,
}

/// A dynamically-typed setting value.
///
/// Untagged so the wire and store formats stay plain JSON scalars
/// (`"vs-dark"`, `14`, `true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert from a JSON value. Only scalars are accepted; arrays, objects
    /// and null have no setting representation.
    pub fn from_json(value: &serde_json::Value) -> Option<SettingValue> {
        match value {
            serde_json::Value::Bool(b) => Some(SettingValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(SettingValue::Number),
            serde_json::Value::String(s) => Some(SettingValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SettingValue::Bool(b) => serde_json::Value::Bool(*b),
            SettingValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SettingValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Short type name for log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "boolean",
            SettingValue::Number(_) => "number",
            SettingValue::String(_) => "string",
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Number(n) => write!(f, "{n}"),
            SettingValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<f64> for SettingValue {
    fn from(n: f64) -> Self {
        SettingValue::Number(n)
    }
}

impl From<i32> for SettingValue {
    fn from(n: i32) -> Self {
        SettingValue::Number(f64::from(n))
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::String(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_roundtrip_for_all_keys() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_path(key.path()), Some(*key));
        }
    }

    #[test]
    fn test_unknown_path() {
        assert_eq!(SettingKey::from_path("editor.unknown"), None);
        assert_eq!(SettingKey::from_path(""), None);
    }

    #[test]
    fn test_value_json_roundtrip() {
        let cases = [
            SettingValue::Bool(true),
            SettingValue::Number(14.0),
            SettingValue::String("vs-dark".into()),
        ];
        for v in cases {
            assert_eq!(SettingValue::from_json(&v.to_json()), Some(v));
        }
    }

    #[test]
    fn test_value_rejects_non_scalars() {
        assert_eq!(SettingValue::from_json(&serde_json::json!(null)), None);
        assert_eq!(SettingValue::from_json(&serde_json::json!([1, 2])), None);
        assert_eq!(SettingValue::from_json(&serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn test_untagged_serde() {
        let v: SettingValue = serde_json::from_str("\"vs-dark\"").unwrap();
        assert_eq!(v, SettingValue::String("vs-dark".into()));
        let v: SettingValue = serde_json::from_str("14").unwrap();
        assert_eq!(v, SettingValue::Number(14.0));
        let v: SettingValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, SettingValue::Bool(true));
        assert_eq!(serde_json::to_string(&SettingValue::Number(14.0)).unwrap(), "14.0");
    }
}
