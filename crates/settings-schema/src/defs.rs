//! All setting definitions with their defaults, bounds, and sync eligibility.

use std::sync::LazyLock;

use crate::{SettingKey, SettingKind, SettingValue};

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: SettingKey,
    pub kind: SettingKind,
    pub default: SettingValue,
    /// Whether this value may ever leave the local device.
    pub server_safe: bool,
    /// UI grouping label.
    pub category: &'static str,
    /// Allowed values (enum kind only).
    pub options: &'static [&'static str],
    /// Inclusive numeric bounds (number kind only).
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub description: &'static str,
}

fn boolean(
    key: SettingKey,
    default: bool,
    server_safe: bool,
    category: &'static str,
    description: &'static str,
) -> SettingDef {
    SettingDef {
        key,
        kind: SettingKind::Boolean,
        default: SettingValue::Bool(default),
        server_safe,
        category,
        options: &[],
        min: None,
        max: None,
        description,
    }
}

fn number(
    key: SettingKey,
    default: f64,
    min: f64,
    max: f64,
    server_safe: bool,
    category: &'static str,
    description: &'static str,
) -> SettingDef {
    SettingDef {
        key,
        kind: SettingKind::Number,
        default: SettingValue::Number(default),
        server_safe,
        category,
        options: &[],
        min: Some(min),
        max: Some(max),
        description,
    }
}

fn choice(
    key: SettingKey,
    default: &'static str,
    options: &'static [&'static str],
    server_safe: bool,
    category: &'static str,
    description: &'static str,
) -> SettingDef {
    SettingDef {
        key,
        kind: SettingKind::Enum,
        default: SettingValue::String(default.to_string()),
        server_safe,
        category,
        options,
        min: None,
        max: None,
        description,
    }
}

fn text(
    key: SettingKey,
    default: &'static str,
    server_safe: bool,
    category: &'static str,
    description: &'static str,
) -> SettingDef {
    SettingDef {
        key,
        kind: SettingKind::String,
        default: SettingValue::String(default.to_string()),
        server_safe,
        category,
        options: &[],
        min: None,
        max: None,
        description,
    }
}

/// Definition table, indexed by `SettingKey` discriminant (same order as
/// [`SettingKey::ALL`]).
static DEFINITIONS: LazyLock<Vec<SettingDef>> = LazyLock::new(|| {
    use SettingKey::*;
    vec![
        choice(
            EditorTheme,
            "vs-dark",
            &["vs", "vs-dark", "hc-black"],
            true,
            "Editor",
            "Color theme for the code editor",
        ),
        number(EditorFontSize, 14.0, 10.0, 24.0, true, "Editor", "Editor font size in pixels"),
        number(EditorTabSize, 2.0, 1.0, 8.0, true, "Editor", "Spaces per indentation level"),
        boolean(EditorWordWrap, true, true, "Editor", "Soft-wrap long lines"),
        boolean(EditorMinimap, false, true, "Editor", "Show the code minimap"),
        boolean(EditorLineNumbers, true, true, "Editor", "Show line numbers in the gutter"),
        boolean(EditorFormatOnSave, false, true, "Editor", "Reformat the snippet before saving"),
        choice(
            SnippetsDefaultLanguage,
            "css",
            &["css", "html"],
            true,
            "Snippets",
            "Language preselected for new snippets",
        ),
        boolean(
            SnippetsTrimTrailingWhitespace,
            true,
            true,
            "Snippets",
            "Strip trailing whitespace on save",
        ),
        boolean(AutosaveEnabled, true, true, "Autosave", "Save drafts automatically while editing"),
        number(
            AutosaveIntervalSeconds,
            30.0,
            5.0,
            600.0,
            true,
            "Autosave",
            "Seconds between automatic draft saves",
        ),
        number(
            NotificationsDurationSeconds,
            5.0,
            1.0,
            30.0,
            true,
            "Notifications",
            "Seconds a toast stays on screen",
        ),
        choice(
            NotificationsPosition,
            "bottom-right",
            &["top-left", "top-right", "bottom-left", "bottom-right"],
            true,
            "Notifications",
            "Screen corner for toast notifications",
        ),
        number(PanelWidth, 900.0, 320.0, 3840.0, false, "Panel", "Editor panel width in pixels"),
        number(PanelHeight, 600.0, 240.0, 2160.0, false, "Panel", "Editor panel height in pixels"),
        boolean(
            PanelRememberPosition,
            true,
            false,
            "Panel",
            "Restore the panel where it was last closed",
        ),
        boolean(SyncEnabled, true, false, "Sync", "Sync eligible settings to the server"),
        boolean(AdvancedDebugLogging, false, false, "Advanced", "Verbose console logging"),
        text(
            AdvancedPreviewToken,
            "",
            false,
            "Advanced",
            "Draft preview token; never leaves this device",
        ),
    ]
});

/// Get the definition for a key.
pub fn definition(key: SettingKey) -> &'static SettingDef {
    &DEFINITIONS[key as usize]
}

/// Iterate all definitions in schema order.
pub fn definitions() -> impl Iterator<Item = &'static SettingDef> {
    DEFINITIONS.iter()
}

/// All defined dotted paths, in schema order.
pub fn list_paths() -> impl Iterator<Item = &'static str> {
    SettingKey::ALL.iter().map(|key| key.path())
}

/// Whether this setting may ever be sent to the remote property store.
pub fn is_server_safe(key: SettingKey) -> bool {
    definition(key).server_safe
}
