//! Operator-facing settings inspector.
//!
//! Thin convenience surface over [`SettingsManager`] for the in-browser
//! debug console: export the full layer snapshot, ask where a value came
//! from, and print a per-setting report. Everything here is addressed by
//! dotted string path, since that is what an operator types.

use settings_core::manager::ConfigExport;
use settings_core::{SettingsManager, Source};
use settings_schema::{SettingKey, SettingKind, definition};

/// Read-only inspector over a shared [`SettingsManager`].
pub struct Inspector {
    manager: SettingsManager,
}

impl Inspector {
    pub fn new(manager: SettingsManager) -> Self {
        Self { manager }
    }

    /// Structured snapshot of all four raw layers plus the effective map.
    pub fn export(&self) -> ConfigExport {
        self.manager.export()
    }

    /// The export snapshot as JSON, ready to paste into a support ticket.
    pub fn dump_json(&self) -> serde_json::Value {
        serde_json::to_value(self.manager.export()).unwrap_or(serde_json::Value::Null)
    }

    /// Which layer currently supplies the value for `path`.
    pub fn source(&self, path: &str) -> Option<Source> {
        Some(self.manager.effective_path(path)?.source)
    }

    /// Human-readable layer-by-layer report for one setting.
    pub fn debug(&self, path: &str) -> Option<String> {
        let effective = self.manager.effective_path(path)?;
        let key = SettingKey::from_path(path)?;
        let def = definition(key);
        let export = self.manager.export();

        let mut out = String::new();
        out.push_str(&format!("{path}: {} ({})", kind_name(def.kind), def.category));
        out.push_str(&format!(", default {}", def.default));
        if let (Some(min), Some(max)) = (def.min, def.max) {
            out.push_str(&format!(", range {min}..={max}"));
        }
        if !def.options.is_empty() {
            out.push_str(&format!(", one of {:?}", def.options));
        }
        out.push_str(if def.server_safe {
            ", syncs to server\n"
        } else {
            ", device-local\n"
        });

        for (name, layer) in [
            ("embed", &export.embed),
            ("user", &export.user),
            ("site", &export.site),
            ("local", &export.local),
        ] {
            match layer.get(path) {
                Some(value) => out.push_str(&format!("  {name:<5} {value}\n")),
                None => out.push_str(&format!("  {name:<5} (unset)\n")),
            }
        }

        out.push_str(&format!(
            "  effective: {} ({}{})\n",
            effective.value,
            source_name(effective.source),
            if effective.locked { ", locked" } else { "" },
        ));
        Some(out)
    }
}

fn kind_name(kind: SettingKind) -> &'static str {
    match kind {
        SettingKind::String => "string",
        SettingKind::Number => "number",
        SettingKind::Boolean => "boolean",
        SettingKind::Enum => "enum",
    }
}

fn source_name(source: Source) -> &'static str {
    match source {
        Source::Embed => "embed",
        Source::User => "user",
        Source::Site => "site",
        Source::Local => "local",
        Source::Default => "default",
    }
}
