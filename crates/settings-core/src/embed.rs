//! Embed config parsing.
//!
//! The embedding page may supply a JSON blob of locked settings at load
//! time. It is parsed exactly once; nested objects flatten into dotted
//! paths, so `{"editor": {"theme": "vs-dark"}}` locks `editor.theme`.
//! Malformed input degrades to an empty layer with a warning, never an
//! error to the caller.

use std::collections::HashMap;

use settings_schema::{SettingKey, SettingValue, validate};

/// Parse the host page's embed config into a locked settings layer.
///
/// Unknown paths, non-scalar values, and values that fail schema validation
/// are skipped with a warning; they cannot lock anything.
pub fn parse_embed_config(raw: &str) -> HashMap<SettingKey, SettingValue> {
    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Ignoring malformed embed config: {e}");
            return HashMap::new();
        }
    };
    let Some(obj) = parsed.as_object() else {
        tracing::warn!("Ignoring embed config: expected a JSON object");
        return HashMap::new();
    };

    let mut flat = Vec::new();
    flatten("", obj, &mut flat);

    let mut layer = HashMap::new();
    for (path, json) in flat {
        let Some(key) = SettingKey::from_path(&path) else {
            tracing::warn!("Embed config names unknown setting {path}; skipping");
            continue;
        };
        let Some(value) = SettingValue::from_json(&json) else {
            tracing::warn!("Embed config value for {path} is not a scalar; skipping");
            continue;
        };
        if let Err(e) = validate(key, &value) {
            tracing::warn!("Embed config value rejected: {e}");
            continue;
        }
        layer.insert(key, value);
    }
    layer
}

fn flatten(
    prefix: &str,
    obj: &serde_json::Map<String, serde_json::Value>,
    out: &mut Vec<(String, serde_json::Value)>,
) {
    for (name, value) in obj {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            serde_json::Value::Object(nested) => flatten(&path, nested, out),
            other => out.push((path, other.clone())),
        }
    }
}
