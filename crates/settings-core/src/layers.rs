//! In-memory layer snapshot and resolution order.

use std::collections::HashMap;

use properties_client::PropertyMap;
use settings_schema::{SettingKey, SettingValue, definition, validate};
use settings_store::LocalStore;

use crate::{EffectiveValue, Source};

/// The four settings layers plus session state, owned exclusively by the
/// manager. `embed` is written once at construction and never mutated.
#[derive(Debug, Default)]
pub(crate) struct LayerSnapshot {
    pub embed: HashMap<SettingKey, SettingValue>,
    pub user: HashMap<SettingKey, SettingValue>,
    pub site: HashMap<SettingKey, SettingValue>,
    pub local: HashMap<SettingKey, SettingValue>,
    pub logged_in: bool,
}

impl LayerSnapshot {
    /// Resolve a key through the layers in strict priority order. The schema
    /// default guarantees a result for every known key.
    pub fn resolve(&self, key: SettingKey) -> EffectiveValue {
        if let Some(value) = self.embed.get(&key) {
            return EffectiveValue {
                value: value.clone(),
                source: Source::Embed,
                locked: true,
            };
        }
        // The user layer only participates while a session is active.
        if self.logged_in {
            if let Some(value) = self.user.get(&key) {
                return EffectiveValue {
                    value: value.clone(),
                    source: Source::User,
                    locked: false,
                };
            }
        }
        if let Some(value) = self.site.get(&key) {
            return EffectiveValue {
                value: value.clone(),
                source: Source::Site,
                locked: false,
            };
        }
        if let Some(value) = self.local.get(&key) {
            return EffectiveValue {
                value: value.clone(),
                source: Source::Local,
                locked: false,
            };
        }
        EffectiveValue {
            value: definition(key).default.clone(),
            source: Source::Default,
            locked: false,
        }
    }
}

/// Build the local layer from the store's persisted rows. Runs synchronously
/// at construction so the UI can resolve a value on first paint.
pub(crate) fn load_local_layer(store: &LocalStore) -> HashMap<SettingKey, SettingValue> {
    let mut layer = HashMap::new();
    for (path, json) in store.read_all() {
        match keyed_value(&path, &json) {
            Some((key, value)) => {
                layer.insert(key, value);
            }
            None => {
                tracing::warn!("Dropping unusable cached setting {path}");
            }
        }
    }
    layer
}

/// Convert a fetched remote property map into a typed layer, dropping
/// anything the schema does not recognize or accept.
pub(crate) fn typed_layer(map: PropertyMap, origin: &str) -> HashMap<SettingKey, SettingValue> {
    let mut layer = HashMap::new();
    for (path, json) in map {
        match keyed_value(&path, &json) {
            Some((key, value)) => {
                layer.insert(key, value);
            }
            None => {
                tracing::warn!("Dropping unusable {origin} property {path}");
            }
        }
    }
    layer
}

fn keyed_value(path: &str, json: &serde_json::Value) -> Option<(SettingKey, SettingValue)> {
    let key = SettingKey::from_path(path)?;
    let value = SettingValue::from_json(json)?;
    validate(key, &value).ok()?;
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LayerSnapshot {
        LayerSnapshot::default()
    }

    #[test]
    fn test_default_when_all_layers_empty() {
        let layers = snapshot();
        let eff = layers.resolve(SettingKey::EditorFontSize);
        assert_eq!(eff.value, SettingValue::Number(14.0));
        assert_eq!(eff.source, Source::Default);
        assert!(!eff.locked);
    }

    #[test]
    fn test_embed_wins_and_locks() {
        let mut layers = snapshot();
        layers.embed.insert(SettingKey::EditorFontSize, SettingValue::Number(12.0));
        layers.user.insert(SettingKey::EditorFontSize, SettingValue::Number(16.0));
        layers.site.insert(SettingKey::EditorFontSize, SettingValue::Number(18.0));
        layers.local.insert(SettingKey::EditorFontSize, SettingValue::Number(20.0));
        layers.logged_in = true;

        let eff = layers.resolve(SettingKey::EditorFontSize);
        assert_eq!(eff.value, SettingValue::Number(12.0));
        assert_eq!(eff.source, Source::Embed);
        assert!(eff.locked);
    }

    #[test]
    fn test_user_layer_requires_session() {
        let mut layers = snapshot();
        layers.user.insert(SettingKey::EditorFontSize, SettingValue::Number(16.0));
        layers.local.insert(SettingKey::EditorFontSize, SettingValue::Number(20.0));

        // Anonymous: the user layer is skipped entirely.
        let eff = layers.resolve(SettingKey::EditorFontSize);
        assert_eq!(eff.source, Source::Local);
        assert_eq!(eff.value, SettingValue::Number(20.0));

        layers.logged_in = true;
        let eff = layers.resolve(SettingKey::EditorFontSize);
        assert_eq!(eff.source, Source::User);
        assert_eq!(eff.value, SettingValue::Number(16.0));
    }

    #[test]
    fn test_site_beats_local() {
        let mut layers = snapshot();
        layers.site.insert(SettingKey::EditorTheme, SettingValue::String("hc-black".into()));
        layers.local.insert(SettingKey::EditorTheme, SettingValue::String("vs".into()));

        let eff = layers.resolve(SettingKey::EditorTheme);
        assert_eq!(eff.source, Source::Site);
        assert_eq!(eff.value, SettingValue::String("hc-black".into()));
    }

    #[test]
    fn test_typed_layer_filters_garbage() {
        let mut map = PropertyMap::new();
        map.insert("editor.theme".into(), serde_json::json!("hc-black"));
        map.insert("editor.fontSize".into(), serde_json::json!(999)); // out of range
        map.insert("not.a.setting".into(), serde_json::json!(1));
        map.insert("editor.wordWrap".into(), serde_json::json!({"nested": true}));

        let layer = typed_layer(map, "user");
        assert_eq!(layer.len(), 1);
        assert_eq!(
            layer[&SettingKey::EditorTheme],
            SettingValue::String("hc-black".into())
        );
    }

    #[test]
    fn test_load_local_layer_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();
        store.write("editor.fontSize", &serde_json::json!(18));
        store.write("bogus.path", &serde_json::json!(1));

        let layer = load_local_layer(&store);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer[&SettingKey::EditorFontSize], SettingValue::Number(18.0));
    }
}
