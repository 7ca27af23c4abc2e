//! Open string→value configuration shared between descriptors and clients.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Provider-specific configuration. Descriptor defaults and caller overrides
/// are both expressed as a `ConfigMap`.
pub type ConfigMap = Map<String, Value>;

/// Merge `overrides` on top of `base`, key by key. Override values win.
pub fn merge_config(base: &ConfigMap, overrides: &ConfigMap) -> ConfigMap {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Typed accessors over a [`ConfigMap`].
///
/// Lookups are lenient about representation: numbers given as strings are
/// parsed, and `null` counts as absent.
pub trait ConfigMapExt {
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_u64(&self, key: &str) -> Option<u64>;
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_string_map(&self, key: &str) -> HashMap<String, String>;
}

impl ConfigMapExt for ConfigMap {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_string_map(&self, key: &str) -> HashMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| {
                        let value = match v {
                            Value::String(s) => s.clone(),
                            Value::Null => return None,
                            other => other.to_string(),
                        };
                        Some((k.clone(), value))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn overrides_win_key_by_key() {
        let base = map(json!({"base_url": "https://a", "timeout": 60}));
        let overrides = map(json!({"timeout": 5, "api_key": "sk"}));
        let merged = merge_config(&base, &overrides);
        assert_eq!(merged.get_str("base_url"), Some("https://a"));
        assert_eq!(merged.get_u64("timeout"), Some(5));
        assert_eq!(merged.get_str("api_key"), Some("sk"));
        // inputs untouched
        assert_eq!(base.get_u64("timeout"), Some(60));
    }

    #[test]
    fn lenient_numbers_and_bools() {
        let config = map(json!({"a": "12", "b": 1.5, "c": "true", "d": null}));
        assert_eq!(config.get_u64("a"), Some(12));
        assert_eq!(config.get_f64("b"), Some(1.5));
        assert_eq!(config.get_bool("c"), Some(true));
        assert_eq!(config.get_u64("d"), None);
    }

    #[test]
    fn string_map_stringifies_scalars() {
        let config = map(json!({"headers": {"X-Trace": "1", "X-Retry": 2}}));
        let headers = config.get_string_map("headers");
        assert_eq!(headers["X-Trace"], "1");
        assert_eq!(headers["X-Retry"], "2");
    }
}
