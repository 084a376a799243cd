//! The in-memory form of a parsed YAML document.

use std::path::PathBuf;

use crate::value::Value;

/// `(namespace, kind, name)` — the identity deduplication keys on. Namespace
/// is the empty string for cluster-scoped kinds.
pub type Identity = (String, String, String);

#[derive(Clone, Debug)]
pub struct ResourceRecord {
    pub source: PathBuf,
    pub data: Value,
}

impl ResourceRecord {
    pub fn new(source: PathBuf, data: Value) -> Self {
        Self { source, data }
    }

    pub fn kind(&self) -> String {
        self.data
            .get_str_path(&["kind"])
            .unwrap_or_default()
            .to_string()
    }

    pub fn api_version(&self) -> String {
        self.data
            .get_str_path(&["apiVersion"])
            .unwrap_or_default()
            .to_string()
    }

    pub fn name(&self) -> String {
        self.data
            .get_str_path(&["metadata", "name"])
            .unwrap_or_default()
            .to_string()
    }

    pub fn namespace(&self) -> String {
        self.data
            .get_str_path(&["metadata", "namespace"])
            .unwrap_or_default()
            .to_string()
    }

    pub fn identity(&self) -> Identity {
        (self.namespace(), self.kind(), self.name())
    }

    pub fn labels(&self) -> Vec<(&str, &str)> {
        self.data
            .get_path(&["metadata", "labels"])
            .and_then(Value::as_map)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sets `kind` on this record when it is absent, used when flattening a
    /// list document whose items omit the per-item `kind` field.
    pub fn backfill_kind(&mut self, kind: &str) {
        if self.data.get_str_path(&["kind"]).unwrap_or_default().is_empty() {
            self.data.insert("kind", Value::String(kind.to_string()));
        }
    }
}
