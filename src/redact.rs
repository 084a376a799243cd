//! The Redactor: strips sensitive fields before records leave the core,
//! unless the caller opts into `raw` mode.

use crate::record::ResourceRecord;
use crate::value::Value;

pub const REDACTED: &str = "<REDACTED>";

const SENSITIVE_SUBSTRINGS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "private_key",
    "ssh_key",
    "certificate",
    "credentials",
];

const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Redacted,
    Raw,
}

pub struct Redactor {
    mode: Mode,
}

impl Redactor {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn redact(&self, record: &ResourceRecord) -> ResourceRecord {
        if self.mode == Mode::Raw {
            return record.clone();
        }

        let is_secret = record.kind() == "Secret";
        let data = redact_value(&record.data, is_secret, true);
        ResourceRecord::new(record.source.clone(), data)
    }
}

fn redact_value(value: &Value, is_secret_root: bool, at_root: bool) -> Value {
    match value {
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, child)| {
                    let lower = key.to_lowercase();

                    if at_root && is_secret_root && (key == "data" || key == "stringData") {
                        return (key.clone(), redact_leaf_values(child));
                    }

                    if key == LAST_APPLIED_ANNOTATION {
                        return (key.clone(), Value::String(REDACTED.to_string()));
                    }

                    if SENSITIVE_SUBSTRINGS.iter().any(|pat| lower.contains(pat)) {
                        return (key.clone(), Value::String(REDACTED.to_string()));
                    }

                    (key.clone(), redact_value(child, is_secret_root, false))
                })
                .collect(),
        ),
        Value::Seq(items) => {
            Value::Seq(items.iter().map(|item| redact_value(item, is_secret_root, false)).collect())
        }
        other => other.clone(),
    }
}

fn redact_leaf_values(value: &Value) -> Value {
    match value {
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, _)| (k.clone(), Value::String(REDACTED.to_string())))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(data: Value) -> ResourceRecord {
        ResourceRecord::new(PathBuf::from("test.yaml"), data)
    }

    #[test]
    fn secret_data_and_string_data_are_redacted() {
        let data = Value::Map(vec![
            ("kind".into(), Value::String("Secret".into())),
            (
                "data".into(),
                Value::Map(vec![("password".into(), Value::String("cGFzcw==".into()))]),
            ),
        ]);

        let redacted = Redactor::new(Mode::Redacted).redact(&record(data));
        assert_eq!(
            redacted.data.get_str_path(&["data", "password"]),
            Some(REDACTED)
        );
    }

    #[test]
    fn raw_mode_preserves_original_value() {
        let data = Value::Map(vec![(
            "data".into(),
            Value::Map(vec![("password".into(), Value::String("cGFzcw==".into()))]),
        )]);

        let raw = Redactor::new(Mode::Raw).redact(&record(data));
        assert_eq!(raw.data.get_str_path(&["data", "password"]), Some("cGFzcw=="));
    }

    #[test]
    fn sensitive_key_is_redacted_at_any_depth_even_outside_secrets() {
        let data = Value::Map(vec![(
            "spec".into(),
            Value::Map(vec![(
                "env".into(),
                Value::Seq(vec![Value::Map(vec![(
                    "dbPassword".into(),
                    Value::String("hunter2".into()),
                )])]),
            )]),
        )]);

        let redacted = Redactor::new(Mode::Redacted).redact(&record(data));
        assert_eq!(
            redacted.data.get_path(&["spec", "env"]).and_then(Value::as_seq).unwrap()[0]
                .get_str_path(&["dbPassword"]),
            Some(REDACTED)
        );
    }

    #[test]
    fn last_applied_configuration_annotation_is_redacted() {
        let data = Value::Map(vec![(
            "metadata".into(),
            Value::Map(vec![(
                "annotations".into(),
                Value::Map(vec![(
                    "kubectl.kubernetes.io/last-applied-configuration".into(),
                    Value::String("{\"kind\":\"Pod\"}".into()),
                )]),
            )]),
        )]);

        let redacted = Redactor::new(Mode::Redacted).redact(&record(data));
        assert_eq!(
            redacted
                .data
                .get_str_path(&["metadata", "annotations", "kubectl.kubernetes.io/last-applied-configuration"]),
            Some(REDACTED)
        );
    }

    #[test]
    fn sensitive_annotation_key_is_redacted_alongside_last_applied() {
        let data = Value::Map(vec![(
            "metadata".into(),
            Value::Map(vec![(
                "annotations".into(),
                Value::Map(vec![
                    (
                        "kubectl.kubernetes.io/last-applied-configuration".into(),
                        Value::String("{\"kind\":\"Pod\"}".into()),
                    ),
                    ("example.com/api-token".into(), Value::String("abc123".into())),
                    ("example.com/owner".into(), Value::String("team-a".into())),
                ]),
            )]),
        )]);

        let redacted = Redactor::new(Mode::Redacted).redact(&record(data));
        assert_eq!(
            redacted.data.get_str_path(&["metadata", "annotations", "example.com/api-token"]),
            Some(REDACTED)
        );
        assert_eq!(
            redacted.data.get_str_path(&["metadata", "annotations", "example.com/owner"]),
            Some("team-a")
        );
    }
}
