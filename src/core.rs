//! Wires the Type Registry, Path Resolver, Safe YAML Reader, Redactor, Log
//! Streamer, and Walker into the four front-end operations.

use std::io::Write;
use std::path::PathBuf;

use crate::discovery::{self, ArchiveRoot};
use crate::error::{Error, Result};
use crate::query::{LogHandle, LogVariant, Query};
use crate::record::ResourceRecord;
use crate::redact::{Mode, Redactor};
use crate::registry::TypeRegistry;
use crate::resolver;
use crate::selector::Selector;
use crate::walker::{self, WalkSummary};
use crate::yaml::SafeYamlReader;

pub struct Core {
    registry: TypeRegistry,
    roots: Vec<ArchiveRoot>,
    config_dir: PathBuf,
    reader: SafeYamlReader,
}

impl Core {
    pub fn open(inputs: &[PathBuf], config_dir: PathBuf) -> Result<Self> {
        let registry = TypeRegistry::load(&config_dir)?;
        let roots = discovery::discover(inputs)?;
        Ok(Self { registry, roots, config_dir, reader: SafeYamlReader::default() })
    }

    /// Returns every record matching `query` and `selector`, deduplicated on
    /// identity with Pattern-A-over-B and earlier-root-over-later precedence
    /// (Testable Properties 1-3), in redacted or raw form per `mode`.
    pub fn list(&self, query: &Query, selector: &Selector, mode: Mode) -> Vec<ResourceRecord> {
        let resolved = resolver::resolve(&self.roots, query, false);
        for warning in &resolved.warnings {
            tracing::warn!(error = %warning, "skipping file");
        }

        let redactor = Redactor::new(mode);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for path in &resolved.files {
            match self.reader.read(path) {
                Ok(records) => {
                    for mut record in records {
                        record.backfill_kind(&self.registry.kind_of(&query.plural));
                        if !seen.insert(record.identity()) {
                            continue;
                        }
                        if !selector.matches(&record.labels()) {
                            continue;
                        }
                        out.push(redactor.redact(&record));
                    }
                }
                Err(Error::TooLarge { path, limit }) => {
                    tracing::warn!(?path, limit, "skipping oversized file");
                }
                Err(Error::UnsafeYaml(path)) => {
                    tracing::warn!(?path, "skipping file with unsafe YAML tag");
                }
                Err(Error::ParseError { path, line, message }) => {
                    tracing::warn!(?path, line, message = %message, "skipping unparseable file");
                }
                Err(other) => {
                    tracing::warn!(error = %other, "skipping file");
                }
            }
        }

        out
    }

    /// Returns the single record named by `query.name`, stopping at the
    /// first root that resolves it (the describe/get short-circuit).
    pub fn get(&self, query: &Query, mode: Mode) -> Result<ResourceRecord> {
        let name = query.name.clone().ok_or_else(|| Error::NotFound(PathBuf::from(&query.plural)))?;
        let resolved = resolver::resolve(&self.roots, query, true);

        for path in &resolved.files {
            let records = match self.reader.read(path) {
                Ok(records) => records,
                Err(Error::UnsafeYaml(path)) => {
                    tracing::warn!(?path, "skipping file with unsafe YAML tag");
                    continue;
                }
                Err(Error::ParseError { path, line, message }) => {
                    tracing::warn!(?path, line, message = %message, "skipping unparseable file");
                    continue;
                }
                Err(other) => return Err(other),
            };
            if let Some(mut record) = records.into_iter().find(|r| r.name() == name) {
                record.backfill_kind(&self.registry.kind_of(&query.plural));
                return Ok(Redactor::new(mode).redact(&record));
            }
        }

        Err(Error::NotFound(PathBuf::from(format!("{}/{name}", query.plural))))
    }

    /// Resolves `query` to a single record's containers for disambiguation,
    /// without redaction (containers are structural, not sensitive data).
    fn pod_containers(&self, query: &Query) -> Result<Vec<String>> {
        let record = self.get(query, Mode::Raw)?;
        let containers = record
            .data
            .get_path(&["spec", "containers"])
            .and_then(crate::value::Value::as_seq)
            .unwrap_or(&[]);
        Ok(containers.iter().filter_map(|c| c.get_str_path(&["name"]).map(str::to_string)).collect())
    }

    /// Streams a pod's log to `sink`, resolving container ambiguity against
    /// the pod's own record first.
    pub fn stream_log(&self, handle: &LogHandle, sink: &mut dyn Write) -> Result<()> {
        let pod_query = Query::new("core", "pods", crate::query::Scope::SingleNamespace(handle.namespace.clone()))
            .with_name(handle.pod_name.as_str());

        let container = match &handle.container_name {
            Some(name) => name.clone(),
            None => {
                let containers = self.pod_containers(&pod_query)?;
                match containers.len() {
                    0 => return Err(Error::NotFound(PathBuf::from(&handle.pod_name))),
                    1 => containers[0].clone(),
                    _ => return Err(Error::AmbiguousContainer { pod: handle.pod_name.clone(), available: containers }),
                }
            }
        };

        let relative = PathBuf::from("namespaces")
            .join(&handle.namespace)
            .join("pods")
            .join(&handle.pod_name)
            .join(&container)
            .join(&container)
            .join("logs")
            .join(LogVariant::file_name(handle.variant));

        let validated = crate::validator::validate(&handle.archive_root, &relative)?;
        crate::logstream::LogStreamer::default().stream(&validated, sink)?;
        Ok(())
    }

    /// Walks the given input directories and additively merges discovered
    /// kinds into the registry, persisting the result.
    pub fn update_types(&self, inputs: &[PathBuf]) -> Result<WalkSummary> {
        let roots = discovery::discover(inputs)?;
        walker::update_types(&roots, &self.config_dir)
    }

    pub fn resolve_kind(&self, token: &str) -> Result<(String, String)> {
        self.registry.resolve(token)
    }

    pub fn is_cluster_scoped(&self, plural: &str) -> bool {
        self.registry.is_cluster_scoped(plural)
    }

    pub fn roots(&self) -> &[ArchiveRoot] {
        &self.roots
    }
}
