//! The Type Registry: a persisted, additively-maintained mapping from
//! resource tokens to `(api_group, plural)` plus a cluster-scoped set.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const KINDS_FILE: &str = "kinds.yaml";
const CLUSTER_SCOPED_FILE: &str = "cluster-scoped.yaml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KindEntry {
    pub api_group: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Overrides [`TypeRegistry::kind_of`]'s heuristic for this plural, so
    /// operators can correct an irregular-plural display mismatch without
    /// touching code.
    #[serde(default)]
    pub display_kind: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    kinds: BTreeMap<String, KindEntry>,
    cluster_scoped: BTreeSet<String>,
}

/// Irregular plural -> PascalCase kind overrides. Everything not listed here
/// falls back to stripping a trailing `s`/`es` and capitalizing.
const IRREGULAR_KINDS: &[(&str, &str)] = &[
    ("policies", "Policy"),
    ("ingresses", "Ingress"),
    ("endpoints", "Endpoints"),
    ("statuses", "Status"),
    ("classes", "Class"),
    ("proxies", "Proxy"),
    ("entries", "Entry"),
    ("gateways", "Gateway"),
];

impl TypeRegistry {
    pub fn resolve(&self, token: &str) -> Result<(String, String)> {
        let token = token.to_lowercase();

        if let Some(entry) = self.kinds.get(&token) {
            return Ok((entry.api_group.clone(), token));
        }

        for (plural, entry) in &self.kinds {
            if entry.aliases.iter().any(|a| a.eq_ignore_ascii_case(&token)) {
                return Ok((entry.api_group.clone(), plural.clone()));
            }
        }

        Err(Error::UnknownKind { token })
    }

    pub fn is_cluster_scoped(&self, plural: &str) -> bool {
        self.cluster_scoped.contains(plural)
    }

    pub fn kind_of(&self, plural: &str) -> String {
        if let Some(display) = self.kinds.get(plural).and_then(|e| e.display_kind.clone()) {
            return display;
        }

        if let Some((_, kind)) = IRREGULAR_KINDS.iter().find(|(p, _)| *p == plural) {
            return (*kind).to_string();
        }

        let stripped = plural
            .strip_suffix("es")
            .or_else(|| plural.strip_suffix('s'))
            .unwrap_or(plural);
        capitalize(stripped)
    }

    pub fn insert_if_absent(&mut self, plural: &str, api_group: &str) -> bool {
        if self.kinds.contains_key(plural) {
            return false;
        }
        self.kinds.insert(
            plural.to_string(),
            KindEntry {
                api_group: api_group.to_string(),
                aliases: Vec::new(),
                display_kind: None,
            },
        );
        true
    }

    pub fn conflicting_group(&self, plural: &str, api_group: &str) -> Option<&str> {
        self.kinds
            .get(plural)
            .filter(|e| e.api_group != api_group)
            .map(|e| e.api_group.as_str())
    }

    pub fn add_cluster_scoped(&mut self, plural: &str) -> bool {
        self.cluster_scoped.insert(plural.to_string())
    }

    pub fn kinds(&self) -> &BTreeMap<String, KindEntry> {
        &self.kinds
    }

    pub fn cluster_scoped(&self) -> &BTreeSet<String> {
        &self.cluster_scoped
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let kinds = load_kinds(&dir.join(KINDS_FILE))?;
        let cluster_scoped = load_cluster_scoped(&dir.join(CLUSTER_SCOPED_FILE))?;

        for plural in &cluster_scoped {
            if !kinds.contains_key(plural) {
                return Err(Error::ConfigConflict(format!(
                    "cluster-scoped entry {plural:?} has no matching kind mapping"
                )));
            }
        }

        let mut aliases_seen: BTreeMap<String, String> = BTreeMap::new();
        for (plural, entry) in &kinds {
            for alias in &entry.aliases {
                if let Some(owner) = aliases_seen.insert(alias.clone(), plural.clone()) {
                    return Err(Error::ConfigConflict(format!(
                        "alias {alias:?} claimed by both {owner:?} and {plural:?}"
                    )));
                }
            }
        }

        Ok(Self { kinds, cluster_scoped })
    }

    /// Write-then-rename to both registry files. The rename is the
    /// atomicity boundary: readers never observe a
    /// partially written file.
    pub fn store(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_atomic(&dir.join(KINDS_FILE), &render_kinds(&self.kinds))?;
        write_atomic(&dir.join(CLUSTER_SCOPED_FILE), &render_cluster_scoped(&self.cluster_scoped))?;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn load_kinds(path: &Path) -> Result<BTreeMap<String, KindEntry>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_saphyr::from_str(&text).map_err(|e| Error::ConfigCorrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_cluster_scoped(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    let items: Vec<String> = serde_saphyr::from_str(&text).map_err(|e| Error::ConfigCorrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(items.into_iter().collect())
}

/// Registry files are rendered by hand rather than through a generic
/// serializer: the shape is fixed and small, and a hand-rolled emitter
/// guarantees byte-stable, sorted-key output so diffs stay clean, without
/// depending on formatting details of a third-party YAML writer.
fn render_kinds(kinds: &BTreeMap<String, KindEntry>) -> String {
    if kinds.is_empty() {
        return "{}\n".to_string();
    }
    let mut out = String::new();
    for (plural, entry) in kinds {
        out.push_str(&format!("{plural}:\n"));
        out.push_str(&format!("  api_group: {}\n", quote(&entry.api_group)));
        if entry.aliases.is_empty() {
            out.push_str("  aliases: []\n");
        } else {
            out.push_str("  aliases:\n");
            for alias in &entry.aliases {
                out.push_str(&format!("    - {}\n", quote(alias)));
            }
        }
        if let Some(display) = &entry.display_kind {
            out.push_str(&format!("  display_kind: {}\n", quote(display)));
        }
    }
    out
}

fn render_cluster_scoped(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        return "[]\n".to_string();
    }
    let mut out = String::new();
    for plural in set {
        out.push_str(&format!("- {}\n", quote(plural)));
    }
    out
}

fn quote(s: &str) -> String {
    format!("{s:?}")
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    let tmp_path = tmp.path;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o644))?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

struct TempFile {
    path: PathBuf,
    file: fs::File,
}

impl std::io::Write for TempFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn tempfile_in(dir: &Path) -> Result<TempFile> {
    let path = dir.join(format!(".must-oc-registry-{}.tmp", std::process::id()));
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;
    Ok(TempFile { path, file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_bootstrap_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TypeRegistry::load(dir.path()).unwrap();
        assert!(registry.kinds().is_empty());
        assert!(registry.cluster_scoped().is_empty());
    }

    #[test]
    fn resolve_finds_plural_and_alias() {
        let mut registry = TypeRegistry::default();
        registry.insert_if_absent("pods", "core");
        registry.kinds.get_mut("pods").unwrap().aliases = vec!["po".into()];

        assert_eq!(registry.resolve("pods").unwrap(), ("core".into(), "pods".into()));
        assert_eq!(registry.resolve("po").unwrap(), ("core".into(), "pods".into()));
        assert!(matches!(registry.resolve("bogus"), Err(Error::UnknownKind { .. })));
    }

    #[test]
    fn kind_of_uses_irregular_table_then_heuristic() {
        let registry = TypeRegistry::default();
        assert_eq!(registry.kind_of("policies"), "Policy");
        assert_eq!(registry.kind_of("ingresses"), "Ingress");
        assert_eq!(registry.kind_of("deployments"), "Deployment");
        assert_eq!(registry.kind_of("pods"), "Pod");
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TypeRegistry::default();
        registry.insert_if_absent("pods", "core");
        registry.add_cluster_scoped_for_test();
        registry.store(dir.path()).unwrap();

        let reloaded = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(reloaded.kinds().len(), 1);
    }

    impl TypeRegistry {
        fn add_cluster_scoped_for_test(&mut self) {
            self.insert_if_absent("namespaces", "core");
            self.add_cluster_scoped("namespaces");
        }
    }

    #[test]
    fn cluster_scoped_entry_without_kind_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(KINDS_FILE), "{}\n").unwrap();
        fs::write(dir.path().join(CLUSTER_SCOPED_FILE), "- \"nodes\"\n").unwrap();

        let err = TypeRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigConflict(_)));
    }
}
