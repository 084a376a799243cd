//! The Archive Walker/Updater: discovers `(group, plural)` pairs and
//! cluster-scoped kinds evidenced in an archive, then additively merges
//! them into the persisted [`TypeRegistry`].

use std::fs;
use std::path::Path;

use crate::discovery::ArchiveRoot;
use crate::error::Result;
use crate::registry::TypeRegistry;

#[derive(Clone, Debug, Default)]
pub struct WalkSummary {
    pub kinds_added: Vec<String>,
    pub cluster_scoped_added: Vec<String>,
}

impl WalkSummary {
    pub fn kinds_added_count(&self) -> usize {
        self.kinds_added.len()
    }

    pub fn cluster_scoped_added_count(&self) -> usize {
        self.cluster_scoped_added.len()
    }
}

/// Loads the registry at `config_dir`, walks `roots`, merges discoveries in,
/// and writes the registry back. This is the whole `update-types` operation.
pub fn update_types(roots: &[ArchiveRoot], config_dir: &Path) -> Result<WalkSummary> {
    let mut registry = TypeRegistry::load(config_dir)?;
    let summary = walk_and_merge(roots, &mut registry);
    registry.store(config_dir)?;
    Ok(summary)
}

fn walk_and_merge(roots: &[ArchiveRoot], registry: &mut TypeRegistry) -> WalkSummary {
    let mut summary = WalkSummary::default();

    for root in roots {
        for (group, plural) in pattern_a_pairs(&root.path) {
            merge_kind(registry, &plural, &group, &mut summary.kinds_added);
        }
        for (group, plural) in pattern_b_pairs(&root.path) {
            merge_kind(registry, &plural, &group, &mut summary.kinds_added);
        }
        for (group, plural) in group_plural_pairs(&root.path.join("cluster-scoped-resources")) {
            merge_kind(registry, &plural, &group, &mut summary.kinds_added);
            if registry.add_cluster_scoped(&plural) {
                summary.cluster_scoped_added.push(plural);
            }
        }
    }

    summary
}

fn merge_kind(registry: &mut TypeRegistry, plural: &str, group: &str, added: &mut Vec<String>) {
    if registry.insert_if_absent(plural, group) {
        added.push(plural.to_string());
    } else if let Some(existing) = registry.conflicting_group(plural, group) {
        tracing::warn!(
            plural,
            existing_group = existing,
            discovered_group = group,
            "registry conflict: keeping existing api_group"
        );
    }
}

fn pattern_a_pairs(root: &Path) -> Vec<(String, String)> {
    let ns_root = root.join("namespaces");
    subdir_names(&ns_root)
        .into_iter()
        .filter(|ns| ns != "all")
        .flat_map(|ns| group_plural_pairs(&ns_root.join(ns)))
        .collect()
}

fn pattern_b_pairs(root: &Path) -> Vec<(String, String)> {
    let ns_root = root.join("namespaces").join("all").join("namespaces");
    subdir_names(&ns_root)
        .into_iter()
        .flat_map(|ns| group_plural_pairs(&ns_root.join(ns)))
        .collect()
}

/// Evidences `(group, plural)` pairs under a directory of `<group>/<plural>`
/// children: a non-empty `<plural>/` directory, or a `<plural>.yaml` list
/// file sibling.
fn group_plural_pairs(group_root: &Path) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for group_entry in read_dir_entries(group_root) {
        if !group_entry.path().is_dir() {
            continue;
        }
        let Ok(group) = group_entry.file_name().into_string() else { continue };

        for child in read_dir_entries(&group_entry.path()) {
            let path = child.path();
            if path.is_dir() {
                if dir_non_empty(&path) {
                    if let Ok(plural) = child.file_name().into_string() {
                        pairs.push((group.clone(), plural));
                    }
                }
            } else if let Some(plural) = path.file_name().and_then(|n| n.to_str()).and_then(|n| n.strip_suffix(".yaml")) {
                pairs.push((group.clone(), plural.to_string()));
            }
        }
    }

    pairs
}

fn dir_non_empty(dir: &Path) -> bool {
    fs::read_dir(dir).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}

fn subdir_names(dir: &Path) -> Vec<String> {
    read_dir_entries(dir)
        .into_iter()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect()
}

fn read_dir_entries(dir: &Path) -> Vec<fs::DirEntry> {
    fs::read_dir(dir).into_iter().flatten().filter_map(|e| e.ok()).collect()
}
