//! The Path Resolver: maps a query to a deterministic, deduplicated list of
//! candidate YAML files without ever walking the whole archive tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::discovery::ArchiveRoot;
use crate::error::Error;
use crate::query::{Query, Scope};
use crate::validator;

/// Candidate files for a query, plus any per-file skips encountered while
/// building the list; the caller logs these and continues.
pub struct Resolved {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<Error>,
}

/// Resolves `query` against `roots`. `stop_at_first_root_match` implements
/// the describe/get short-circuit: once a root yields a match for a named
/// query, later roots are not consulted. `list` always passes
/// `false` so cross-archive dedup sees every candidate.
pub fn resolve(roots: &[ArchiveRoot], query: &Query, stop_at_first_root_match: bool) -> Resolved {
    let mut files = Vec::new();
    let mut warnings = Vec::new();

    for root in roots {
        let before = files.len();

        if query.is_cluster_scoped() {
            resolve_cluster(root, query, &mut files, &mut warnings);
        } else {
            for namespace in namespaces_for_scope(root, &query.scope) {
                resolve_namespaced(root, query, &namespace, &mut files, &mut warnings);
            }
        }

        if stop_at_first_root_match && query.name.is_some() && files.len() > before {
            break;
        }
    }

    Resolved { files, warnings }
}

fn resolve_cluster(root: &ArchiveRoot, query: &Query, files: &mut Vec<PathBuf>, warnings: &mut Vec<Error>) {
    let base = PathBuf::from("cluster-scoped-resources").join(&query.api_group).join(&query.plural);

    match &query.name {
        Some(name) => {
            push_if_exists(root, &base.join(format!("{name}.yaml")), files, warnings);
        }
        None => {
            push_if_exists(
                root,
                &PathBuf::from("cluster-scoped-resources")
                    .join(&query.api_group)
                    .join(format!("{}.yaml", query.plural)),
                files,
                warnings,
            );
            push_listed_dir(root, &base, files, warnings);
        }
    }
}

fn resolve_namespaced(
    root: &ArchiveRoot,
    query: &Query,
    namespace: &str,
    files: &mut Vec<PathBuf>,
    warnings: &mut Vec<Error>,
) {
    let pattern_a_dir = PathBuf::from("namespaces").join(namespace).join(&query.api_group).join(&query.plural);
    let pattern_b_dir = PathBuf::from("namespaces")
        .join("all")
        .join("namespaces")
        .join(namespace)
        .join(&query.api_group)
        .join(&query.plural);

    match &query.name {
        Some(name) => {
            // Pattern A outranks Pattern B; within a root, stop once found.
            let a = pattern_a_dir.join(format!("{name}.yaml"));
            if push_if_exists(root, &a, files, warnings) {
                return;
            }
            let b = pattern_b_dir.join(format!("{name}.yaml"));
            push_if_exists(root, &b, files, warnings);
        }
        None => {
            // List files before individual files; Pattern A before Pattern B.
            let a_list = PathBuf::from("namespaces")
                .join(namespace)
                .join(&query.api_group)
                .join(format!("{}.yaml", query.plural));
            push_if_exists(root, &a_list, files, warnings);
            push_listed_dir(root, &pattern_a_dir, files, warnings);
            push_listed_dir(root, &pattern_b_dir, files, warnings);
        }
    }
}

/// Validates a single candidate relative path and appends it if present.
/// Returns whether a file was appended. `NotFound` is silent (it's just an
/// absent candidate); `PathEscape` becomes a warning and the file is skipped.
fn push_if_exists(root: &ArchiveRoot, relative: &Path, files: &mut Vec<PathBuf>, warnings: &mut Vec<Error>) -> bool {
    match validator::validate(&root.path, relative) {
        Ok(path) => {
            files.push(path);
            true
        }
        Err(Error::NotFound(_)) => false,
        Err(other) => {
            warnings.push(other);
            false
        }
    }
}

/// Lists a plural directory's immediate `*.yaml` children in sorted order,
/// validating each one. Directories that don't exist are silently skipped;
/// this is the only `readdir` the resolver performs, scoped to a single
/// known directory rather than the whole tree.
fn push_listed_dir(root: &ArchiveRoot, relative_dir: &Path, files: &mut Vec<PathBuf>, warnings: &mut Vec<Error>) {
    let absolute_dir = root.path.join(relative_dir);
    let Ok(entries) = fs::read_dir(&absolute_dir) else {
        return;
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "yaml"))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();

    for name in names {
        push_if_exists(root, &relative_dir.join(name), files, warnings);
    }
}

/// Enumerates the namespaces a query's scope covers: sorted union of both
/// layouts' namespace directories, or the single namespace for a scoped
/// query.
pub fn namespaces_for_scope(root: &ArchiveRoot, scope: &Scope) -> Vec<String> {
    match scope {
        Scope::SingleNamespace(ns) => vec![ns.clone()],
        Scope::Cluster => Vec::new(),
        Scope::AllNamespaces => {
            let mut names: Vec<String> = Vec::new();
            names.extend(subdir_names(&root.path.join("namespaces")).into_iter().filter(|n| n != "all"));
            names.extend(subdir_names(&root.path.join("namespaces").join("all").join("namespaces")));
            names.sort();
            names.dedup();
            names
        }
    }
}

fn subdir_names(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn root(dir: &Path) -> ArchiveRoot {
        ArchiveRoot { path: fs::canonicalize(dir).unwrap() }
    }

    #[test]
    fn pattern_a_and_b_both_surface_for_all_namespaces_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("namespaces/ns1/core/pods")).unwrap();
        fs::write(dir.path().join("namespaces/ns1/core/pods/p.yaml"), "kind: Pod").unwrap();
        fs::create_dir_all(dir.path().join("namespaces/all/namespaces/ns1/core/pods")).unwrap();
        fs::write(
            dir.path().join("namespaces/all/namespaces/ns1/core/pods/p.yaml"),
            "kind: Pod",
        )
        .unwrap();

        let roots = vec![root(dir.path())];
        let query = Query::new("core", "pods", Scope::AllNamespaces);
        let resolved = resolve(&roots, &query, false);

        assert_eq!(resolved.files.len(), 2);
        assert!(resolved.files[0].starts_with(dir.path().join("namespaces/ns1")));
        assert!(resolved.files[1].to_string_lossy().contains("namespaces/all"));
    }

    #[test]
    fn named_query_prefers_pattern_a_and_skips_pattern_b() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("namespaces/ns1/core/pods")).unwrap();
        fs::write(dir.path().join("namespaces/ns1/core/pods/p.yaml"), "kind: Pod\nmarker: a").unwrap();
        fs::create_dir_all(dir.path().join("namespaces/all/namespaces/ns1/core/pods")).unwrap();
        fs::write(
            dir.path().join("namespaces/all/namespaces/ns1/core/pods/p.yaml"),
            "kind: Pod\nmarker: b",
        )
        .unwrap();

        let roots = vec![root(dir.path())];
        let query = Query::new("core", "pods", Scope::SingleNamespace("ns1".into())).with_name("p");
        let resolved = resolve(&roots, &query, true);

        assert_eq!(resolved.files.len(), 1);
        assert!(resolved.files[0].starts_with(dir.path().join("namespaces/ns1")));
    }

    #[test]
    fn cluster_scoped_list_includes_list_file_then_individual_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cluster-scoped-resources/core/nodes")).unwrap();
        fs::write(dir.path().join("cluster-scoped-resources/core/nodes/n1.yaml"), "kind: Node").unwrap();

        let roots = vec![root(dir.path())];
        let query = Query::new("core", "nodes", Scope::Cluster);
        let resolved = resolve(&roots, &query, false);

        assert_eq!(resolved.files.len(), 1);
        assert!(resolved.files[0].ends_with("n1.yaml"));
    }

    #[test]
    fn all_namespaces_enumeration_unions_both_layouts_sorted_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("namespaces/b")).unwrap();
        fs::create_dir_all(dir.path().join("namespaces/a")).unwrap();
        fs::create_dir_all(dir.path().join("namespaces/all/namespaces/c")).unwrap();
        fs::create_dir_all(dir.path().join("namespaces/all/namespaces/a")).unwrap();

        let namespaces = namespaces_for_scope(&root(dir.path()), &Scope::AllNamespaces);
        assert_eq!(namespaces, vec!["a", "b", "c"]);
    }
}
