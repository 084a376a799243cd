//! Archive root discovery.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveRoot {
    pub path: PathBuf,
}

impl ArchiveRoot {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn is_top_level_root(dir: &Path) -> bool {
    dir.join("namespaces").is_dir() || dir.join("cluster-scoped-resources").is_dir()
}

fn is_nested_root(dir: &Path) -> bool {
    dir.join("namespaces").is_dir()
}

/// Enumerates archive roots under the given input directories, deduplicated
/// by canonical path with first-seen-wins precedence, ordered by
/// user-argument order then lexicographic child name. Recursion is bounded
/// at depth two by `WalkDir::max_depth`
/// (input -> child -> grandchild); a third level is never visited.
pub fn discover(inputs: &[PathBuf]) -> Result<Vec<ArchiveRoot>> {
    let mut roots = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        let walker = WalkDir::new(input).min_depth(1).max_depth(2).sort_by_file_name();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let is_root = match entry.depth() {
                1 => is_top_level_root(entry.path()),
                2 => is_nested_root(entry.path()),
                _ => false,
            };
            if is_root {
                push_root(&mut roots, &mut seen, entry.path())?;
            }
        }
    }

    if roots.is_empty() {
        return Err(Error::NoArchive(inputs.to_vec()));
    }

    Ok(roots)
}

fn push_root(roots: &mut Vec<ArchiveRoot>, seen: &mut HashSet<PathBuf>, dir: &Path) -> Result<()> {
    let canonical = fs::canonicalize(dir)?;
    if seen.insert(canonical.clone()) {
        roots.push(ArchiveRoot { path: canonical });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_root(base: &Path, name: &str) {
        fs::create_dir_all(base.join(name).join("namespaces")).unwrap();
    }

    #[test]
    fn discovers_direct_children_in_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        make_root(dir.path(), "b-archive");
        make_root(dir.path(), "a-archive");

        let roots = discover(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = roots.iter().map(ArchiveRoot::name).collect();
        assert_eq!(names, vec!["a-archive", "b-archive"]);
    }

    #[test]
    fn discovers_nested_roots_up_to_depth_two() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("outer/cluster-scoped-resources")).unwrap();
        fs::create_dir_all(dir.path().join("outer/storage-archive/namespaces")).unwrap();
        // A third level must never be discovered.
        fs::create_dir_all(dir.path().join("outer/storage-archive/too-deep/namespaces")).unwrap();

        let roots = discover(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = roots.iter().map(ArchiveRoot::name).collect();
        assert_eq!(names, vec!["outer", "storage-archive"]);
    }

    #[test]
    fn no_archive_found_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("not-an-archive")).unwrap();

        let err = discover(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, Error::NoArchive(_)));
    }

    #[test]
    fn duplicate_roots_across_inputs_keep_first_seen() {
        let dir = tempfile::tempdir().unwrap();
        make_root(dir.path(), "archive");

        let roots = discover(&[dir.path().to_path_buf(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(roots.len(), 1);
    }
}
