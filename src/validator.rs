//! Path confinement. Every file the core opens is resolved through
//! [`validate`] first; no other component is allowed to call
//! `fs::File::open` directly on an archive path.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves `root.join(relative)` against symlinks component-by-component and
/// proves the result stays under `root`. `root` is assumed already canonical
/// (archive roots are canonicalized at discovery time). Returns the
/// canonical path on success.
///
/// When the leaf component does not exist, resolution still proceeds through
/// every existing ancestor (to catch an escape via a symlinked parent
/// directory) before failing with [`Error::NotFound`], so callers can tell
/// "this would have escaped" apart from "this simply isn't there".
pub fn validate(root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut current = root.to_path_buf();

    for component in relative.components() {
        let segment = match component {
            Component::Normal(segment) => segment,
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathEscape {
                    root: root.to_path_buf(),
                    candidate: root.join(relative),
                });
            }
        };

        let next = current.join(segment);
        if !next.exists() {
            // Best-effort path for the NotFound error: no further component
            // can introduce a symlink because nothing after this point
            // exists to resolve.
            let remainder: PathBuf = relative
                .components()
                .skip_while(|c| *c != component)
                .collect();
            return Err(Error::NotFound(current.join(remainder)));
        }

        let resolved = fs::canonicalize(&next)?;
        if !resolved.starts_with(root) {
            return Err(Error::PathEscape {
                root: root.to_path_buf(),
                candidate: resolved,
            });
        }
        current = resolved;
    }

    Ok(current)
}

/// Like [`validate`] but only reports existence, swallowing `NotFound` into
/// `false` — convenient for resolver short-circuiting where "does this file
/// exist at all" is the only question.
pub fn exists(root: &Path, relative: &Path) -> bool {
    matches!(validate(root, relative), Ok(_))
}
