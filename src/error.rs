//! Sum-typed errors for the core. Every fallible core operation returns
//! `Result<T, Error>` so per-file skips, operation failures, and startup
//! failures stay distinguishable at the call site.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown resource kind {token:?}")]
    UnknownKind { token: String },

    #[error("no archive root found under {0:?}")]
    NoArchive(Vec<PathBuf>),

    #[error("path {candidate:?} escapes archive root {root:?}")]
    PathEscape { root: PathBuf, candidate: PathBuf },

    #[error("not found: {0:?}")]
    NotFound(PathBuf),

    #[error("{path:?} exceeds the {limit}-byte size ceiling")]
    TooLarge { path: PathBuf, limit: u64 },

    #[error("{0:?} contains an unsafe YAML tag")]
    UnsafeYaml(PathBuf),

    #[error("failed to parse {path:?} at line {line}: {message}")]
    ParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("ambiguous container for pod {pod:?}: specify one of {available:?}")]
    AmbiguousContainer { pod: String, available: Vec<String> },

    #[error("config conflict: {0}")]
    ConfigConflict(String),

    #[error("config corrupt: {path:?}: {message}")]
    ConfigCorrupt { path: PathBuf, message: String },

    #[error("invalid label selector {selector:?}: {reason}")]
    BadSelector { selector: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
