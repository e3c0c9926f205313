//! VFS error types.

use std::io;
use thiserror::Error;

use mountspace_types::IdError;

/// VFS error type.
///
/// The dispatcher never swallows a backend error: whatever a backend reports
/// is surfaced through one of these variants, and nothing is retried.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A virtual/native mapping failed, a name broke the backend's naming
    /// rules, or the target has no backing store.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The backend reports that the folder or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend reports a name collision on create.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Opening, reading or writing content failed.
    #[error("content unavailable: {path}: {source}")]
    ContentUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A mutation reached a store that cannot be written.
    #[error("read-only: {0}")]
    ReadOnly(String),

    /// Two mounts were registered at the same virtual root.
    #[error("duplicate mount point: {0}")]
    DuplicateMount(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier construction failed.
    #[error(transparent)]
    Id(#[from] IdError),
}

impl VfsError {
    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a ReadOnly error.
    pub fn read_only(what: impl Into<String>) -> Self {
        Self::ReadOnly(what.into())
    }

    /// Create a DuplicateMount error.
    pub fn duplicate_mount(root: impl Into<String>) -> Self {
        Self::DuplicateMount(root.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Classify an I/O failure against `path`.
    ///
    /// Missing targets and name collisions keep their own variants; anything
    /// else means the content could not be reached.
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::ContentUnavailable { path, source: err },
        }
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::ContentUnavailable { source, .. } => source,
            VfsError::ReadOnly(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::DuplicateMount(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Id(e) => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
