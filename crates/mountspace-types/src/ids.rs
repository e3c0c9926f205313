//! Backend, folder and file identifiers.
//!
//! `BackendId` is compared ordinally: two stores are the same store only if
//! their ids match exactly. Folder and file paths compare case-insensitively,
//! so `/Docs/` and `/docs/` name the same folder.
//!
//! `FolderIdentifier::none()` and `FileIdentifier::none()` carry an empty
//! backend id. Every real identifier has a non-empty one, so the sentinels
//! never compare equal to a real identifier.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Compare two strings ignoring case, using Unicode lowercase folding.
///
/// Used for every segment and path comparison in the virtual namespace.
pub fn fold_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn fold_hash<H: Hasher>(s: &str, state: &mut H) {
    for c in s.chars().flat_map(char::to_lowercase) {
        c.hash(state);
    }
    // Terminator keeps ("ab", "c") and ("a", "bc") apart in composite hashes.
    0xffu8.hash(state);
}

/// Error constructing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("backend id must not be empty")]
    Empty,
}

// ── BackendId ───────────────────────────────────────────────────────────────

/// Opaque identity of one store in the namespace.
///
/// Cheap to clone; the string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(Arc<str>);

impl BackendId {
    /// Create a backend id from an explicit name.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdError> {
        let id = id.as_ref();
        if id.trim().is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(Arc::from(id)))
    }

    /// Mint a fresh, time-ordered id (UUIDv7) for an anonymous backend.
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::now_v7().as_simple().to_string()))
    }

    /// The sentinel id carried by `none()` identifiers.
    pub fn none() -> Self {
        Self(Arc::from(""))
    }

    /// Check if this is the sentinel id.
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackendId({})", self.0)
    }
}

impl TryFrom<&str> for BackendId {
    type Error = IdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

// ── FolderId / FileId ───────────────────────────────────────────────────────

/// A folder path. Virtual folder paths begin and end with the separator.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

/// A file path. Virtual file paths begin with the separator and never end
/// with it.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

macro_rules! impl_path_id {
    ($T:ident, $name:literal) => {
        impl $T {
            pub fn new(path: impl Into<String>) -> Self {
                Self(path.into())
            }

            /// The empty path carried by `none()` identifiers.
            pub fn none() -> Self {
                Self(String::new())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl PartialEq for $T {
            fn eq(&self, other: &Self) -> bool {
                fold_eq(&self.0, &other.0)
            }
        }

        impl Eq for $T {}

        impl PartialEq<str> for $T {
            fn eq(&self, other: &str) -> bool {
                fold_eq(&self.0, other)
            }
        }

        impl PartialEq<&str> for $T {
            fn eq(&self, other: &&str) -> bool {
                fold_eq(&self.0, other)
            }
        }

        impl Hash for $T {
            fn hash<H: Hasher>(&self, state: &mut H) {
                fold_hash(&self.0, state);
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", $name, self.0)
            }
        }
    };
}

impl_path_id!(FolderId, "FolderId");
impl_path_id!(FileId, "FileId");

// ── Identifiers ─────────────────────────────────────────────────────────────

/// A folder in a specific store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderIdentifier {
    pub backend: BackendId,
    pub folder: FolderId,
}

/// A file in a specific store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentifier {
    pub backend: BackendId,
    pub file: FileId,
}

impl FolderIdentifier {
    pub fn new(backend: BackendId, folder: impl Into<FolderId>) -> Self {
        Self {
            backend,
            folder: folder.into(),
        }
    }

    /// The "no folder" sentinel.
    pub fn none() -> Self {
        Self {
            backend: BackendId::none(),
            folder: FolderId::none(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.backend.is_none()
    }
}

impl FileIdentifier {
    pub fn new(backend: BackendId, file: impl Into<FileId>) -> Self {
        Self {
            backend,
            file: file.into(),
        }
    }

    /// The "no file" sentinel.
    pub fn none() -> Self {
        Self {
            backend: BackendId::none(),
            file: FileId::none(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.backend.is_none()
    }
}

impl fmt::Display for FolderIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.backend, self.folder)
    }
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.backend, self.file)
    }
}
