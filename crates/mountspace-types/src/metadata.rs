//! File metadata reported by backends.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::FileIdentifier;

/// What a backend knows about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file: FileIdentifier,
    /// Final path segment.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the store tracks one.
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Same metadata, re-addressed to another identifier.
    pub fn with_file(self, file: FileIdentifier) -> Self {
        Self { file, ..self }
    }
}
