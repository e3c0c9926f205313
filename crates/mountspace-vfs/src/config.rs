//! RON mount manifests.
//!
//! A manifest names the file system, its separator and optional root, and
//! lists the mounts:
//!
//! ```ron
//! (
//!     id: "workspace",
//!     separator: '/',
//!     root: None,
//!     mounts: [
//!         (at: "/data/", access: ReadWrite, backend: Disk(path: "./data")),
//!         (at: "/docs/", access: ReadOnly,  backend: Bundle(name: "about")),
//!     ],
//! )
//! ```
//!
//! Disk paths are relative to the manifest's directory when loaded with
//! [`MountManifest::load`]. Bundles are embedded by the host program and
//! looked up by name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mountspace_types::{BackendId, Capability};

use crate::backends::{Backend, DiskBackend, ResourceBackend};
use crate::builder::FileSystemBuilder;
use crate::error::VfsError;
use crate::path::DEFAULT_SEPARATOR;

/// Error type for manifest loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("unknown bundle: {0}")]
    UnknownBundle(String),
    #[error(transparent)]
    Vfs(#[from] VfsError),
}

/// Where a mount's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendSpec {
    /// A directory on local disk.
    Disk {
        path: PathBuf,
        #[serde(default)]
        id: Option<String>,
    },
    /// A resource bundle compiled into the host program.
    Bundle { name: String },
}

/// One mount line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    pub at: String,
    pub access: Capability,
    pub backend: BackendSpec,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

/// A whole manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountManifest {
    pub id: String,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub mounts: Vec<MountEntry>,
}

impl FromStr for MountManifest {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(ron::from_str(text)?)
    }
}

impl MountManifest {
    /// Read and parse a manifest file. Relative disk paths are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: MountManifest = text.parse()?;
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    /// Make relative disk paths relative to `base`.
    pub fn rebase(&mut self, base: &Path) {
        for mount in &mut self.mounts {
            if let BackendSpec::Disk { path, .. } = &mut mount.backend {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    /// Turn the manifest into a builder, opening disk backends and looking
    /// up bundles by name.
    pub fn into_builder(
        self,
        bundles: &HashMap<String, ResourceBackend>,
    ) -> Result<FileSystemBuilder, ConfigError> {
        let mut builder =
            FileSystemBuilder::new(BackendId::new(&self.id).map_err(VfsError::from)?)
                .separator(self.separator);
        if let Some(root) = self.root {
            builder = builder.root(root);
        }

        for mount in self.mounts {
            let backend: Backend = match mount.backend {
                BackendSpec::Disk { path, id } => {
                    let id = match id {
                        Some(id) => BackendId::new(id).map_err(VfsError::from)?,
                        None => BackendId::generate(),
                    };
                    if mount.access.allows_write() {
                        DiskBackend::new(id, &path)?.into()
                    } else {
                        DiskBackend::read_only(id, &path)?.into()
                    }
                }
                BackendSpec::Bundle { name } => bundles
                    .get(&name)
                    .cloned()
                    .ok_or(ConfigError::UnknownBundle(name))?
                    .into(),
            };
            builder = match mount.access {
                Capability::ReadWrite => builder.add_read_write(mount.at, backend),
                Capability::ReadOnly => builder.add_read_only(mount.at, backend),
            };
        }
        Ok(builder)
    }
}
