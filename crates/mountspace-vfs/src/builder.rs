//! Composing a [`VirtualFileSystem`].

use tracing::debug;

use mountspace_types::{BackendId, Capability, FolderId};

use crate::backends::Backend;
use crate::error::{VfsError, VfsResult};
use crate::fs::VirtualFileSystem;
use crate::ops::StorageBackend;
use crate::path::{self, DEFAULT_SEPARATOR};
use crate::table::{MountPoint, MountTable};

/// Collects mounts, then validates and freezes them in [`build`](Self::build).
///
/// ```no_run
/// # use mountspace_types::BackendId;
/// # use mountspace_vfs::{DiskBackend, FileSystemBuilder};
/// # fn main() -> mountspace_vfs::VfsResult<()> {
/// let data = DiskBackend::new(BackendId::new("data")?, "/srv/data")?;
/// let vfs = FileSystemBuilder::new(BackendId::new("workspace")?)
///     .add_read_write("/data/", data)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileSystemBuilder {
    id: BackendId,
    separator: char,
    root: Option<FolderId>,
    pending: Vec<(FolderId, Capability, Backend)>,
}

impl FileSystemBuilder {
    pub fn new(id: BackendId) -> Self {
        Self {
            id,
            separator: DEFAULT_SEPARATOR,
            root: None,
            pending: Vec::new(),
        }
    }

    /// Virtual separator (default `/`).
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Explicit aggregate root. Without one, the root is the common ancestor
    /// of all mount roots.
    pub fn root(mut self, root: impl Into<FolderId>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Mount `backend` for reading and writing at `root`.
    pub fn add_read_write(mut self, root: impl Into<FolderId>, backend: impl Into<Backend>) -> Self {
        self.pending
            .push((root.into(), Capability::ReadWrite, backend.into()));
        self
    }

    /// Mount `backend` for reading only at `root`.
    pub fn add_read_only(mut self, root: impl Into<FolderId>, backend: impl Into<Backend>) -> Self {
        self.pending
            .push((root.into(), Capability::ReadOnly, backend.into()));
        self
    }

    /// Validate every mount and produce the file system.
    ///
    /// Fails with `ReadOnly` if a read-only store was offered for writing and
    /// with `DuplicateMount` if two mounts share a root.
    pub fn build(self) -> VfsResult<VirtualFileSystem> {
        let separator = self.separator;
        let mut mounts = Vec::with_capacity(self.pending.len());

        for (root, capability, backend) in self.pending {
            if !backend.capability().satisfies(capability) {
                return Err(VfsError::read_only(format!(
                    "{} cannot be mounted read-write at {root}",
                    backend.id()
                )));
            }
            let root = FolderId::new(path::folder_form(root.as_str(), separator));
            debug!(
                root = %root,
                backend = %backend.id(),
                kind = backend.kind(),
                %capability,
                "registering mount"
            );
            mounts.push(MountPoint::new(root, capability, backend, separator));
        }

        let table = MountTable::build(separator, mounts)?;
        let vfs = VirtualFileSystem::new(self.id, separator, self.root, table)?;
        debug!(
            id = %vfs.id(),
            root = %vfs.get_root().folder,
            mounts = vfs.mounts().len(),
            "built virtual file system"
        );
        Ok(vfs)
    }
}
