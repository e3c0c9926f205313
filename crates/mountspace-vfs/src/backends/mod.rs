//! Storage backends.
//!
//! Each concrete store implements [`StorageBackend`]. The dispatcher only
//! ever holds the closed [`Backend`] variant, which forwards every call to
//! the store it wraps.

mod disk;
mod resource;

pub use disk::DiskBackend;
pub use resource::{RESOURCE_SEPARATOR, ResourceBackend, ResourceIndex, ResourceLayout};

use async_trait::async_trait;

use mountspace_types::{BackendId, Capability, FileIdentifier, FileMetadata, FolderIdentifier};

use crate::error::VfsResult;
use crate::ops::{ContentReader, ContentSource, StorageBackend};
use crate::path::NamingRules;

/// Every store a mount can be backed by.
#[derive(Debug, Clone)]
pub enum Backend {
    Disk(DiskBackend),
    Resource(ResourceBackend),
}

impl From<DiskBackend> for Backend {
    fn from(b: DiskBackend) -> Self {
        Backend::Disk(b)
    }
}

impl From<ResourceBackend> for Backend {
    fn from(b: ResourceBackend) -> Self {
        Backend::Resource(b)
    }
}

impl Backend {
    /// Short name of the store kind, for listings and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Disk(_) => "disk",
            Backend::Resource(_) => "resource",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $b:ident => $call:expr) => {
        match $self {
            Backend::Disk($b) => $call,
            Backend::Resource($b) => $call,
        }
    };
}

#[async_trait]
impl StorageBackend for Backend {
    fn id(&self) -> &BackendId {
        delegate!(self, b => b.id())
    }

    fn root(&self) -> FolderIdentifier {
        delegate!(self, b => b.root())
    }

    fn native_separator(&self) -> char {
        delegate!(self, b => b.native_separator())
    }

    fn capability(&self) -> Capability {
        delegate!(self, b => b.capability())
    }

    fn naming_rules(&self) -> NamingRules {
        delegate!(self, b => b.naming_rules())
    }

    async fn open_read(&self, file: &FileIdentifier) -> VfsResult<ContentReader> {
        delegate!(self, b => b.open_read(file).await)
    }

    async fn metadata(&self, file: &FileIdentifier) -> VfsResult<FileMetadata> {
        delegate!(self, b => b.metadata(file).await)
    }

    async fn file_identifiers(&self, folder: &FolderIdentifier) -> VfsResult<Vec<FileIdentifier>> {
        delegate!(self, b => b.file_identifiers(folder).await)
    }

    async fn folder_identifiers(
        &self,
        folder: &FolderIdentifier,
    ) -> VfsResult<Vec<FolderIdentifier>> {
        delegate!(self, b => b.folder_identifiers(folder).await)
    }

    fn file_identifier(&self, folder: &FolderIdentifier, name: &str) -> VfsResult<FileIdentifier> {
        delegate!(self, b => b.file_identifier(folder, name))
    }

    async fn create_file(
        &self,
        folder: &FolderIdentifier,
        name: &str,
        content: ContentSource<'_>,
    ) -> VfsResult<FileIdentifier> {
        delegate!(self, b => b.create_file(folder, name, content).await)
    }

    async fn write_file(&self, file: &FileIdentifier, content: ContentSource<'_>) -> VfsResult<()> {
        delegate!(self, b => b.write_file(file, content).await)
    }

    async fn delete_file(&self, file: &FileIdentifier) -> VfsResult<()> {
        delegate!(self, b => b.delete_file(file).await)
    }

    async fn create_folder(
        &self,
        parent: &FolderIdentifier,
        name: &str,
    ) -> VfsResult<FolderIdentifier> {
        delegate!(self, b => b.create_folder(parent, name).await)
    }

    async fn delete_folder(&self, folder: &FolderIdentifier) -> VfsResult<()> {
        delegate!(self, b => b.delete_folder(folder).await)
    }
}
