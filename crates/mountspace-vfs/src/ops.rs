//! Storage backend contract.
//!
//! This trait is what the dispatcher needs from a store. Every identifier
//! that crosses it is *native*: it carries the backend's own id and a path in
//! the backend's own addressing scheme. The dispatcher's path mappers handle
//! the conversion to and from the virtual namespace.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use mountspace_types::{BackendId, Capability, FileIdentifier, FileMetadata, FolderIdentifier};

use crate::error::{VfsError, VfsResult};
use crate::path::NamingRules;

/// A content stream handed back by [`StorageBackend::open_read`].
pub type ContentReader = Pin<Box<dyn AsyncRead + Send>>;

/// Content supplied by a caller for create and write operations.
pub type ContentSource<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Core storage operations trait.
///
/// Mutating methods default to [`VfsError::ReadOnly`], so a read-only store
/// only implements the reading half.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // ========================================================================
    // Identity
    // ========================================================================

    /// The id stamped on every native identifier this store produces.
    fn id(&self) -> &BackendId;

    /// The store's root folder, in native form.
    fn root(&self) -> FolderIdentifier;

    /// Separator of the native addressing scheme.
    fn native_separator(&self) -> char;

    /// Whether this store accepts mutations.
    fn capability(&self) -> Capability;

    /// Names and characters this store refuses.
    fn naming_rules(&self) -> NamingRules;

    // ========================================================================
    // Reading
    // ========================================================================

    /// Open a file for streaming reads.
    async fn open_read(&self, file: &FileIdentifier) -> VfsResult<ContentReader>;

    /// Report size and timestamps for a file.
    async fn metadata(&self, file: &FileIdentifier) -> VfsResult<FileMetadata>;

    /// Files directly inside `folder`.
    async fn file_identifiers(&self, folder: &FolderIdentifier) -> VfsResult<Vec<FileIdentifier>>;

    /// Folders directly inside `folder`.
    async fn folder_identifiers(
        &self,
        folder: &FolderIdentifier,
    ) -> VfsResult<Vec<FolderIdentifier>>;

    /// Derive the identifier of `name` inside `folder` without touching storage.
    fn file_identifier(&self, folder: &FolderIdentifier, name: &str) -> VfsResult<FileIdentifier>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create a new file named `name` inside `folder` and fill it from `content`.
    async fn create_file(
        &self,
        _folder: &FolderIdentifier,
        _name: &str,
        _content: ContentSource<'_>,
    ) -> VfsResult<FileIdentifier> {
        Err(VfsError::read_only(self.id().to_string()))
    }

    /// Replace the contents of an existing file.
    async fn write_file(&self, _file: &FileIdentifier, _content: ContentSource<'_>) -> VfsResult<()> {
        Err(VfsError::read_only(self.id().to_string()))
    }

    /// Remove a file.
    async fn delete_file(&self, _file: &FileIdentifier) -> VfsResult<()> {
        Err(VfsError::read_only(self.id().to_string()))
    }

    /// Create a folder named `name` inside `parent`.
    async fn create_folder(
        &self,
        _parent: &FolderIdentifier,
        _name: &str,
    ) -> VfsResult<FolderIdentifier> {
        Err(VfsError::read_only(self.id().to_string()))
    }

    /// Remove a folder and everything below it.
    async fn delete_folder(&self, _folder: &FolderIdentifier) -> VfsResult<()> {
        Err(VfsError::read_only(self.id().to_string()))
    }

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Read entire file contents.
    async fn read_all(&self, file: &FileIdentifier) -> VfsResult<Vec<u8>> {
        let mut reader = self.open_read(file).await?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| VfsError::from_io(file.file.as_str(), e))?;
        Ok(buf)
    }
}

/// Fail with `InvalidPath` unless `id` was issued by `owner`.
pub(crate) fn ensure_owned(owner: &BackendId, id: &BackendId, path: &str) -> VfsResult<()> {
    if owner == id {
        Ok(())
    } else {
        Err(VfsError::invalid_path(format!(
            "{path} belongs to {id}, not {owner}"
        )))
    }
}
