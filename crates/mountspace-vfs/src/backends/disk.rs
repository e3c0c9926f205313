//! Local disk backend.
//!
//! Serves a real directory tree. Native ids are paths relative to the root,
//! joined with the OS separator; folder ids end with the separator and the
//! root folder is the empty string. Ids that try to leave the root (`..`,
//! absolute components) are rejected before anything touches the disk, and
//! the deepest existing ancestor of every target is canonicalized so a
//! symlink inside the tree cannot lead outside it.

use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use mountspace_types::{BackendId, Capability, FileIdentifier, FileMetadata, FolderIdentifier};

use crate::error::{VfsError, VfsResult};
use crate::ops::{ContentReader, ContentSource, StorageBackend, ensure_owned};
use crate::path::{self, NamingRules};

/// Device names no file or folder may take, with or without an extension.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters refused anywhere in a file name.
const INVALID_NAME_CHARS: &[char] = &['\0', '/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Local disk backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/srv/data`, the native file id `reports/q1.csv` reads
/// `/srv/data/reports/q1.csv`.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    id: BackendId,
    root: PathBuf,
    read_only: bool,
}

impl DiskBackend {
    /// Serve the directory at `root` read-write.
    ///
    /// The root is canonicalized with `dunce` at construction time and must
    /// already exist.
    pub fn new(id: BackendId, root: impl AsRef<Path>) -> VfsResult<Self> {
        let root = root.as_ref();
        let canonical =
            dunce::canonicalize(root).map_err(|e| VfsError::from_io(root.display().to_string(), e))?;
        if !canonical.is_dir() {
            return Err(VfsError::invalid_argument(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        Ok(Self {
            id,
            root: canonical,
            read_only: false,
        })
    }

    /// Serve the directory at `root` without accepting mutations.
    pub fn read_only(id: BackendId, root: impl AsRef<Path>) -> VfsResult<Self> {
        let mut backend = Self::new(id, root)?;
        backend.read_only = true;
        Ok(backend)
    }

    /// Resolve a native id to an absolute path under the root.
    ///
    /// The returned path is the lexical join, so operations act on a link
    /// itself rather than its target; the confinement check follows links.
    fn resolve(&self, native: &str) -> VfsResult<PathBuf> {
        let mut full = self.root.clone();
        for component in Path::new(native).components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(VfsError::invalid_path(format!(
                        "{native} escapes the mount root"
                    )));
                }
            }
        }
        self.confine(&full, native)?;
        Ok(full)
    }

    /// Fail with `InvalidPath` if `full`, with symlinks followed, lands
    /// outside the root. Components that do not exist yet are skipped until
    /// an existing ancestor is found.
    fn confine(&self, full: &Path, native: &str) -> VfsResult<()> {
        let mut existing = full;
        let canonical = loop {
            match dunce::canonicalize(existing) {
                Ok(canonical) => break canonical,
                Err(e) if e.kind() == io::ErrorKind::NotFound => match existing.parent() {
                    Some(parent) => existing = parent,
                    None => return Err(VfsError::from_io(native, e)),
                },
                Err(e) => return Err(VfsError::from_io(native, e)),
            }
        };
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(VfsError::invalid_path(format!(
                "{native} resolves to {}, outside the mount root",
                canonical.display()
            )))
        }
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::read_only(self.id.to_string()))
        } else {
            Ok(())
        }
    }

    fn folder_path(&self, folder: &FolderIdentifier) -> VfsResult<PathBuf> {
        ensure_owned(&self.id, &folder.backend, folder.folder.as_str())?;
        self.resolve(folder.folder.as_str())
    }

    fn file_path(&self, file: &FileIdentifier) -> VfsResult<PathBuf> {
        ensure_owned(&self.id, &file.backend, file.file.as_str())?;
        if file.file.is_empty() || file.file.as_str().ends_with(MAIN_SEPARATOR) {
            return Err(VfsError::invalid_path(format!("{} is not a file", file.file)));
        }
        self.resolve(file.file.as_str())
    }

    /// Read a directory, keeping entries whose type matches `want_dirs`.
    async fn list(&self, folder: &FolderIdentifier, want_dirs: bool) -> VfsResult<Vec<String>> {
        let dir_path = self.folder_path(folder)?;
        let err = |e| VfsError::from_io(folder.folder.as_str(), e);

        let mut names = Vec::new();
        let mut dir = fs::read_dir(&dir_path).await.map_err(err)?;
        while let Some(entry) = dir.next_entry().await.map_err(err)? {
            // Follows symlinks, so a link to a directory lists as a folder.
            // A dangling link lists as a file.
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "entry target unreadable, using link metadata");
                    fs::symlink_metadata(entry.path()).await.map_err(err)?
                }
            };
            if meta.is_dir() == want_dirs {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn copy_into(
        &self,
        mut file: fs::File,
        content: ContentSource<'_>,
        native: &str,
    ) -> VfsResult<()> {
        let err = |e| VfsError::from_io(native, e);
        tokio::io::copy(content, &mut file).await.map_err(err)?;
        file.flush().await.map_err(err)
    }
}

#[async_trait]
impl StorageBackend for DiskBackend {
    fn id(&self) -> &BackendId {
        &self.id
    }

    fn root(&self) -> FolderIdentifier {
        FolderIdentifier::new(self.id.clone(), "")
    }

    fn native_separator(&self) -> char {
        MAIN_SEPARATOR
    }

    fn capability(&self) -> Capability {
        if self.read_only {
            Capability::ReadOnly
        } else {
            Capability::ReadWrite
        }
    }

    fn naming_rules(&self) -> NamingRules {
        NamingRules {
            invalid_path_chars: vec!['\0', '<', '>', '|', '"'],
            invalid_file_name_chars: INVALID_NAME_CHARS.to_vec(),
            reserved_names: RESERVED_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    async fn open_read(&self, file: &FileIdentifier) -> VfsResult<ContentReader> {
        let full = self.file_path(file)?;
        let native = file.file.as_str();
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| VfsError::from_io(native, e))?;
        if !meta.is_file() {
            return Err(VfsError::not_found(native));
        }
        let handle = fs::File::open(&full)
            .await
            .map_err(|e| VfsError::from_io(native, e))?;
        Ok(Box::pin(handle))
    }

    async fn metadata(&self, file: &FileIdentifier) -> VfsResult<FileMetadata> {
        let full = self.file_path(file)?;
        let native = file.file.as_str();
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| VfsError::from_io(native, e))?;
        if !meta.is_file() {
            return Err(VfsError::not_found(native));
        }
        Ok(FileMetadata {
            file: file.clone(),
            name: path::file_name(native, MAIN_SEPARATOR).to_string(),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    async fn file_identifiers(&self, folder: &FolderIdentifier) -> VfsResult<Vec<FileIdentifier>> {
        self.list(folder, false)
            .await?
            .into_iter()
            .map(|name| {
                let file = path::combine_file(folder.folder.as_str(), &name, MAIN_SEPARATOR)?;
                Ok(FileIdentifier::new(self.id.clone(), file))
            })
            .collect()
    }

    async fn folder_identifiers(
        &self,
        folder: &FolderIdentifier,
    ) -> VfsResult<Vec<FolderIdentifier>> {
        self.list(folder, true)
            .await?
            .into_iter()
            .map(|name| {
                let child = path::combine(folder.folder.as_str(), &name, MAIN_SEPARATOR)?;
                Ok(FolderIdentifier::new(self.id.clone(), child))
            })
            .collect()
    }

    fn file_identifier(&self, folder: &FolderIdentifier, name: &str) -> VfsResult<FileIdentifier> {
        ensure_owned(&self.id, &folder.backend, folder.folder.as_str())?;
        self.naming_rules().check_name(name)?;
        let file = path::combine_file(folder.folder.as_str(), name, MAIN_SEPARATOR)?;
        Ok(FileIdentifier::new(self.id.clone(), file))
    }

    async fn create_file(
        &self,
        folder: &FolderIdentifier,
        name: &str,
        content: ContentSource<'_>,
    ) -> VfsResult<FileIdentifier> {
        self.check_writable()?;
        let file = self.file_identifier(folder, name)?;
        let full = self.file_path(&file)?;
        let native = file.file.as_str();

        let handle = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| VfsError::from_io(native, e))?;
        if let Err(e) = self.copy_into(handle, content, native).await {
            // Leave nothing behind so the name stays free for a retry.
            if let Err(cleanup) = fs::remove_file(&full).await {
                warn!(path = %full.display(), error = %cleanup, "failed to remove partial file");
            }
            return Err(e);
        }
        Ok(file)
    }

    async fn write_file(&self, file: &FileIdentifier, content: ContentSource<'_>) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.file_path(file)?;
        let native = file.file.as_str();

        let handle = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&full)
            .await
            .map_err(|e| VfsError::from_io(native, e))?;
        self.copy_into(handle, content, native).await
    }

    async fn delete_file(&self, file: &FileIdentifier) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.file_path(file)?;
        fs::remove_file(&full)
            .await
            .map_err(|e| VfsError::from_io(file.file.as_str(), e))
    }

    async fn create_folder(
        &self,
        parent: &FolderIdentifier,
        name: &str,
    ) -> VfsResult<FolderIdentifier> {
        self.check_writable()?;
        ensure_owned(&self.id, &parent.backend, parent.folder.as_str())?;
        self.naming_rules().check_name(name)?;
        let child = path::combine(parent.folder.as_str(), name, MAIN_SEPARATOR)?;
        let full = self.resolve(child.as_str())?;

        // Non-recursive: a missing parent surfaces as NotFound.
        fs::create_dir(&full)
            .await
            .map_err(|e| VfsError::from_io(child.as_str(), e))?;
        Ok(FolderIdentifier::new(self.id.clone(), child))
    }

    async fn delete_folder(&self, folder: &FolderIdentifier) -> VfsResult<()> {
        self.check_writable()?;
        if folder.folder.is_empty() {
            return Err(VfsError::invalid_path("the mount root cannot be deleted"));
        }
        let full = self.folder_path(folder)?;
        fs::remove_dir_all(&full)
            .await
            .map_err(|e| VfsError::from_io(folder.folder.as_str(), e))
    }
}
