//! The aggregate file system.
//!
//! [`VirtualFileSystem`] presents every mount as one namespace. Each call
//! follows the same path:
//!
//! 1. Resolve the target folder (for a file, its parent folder) against the
//!    mount table.
//! 2. If no mount backs it, the folder is pure-virtual: listings succeed with
//!    the mount roots branching from it (none, if the path leaves the trie),
//!    everything else fails with `InvalidPath`.
//! 3. Otherwise translate the virtual id to the mount's native id, call the
//!    backend, and translate every id in the result back.
//!
//! There is no mutable state. Concurrent callers share the table without
//! locking, and dropping a returned future cancels the backend call without
//! touching anything here.

use tracing::{trace, warn};

use mountspace_types::{
    BackendId, Capability, FileIdentifier, FileMetadata, FolderId, FolderIdentifier,
};

use crate::builder::FileSystemBuilder;
use crate::error::{VfsError, VfsResult};
use crate::ops::{ContentReader, ContentSource, StorageBackend};
use crate::path::{self, NamingRules};
use crate::table::{MountInfo, MountPoint, MountTable, Resolved};

/// One namespace over many storage backends.
#[derive(Debug)]
pub struct VirtualFileSystem {
    id: BackendId,
    separator: char,
    root: FolderId,
    table: MountTable,
    rules: NamingRules,
}

impl VirtualFileSystem {
    /// Start composing a file system with the given id.
    pub fn builder(id: BackendId) -> FileSystemBuilder {
        FileSystemBuilder::new(id)
    }

    /// Wrap a built table. Without an explicit root, the root is the common
    /// ancestor of all mount roots.
    pub(crate) fn new(
        id: BackendId,
        separator: char,
        explicit_root: Option<FolderId>,
        table: MountTable,
    ) -> VfsResult<Self> {
        let root = match explicit_root {
            Some(root) => FolderId::new(path::folder_form(root.as_str(), separator)),
            None if table.is_empty() => FolderId::new(separator.to_string()),
            None => {
                let roots: Vec<FolderId> = table.mounts().iter().map(|m| m.root.clone()).collect();
                path::common_ancestor(&roots, separator)?
            }
        };

        let per_mount: Vec<NamingRules> = table
            .writable_mounts()
            .map(|m| m.backend.naming_rules())
            .collect();
        let rules = NamingRules::union(&per_mount);

        Ok(Self {
            id,
            separator,
            root,
            table,
            rules,
        })
    }

    pub fn id(&self) -> &BackendId {
        &self.id
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// The aggregate root folder.
    pub fn get_root(&self) -> FolderIdentifier {
        FolderIdentifier::new(self.id.clone(), self.root.clone())
    }

    /// Every mount, in registration order.
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.table.mounts().iter().map(MountPoint::info).collect()
    }

    // ========================================================================
    // Naming rules (union across read-write mounts)
    // ========================================================================

    pub fn naming_rules(&self) -> &NamingRules {
        &self.rules
    }

    pub fn invalid_path_chars(&self) -> &[char] {
        &self.rules.invalid_path_chars
    }

    pub fn invalid_file_name_chars(&self) -> &[char] {
        &self.rules.invalid_file_name_chars
    }

    pub fn reserved_names(&self) -> &[String] {
        &self.rules.reserved_names
    }

    // ========================================================================
    // Resolution helpers
    // ========================================================================

    fn check_owner(&self, backend: &BackendId, what: &str) -> VfsResult<()> {
        if backend == &self.id {
            Ok(())
        } else {
            Err(VfsError::invalid_path(format!(
                "{what} is addressed to {backend}, not {}",
                self.id
            )))
        }
    }

    fn resolve(&self, folder: &FolderIdentifier, access: Capability) -> VfsResult<Resolved<'_>> {
        self.check_owner(&folder.backend, folder.folder.as_str())?;
        let resolved = self.table.resolve(folder.folder.as_str(), access);
        trace!(
            folder = %folder.folder,
            ?access,
            mount = resolved.mount.map(|m| m.root.as_str()),
            complete = resolved.complete,
            "resolved folder"
        );
        Ok(resolved)
    }

    /// Mount and native id for a folder that must be backed.
    fn backed_folder(
        &self,
        folder: &FolderIdentifier,
        access: Capability,
    ) -> VfsResult<(&MountPoint, FolderIdentifier)> {
        let mount = self
            .resolve(folder, access)?
            .mount
            .ok_or_else(|| unbacked(folder.folder.as_str(), access))?;
        let native = mount
            .mapper
            .map_folder_from_virtual(&folder.folder)
            .ok_or_else(|| VfsError::invalid_path(folder.folder.as_str()))?;
        trace!(folder = %folder.folder, native = %native.folder, "dispatch");
        Ok((mount, native))
    }

    /// Mount and native id for a file, resolved through its parent folder.
    fn backed_file(
        &self,
        file: &FileIdentifier,
        access: Capability,
    ) -> VfsResult<(&MountPoint, FileIdentifier)> {
        self.check_owner(&file.backend, file.file.as_str())?;
        let virtual_path = file.file.as_str();
        if virtual_path.is_empty() || virtual_path.ends_with(self.separator) {
            return Err(VfsError::invalid_path(format!("{virtual_path} is not a file")));
        }
        let parent = path::parent_folder(virtual_path, self.separator);
        let mount = self
            .table
            .resolve(parent, access)
            .mount
            .ok_or_else(|| unbacked(virtual_path, access))?;
        let native = mount
            .mapper
            .map_file_from_virtual(&file.file)
            .ok_or_else(|| VfsError::invalid_path(virtual_path))?;
        trace!(file = %file.file, mount = %mount.root, native = %native.file, "dispatch");
        Ok((mount, native))
    }

    fn to_virtual_folder(
        &self,
        mount: &MountPoint,
        native: &FolderIdentifier,
    ) -> VfsResult<FolderIdentifier> {
        match mount.mapper.map_folder_to_virtual(native) {
            Some(folder) => Ok(FolderIdentifier::new(self.id.clone(), folder)),
            None => {
                warn!(mount = %mount.root, native = %native, "backend returned an unmappable folder");
                Err(VfsError::invalid_path(native.to_string()))
            }
        }
    }

    fn to_virtual_file(&self, mount: &MountPoint, native: &FileIdentifier) -> VfsResult<FileIdentifier> {
        match mount.mapper.map_file_to_virtual(native) {
            Some(file) => Ok(FileIdentifier::new(self.id.clone(), file)),
            None => {
                warn!(mount = %mount.root, native = %native, "backend returned an unmappable file");
                Err(VfsError::invalid_path(native.to_string()))
            }
        }
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Folders directly inside `folder`.
    ///
    /// A pure-virtual folder lists the mount roots branching from it, or
    /// nothing when the path runs past the last registered segment. A backed
    /// folder lists what its backend reports plus any deeper mount roots
    /// branching from exactly this folder.
    pub async fn folder_identifiers(
        &self,
        folder: &FolderIdentifier,
    ) -> VfsResult<Vec<FolderIdentifier>> {
        let resolved = self.resolve(folder, Capability::ReadOnly)?;
        let synthetic = if resolved.complete {
            self.table.child_roots(resolved.node)
        } else {
            Vec::new()
        };

        let mut out = match resolved.mount {
            Some(mount) => {
                let native = mount
                    .mapper
                    .map_folder_from_virtual(&folder.folder)
                    .ok_or_else(|| VfsError::invalid_path(folder.folder.as_str()))?;
                match mount.backend.folder_identifiers(&native).await {
                    Ok(listed) => listed
                        .iter()
                        .map(|n| self.to_virtual_folder(mount, n))
                        .collect::<VfsResult<Vec<_>>>()?,
                    // An intermediate node under a mount may not exist in the backend.
                    Err(VfsError::NotFound(_)) if !synthetic.is_empty() => Vec::new(),
                    Err(e) => return Err(e),
                }
            }
            None => Vec::new(),
        };

        for root in synthetic {
            if !out.iter().any(|f| f.folder == root) {
                out.push(FolderIdentifier::new(self.id.clone(), root));
            }
        }
        Ok(out)
    }

    /// Folders directly inside the aggregate root.
    pub async fn root_folder_identifiers(&self) -> VfsResult<Vec<FolderIdentifier>> {
        self.folder_identifiers(&self.get_root()).await
    }

    /// Files directly inside `folder`. A pure-virtual folder has none.
    pub async fn file_identifiers(&self, folder: &FolderIdentifier) -> VfsResult<Vec<FileIdentifier>> {
        let resolved = self.resolve(folder, Capability::ReadOnly)?;
        let Some(mount) = resolved.mount else {
            return Ok(Vec::new());
        };

        let native = mount
            .mapper
            .map_folder_from_virtual(&folder.folder)
            .ok_or_else(|| VfsError::invalid_path(folder.folder.as_str()))?;
        match mount.backend.file_identifiers(&native).await {
            Ok(listed) => listed.iter().map(|n| self.to_virtual_file(mount, n)).collect(),
            Err(VfsError::NotFound(_))
                if resolved.complete && !self.table.trie().children(resolved.node).is_empty() =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Files directly inside the aggregate root.
    pub async fn root_file_identifiers(&self) -> VfsResult<Vec<FileIdentifier>> {
        self.file_identifiers(&self.get_root()).await
    }

    // ========================================================================
    // Identifier derivation
    // ========================================================================

    /// The folder `name` inside `parent`, without touching storage.
    ///
    /// Names inside a pure-virtual folder only resolve if they lead to a
    /// registered mount root.
    pub fn folder_identifier(
        &self,
        parent: &FolderIdentifier,
        name: &str,
    ) -> VfsResult<FolderIdentifier> {
        self.check_owner(&parent.backend, parent.folder.as_str())?;
        let candidate = path::combine(parent.folder.as_str(), name, self.separator)?;
        let resolved = self.table.resolve(candidate.as_str(), Capability::ReadOnly);
        match resolved.mount {
            Some(mount) => {
                mount
                    .mapper
                    .map_folder_from_virtual(&candidate)
                    .ok_or_else(|| VfsError::invalid_path(candidate.as_str()))?;
                Ok(FolderIdentifier::new(self.id.clone(), candidate))
            }
            None if resolved.complete => Ok(FolderIdentifier::new(self.id.clone(), candidate)),
            None => Err(VfsError::not_found(candidate.as_str())),
        }
    }

    /// The folder `name` directly inside the aggregate root.
    pub fn get_folder_identifier(&self, name: &str) -> VfsResult<FolderIdentifier> {
        self.folder_identifier(&self.get_root(), name)
    }

    /// The file `name` inside `folder`, validated by the backing store.
    pub fn file_identifier(&self, folder: &FolderIdentifier, name: &str) -> VfsResult<FileIdentifier> {
        let resolved = self.resolve(folder, Capability::ReadOnly)?;
        let mount = resolved
            .mount
            .ok_or_else(|| VfsError::not_found(folder.folder.as_str()))?;
        let native_folder = mount
            .mapper
            .map_folder_from_virtual(&folder.folder)
            .ok_or_else(|| VfsError::invalid_path(folder.folder.as_str()))?;
        let native = mount.backend.file_identifier(&native_folder, name)?;
        self.to_virtual_file(mount, &native)
    }

    /// The file `name` directly inside the aggregate root.
    pub fn get_file_identifier(&self, name: &str) -> VfsResult<FileIdentifier> {
        self.file_identifier(&self.get_root(), name)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Open a file for streaming reads. Content is never buffered here.
    pub async fn open_read(&self, file: &FileIdentifier) -> VfsResult<ContentReader> {
        let (mount, native) = self.backed_file(file, Capability::ReadOnly)?;
        mount.backend.open_read(&native).await
    }

    /// Read a whole file into memory.
    pub async fn read_all(&self, file: &FileIdentifier) -> VfsResult<Vec<u8>> {
        let (mount, native) = self.backed_file(file, Capability::ReadOnly)?;
        mount.backend.read_all(&native).await
    }

    pub async fn metadata(&self, file: &FileIdentifier) -> VfsResult<FileMetadata> {
        let (mount, native) = self.backed_file(file, Capability::ReadOnly)?;
        let meta = mount.backend.metadata(&native).await?;
        let virtual_file = self.to_virtual_file(mount, &meta.file)?;
        Ok(meta.with_file(virtual_file))
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create `name` inside `folder` with the bytes read from `content`.
    pub async fn create_file(
        &self,
        folder: &FolderIdentifier,
        name: &str,
        content: ContentSource<'_>,
    ) -> VfsResult<FileIdentifier> {
        let (mount, native) = self.backed_folder(folder, Capability::ReadWrite)?;
        let created = mount.backend.create_file(&native, name, content).await?;
        self.to_virtual_file(mount, &created)
    }

    /// Replace the contents of an existing file.
    pub async fn write_file(&self, file: &FileIdentifier, content: ContentSource<'_>) -> VfsResult<()> {
        let (mount, native) = self.backed_file(file, Capability::ReadWrite)?;
        mount.backend.write_file(&native, content).await
    }

    pub async fn delete_file(&self, file: &FileIdentifier) -> VfsResult<()> {
        let (mount, native) = self.backed_file(file, Capability::ReadWrite)?;
        mount.backend.delete_file(&native).await
    }

    /// Create the folder `name` inside `parent`.
    pub async fn create_folder(
        &self,
        parent: &FolderIdentifier,
        name: &str,
    ) -> VfsResult<FolderIdentifier> {
        let (mount, native) = self.backed_folder(parent, Capability::ReadWrite)?;
        let created = mount.backend.create_folder(&native, name).await?;
        self.to_virtual_folder(mount, &created)
    }

    /// Delete a folder and everything the backend holds below it.
    pub async fn delete_folder(&self, folder: &FolderIdentifier) -> VfsResult<()> {
        let (mount, native) = self.backed_folder(folder, Capability::ReadWrite)?;
        mount.backend.delete_folder(&native).await
    }
}

fn unbacked(path: &str, access: Capability) -> VfsError {
    VfsError::invalid_path(format!("{path} has no {access} mount"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Backend, DiskBackend, ResourceBackend};
    use crate::mapper::{NativeScheme, PathMapper};
    use tempfile::TempDir;

    fn id(s: &str) -> BackendId {
        BackendId::new(s).unwrap()
    }

    fn docs() -> Backend {
        Backend::Resource(
            ResourceBackend::manifest(
                id("docs"),
                [
                    ("index.md", b"# index".as_slice()),
                    ("guides/intro.md", b"intro".as_slice()),
                ],
            )
            .unwrap(),
        )
    }

    fn disk(dir: &TempDir) -> Backend {
        Backend::Disk(DiskBackend::new(id("disk"), dir.path()).unwrap())
    }

    fn folder(vfs: &VirtualFileSystem, path: &str) -> FolderIdentifier {
        FolderIdentifier::new(vfs.id().clone(), path)
    }

    fn file(vfs: &VirtualFileSystem, path: &str) -> FileIdentifier {
        FileIdentifier::new(vfs.id().clone(), path)
    }

    #[tokio::test]
    async fn test_read_through_resource_mount() {
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();

        let data = vfs.read_all(&file(&vfs, "/docs/guides/intro.md")).await.unwrap();
        assert_eq!(data, b"intro");

        let files = vfs.file_identifiers(&folder(&vfs, "/docs/")).await.unwrap();
        assert_eq!(files, vec![file(&vfs, "/docs/index.md")]);

        let folders = vfs.folder_identifiers(&folder(&vfs, "/Docs/")).await.unwrap();
        assert_eq!(folders, vec![folder(&vfs, "/docs/guides/")]);
    }

    #[tokio::test]
    async fn test_metadata_is_virtual() {
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();
        let meta = vfs.metadata(&file(&vfs, "/docs/index.md")).await.unwrap();
        assert_eq!(meta.file, file(&vfs, "/docs/index.md"));
        assert_eq!(meta.size, 7);
    }

    #[tokio::test]
    async fn test_foreign_identifier_rejected() {
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();
        let foreign = FolderIdentifier::new(id("docs"), "/docs/");
        assert!(matches!(
            vfs.folder_identifiers(&foreign).await,
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(
            vfs.read_all(&FileIdentifier::new(id("docs"), "index.md")).await,
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_backed_listing_merges_deeper_mounts() {
        let dir = TempDir::new().unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_write("/", disk(&dir))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();

        let root = vfs.get_root();
        vfs.create_folder(&root, "work").await.unwrap();

        let folders = vfs.root_folder_identifiers().await.unwrap();
        assert_eq!(
            folders,
            vec![folder(&vfs, "/work/"), folder(&vfs, "/docs/")]
        );
    }

    #[tokio::test]
    async fn test_intermediate_node_under_mount() {
        let dir = TempDir::new().unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_write("/", disk(&dir))
            .add_read_only("/a/docs/", docs())
            .build()
            .unwrap();

        let folders = vfs.folder_identifiers(&folder(&vfs, "/a/")).await.unwrap();
        assert_eq!(folders, vec![folder(&vfs, "/a/docs/")]);
        assert!(vfs.file_identifiers(&folder(&vfs, "/a/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_under_read_only_mount_fails() {
        let dir = TempDir::new().unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_write("/", disk(&dir))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();

        let result = vfs
            .create_file(&folder(&vfs, "/docs/"), "new.md", &mut &b"x"[..])
            .await;
        assert!(matches!(result, Err(VfsError::InvalidPath(_))));
        assert!(!dir.path().join("docs").exists());
    }

    #[test]
    fn test_identifier_derivation() {
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/root1/", docs())
            .build()
            .unwrap();

        let pure = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/a/root1/", docs())
            .root(FolderId::from("/"))
            .build()
            .unwrap();
        assert_eq!(
            pure.get_folder_identifier("a").unwrap(),
            folder(&pure, "/a/")
        );
        assert!(matches!(
            pure.get_folder_identifier("b"),
            Err(VfsError::NotFound(_))
        ));

        let guides = vfs
            .folder_identifier(&folder(&vfs, "/root1/"), "guides")
            .unwrap();
        assert_eq!(guides, folder(&vfs, "/root1/guides/"));

        let intro = vfs.file_identifier(&guides, "intro.md").unwrap();
        assert_eq!(intro, file(&vfs, "/root1/guides/intro.md"));

        assert!(matches!(
            vfs.get_folder_identifier("/abs"),
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_past_the_trie_is_empty() {
        let more = ResourceBackend::manifest(id("more"), [("b.md", b"b".as_slice())]).unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/root1/", docs())
            .add_read_only("/root2/", more)
            .build()
            .unwrap();

        for path in ["/nowhere/", "/nowhere/deeper/"] {
            let target = folder(&vfs, path);
            assert!(vfs.folder_identifiers(&target).await.unwrap().is_empty());
            assert!(vfs.file_identifiers(&target).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unmappable_backend_result_is_invalid_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_write("/data/", disk(&dir))
            .build()
            .unwrap();
        let mount = &vfs.table.mounts()[0];

        let stray_folder = FolderIdentifier::new(id("elsewhere"), "sub/");
        assert!(matches!(
            vfs.to_virtual_folder(mount, &stray_folder),
            Err(VfsError::InvalidPath(_))
        ));
        let stray_file = FileIdentifier::new(id("elsewhere"), "a.txt");
        assert!(matches!(
            vfs.to_virtual_file(mount, &stray_file),
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_mapper_for_another_backend_fails_listing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mut mount = MountPoint::new(
            FolderId::from("/data/"),
            Capability::ReadWrite,
            disk(&dir),
            '/',
        );
        mount.mapper = PathMapper::new(
            id("stale"),
            "/data/",
            '/',
            NativeScheme::Hierarchical {
                separator: std::path::MAIN_SEPARATOR,
            },
        );
        let table = MountTable::build('/', vec![mount]).unwrap();
        let vfs = VirtualFileSystem::new(id("vfs"), '/', None, table).unwrap();

        let data = folder(&vfs, "/data/");
        assert!(matches!(
            vfs.folder_identifiers(&data).await,
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(
            vfs.file_identifiers(&data).await,
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_naming_rules_union_over_read_write_only() {
        let dir = TempDir::new().unwrap();
        let vfs = VirtualFileSystem::builder(id("vfs"))
            .add_read_write("/data/", disk(&dir))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();
        assert!(vfs.reserved_names().iter().any(|n| n == "NUL"));
        assert!(vfs.invalid_file_name_chars().contains(&':'));

        let ro_only = VirtualFileSystem::builder(id("vfs"))
            .add_read_only("/docs/", docs())
            .build()
            .unwrap();
        assert!(ro_only.naming_rules().reserved_names.is_empty());
        assert!(ro_only.invalid_path_chars().is_empty());
    }
}
