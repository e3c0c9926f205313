//! End-to-end behaviour of the aggregate file system over real backends.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use mountspace_types::{BackendId, FileIdentifier, FolderIdentifier};
use mountspace_vfs::{
    DiskBackend, FileSystemBuilder, ResourceBackend, VfsError, VirtualFileSystem,
};

fn id(s: &str) -> BackendId {
    BackendId::new(s).unwrap()
}

fn disk(name: &str, dir: &TempDir) -> DiskBackend {
    DiskBackend::new(id(name), dir.path()).unwrap()
}

fn folder(vfs: &VirtualFileSystem, path: &str) -> FolderIdentifier {
    FolderIdentifier::new(vfs.id().clone(), path)
}

fn file(vfs: &VirtualFileSystem, path: &str) -> FileIdentifier {
    FileIdentifier::new(vfs.id().clone(), path)
}

fn guide_bundle() -> ResourceBackend {
    ResourceBackend::manifest(
        id("guides"),
        [
            ("index.md", b"# Guides".as_slice()),
            ("setup/install.md", b"run the installer".as_slice()),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn two_empty_mounts_list_as_synthetic_folders() {
    let d1 = TempDir::new().unwrap();
    let d2 = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/root1/", disk("d1", &d1))
        .add_read_write("/root2/", disk("d2", &d2))
        .build()
        .unwrap();

    assert_eq!(vfs.get_root().folder.as_str(), "/");

    let folders = vfs.root_folder_identifiers().await.unwrap();
    let paths: Vec<&str> = folders.iter().map(|f| f.folder.as_str()).collect();
    assert_eq!(paths, vec!["/root1/", "/root2/"]);
    assert!(folders.iter().all(|f| f.backend == *vfs.id()));

    assert!(vfs.root_file_identifiers().await.unwrap().is_empty());
}

#[tokio::test]
async fn nested_folders_get_exact_virtual_ids() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/", disk("disk", &dir))
        .build()
        .unwrap();

    let child1 = vfs.create_folder(&vfs.get_root(), "child1").await.unwrap();
    assert_eq!(child1.folder.as_str(), "/child1/");

    let child2 = vfs.create_folder(&child1, "child2").await.unwrap();
    assert_eq!(child2.folder.as_str(), "/child1/child2/");

    // The store only ever saw mount-relative names.
    assert!(dir.path().join("child1").join("child2").is_dir());
}

#[tokio::test]
async fn create_file_in_deleted_folder_fails() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/", disk("disk", &dir))
        .build()
        .unwrap();

    let sub = vfs.create_folder(&vfs.get_root(), "subfolder").await.unwrap();
    assert_eq!(vfs.root_folder_identifiers().await.unwrap().len(), 1);

    vfs.delete_folder(&sub).await.unwrap();
    assert!(vfs.root_folder_identifiers().await.unwrap().is_empty());

    let result = vfs.create_file(&sub, "test.txt", &mut &b"contents"[..]).await;
    assert!(matches!(
        result,
        Err(VfsError::NotFound(_)) | Err(VfsError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn single_empty_mount_at_root_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/", disk("disk", &dir))
        .build()
        .unwrap();

    assert!(vfs.root_folder_identifiers().await.unwrap().is_empty());
    assert!(vfs.root_file_identifiers().await.unwrap().is_empty());
}

#[tokio::test]
async fn no_mounts_lists_nothing() {
    let vfs = FileSystemBuilder::new(id("vfs")).build().unwrap();
    assert_eq!(vfs.get_root().folder.as_str(), "/");
    assert!(vfs.root_folder_identifiers().await.unwrap().is_empty());
    assert!(vfs.root_file_identifiers().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_round_trip_through_disk_mount() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/data/", disk("disk", &dir))
        .root("/")
        .build()
        .unwrap();

    let data = vfs.get_folder_identifier("data").unwrap();
    let reports = vfs.create_folder(&data, "reports").await.unwrap();
    let created = vfs
        .create_file(&reports, "q1.csv", &mut &b"a,b\n1,2\n"[..])
        .await
        .unwrap();
    assert_eq!(created.file.as_str(), "/data/reports/q1.csv");
    assert!(dir.path().join("reports").join("q1.csv").is_file());

    let mut reader = vfs.open_read(&created).await.unwrap();
    let mut text = String::new();
    reader.read_to_string(&mut text).await.unwrap();
    assert_eq!(text, "a,b\n1,2\n");

    vfs.write_file(&created, &mut &b"x"[..]).await.unwrap();
    let meta = vfs.metadata(&created).await.unwrap();
    assert_eq!(meta.size, 1);
    assert_eq!(meta.file, created);

    let listed = vfs.file_identifiers(&reports).await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    vfs.delete_file(&created).await.unwrap();
    assert!(matches!(
        vfs.read_all(&created).await,
        Err(VfsError::NotFound(_))
    ));
}

#[tokio::test]
async fn segment_comparison_ignores_case() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/root1/", disk("disk", &dir))
        .build()
        .unwrap();

    let written = vfs
        .create_file(&folder(&vfs, "/ROOT1/"), "Notes.txt", &mut &b"n"[..])
        .await
        .unwrap();
    assert_eq!(written, file(&vfs, "/root1/notes.txt"));

    let read = vfs.read_all(&file(&vfs, "/Root1/Notes.txt")).await.unwrap();
    assert_eq!(read, b"n");
}

#[tokio::test]
async fn resource_and_disk_side_by_side() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/work/", disk("disk", &dir))
        .add_read_only("/docs/guides/", guide_bundle())
        .build()
        .unwrap();

    assert_eq!(vfs.get_root().folder.as_str(), "/");

    // "/docs/" exists only to connect the bundle's root.
    let top = vfs.root_folder_identifiers().await.unwrap();
    assert_eq!(top, vec![folder(&vfs, "/work/"), folder(&vfs, "/docs/")]);
    let docs = vfs.folder_identifiers(&folder(&vfs, "/docs/")).await.unwrap();
    assert_eq!(docs, vec![folder(&vfs, "/docs/guides/")]);

    let setup = vfs
        .folder_identifiers(&folder(&vfs, "/docs/guides/"))
        .await
        .unwrap();
    assert_eq!(setup, vec![folder(&vfs, "/docs/guides/setup/")]);

    let install = vfs
        .read_all(&file(&vfs, "/docs/guides/setup/install.md"))
        .await
        .unwrap();
    assert_eq!(install, b"run the installer");
}

#[tokio::test]
async fn pure_virtual_and_read_only_targets_refuse_writes() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/a/work/", disk("disk", &dir))
        .add_read_only("/a/docs/", guide_bundle())
        .root("/")
        .build()
        .unwrap();

    let pure = folder(&vfs, "/a/");
    assert!(matches!(
        vfs.create_folder(&pure, "new").await,
        Err(VfsError::InvalidPath(_))
    ));
    assert!(matches!(
        vfs.create_file(&pure, "f.txt", &mut &b""[..]).await,
        Err(VfsError::InvalidPath(_))
    ));
    assert!(matches!(
        vfs.delete_folder(&pure).await,
        Err(VfsError::InvalidPath(_))
    ));
    assert!(matches!(
        vfs.read_all(&file(&vfs, "/a/f.txt")).await,
        Err(VfsError::InvalidPath(_))
    ));

    let docs = folder(&vfs, "/a/docs/");
    assert!(matches!(
        vfs.create_folder(&docs, "new").await,
        Err(VfsError::InvalidPath(_))
    ));
    assert!(matches!(
        vfs.delete_file(&file(&vfs, "/a/docs/index.md")).await,
        Err(VfsError::InvalidPath(_))
    ));

    // Pure-virtual folders still list their mount roots.
    let listed = vfs.folder_identifiers(&pure).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(vfs.file_identifiers(&pure).await.unwrap().is_empty());

    // Paths past the registered segments list nothing, and accept no writes.
    let stray = folder(&vfs, "/b/");
    assert!(vfs.folder_identifiers(&stray).await.unwrap().is_empty());
    assert!(vfs.file_identifiers(&stray).await.unwrap().is_empty());
    assert!(matches!(
        vfs.create_folder(&stray, "new").await,
        Err(VfsError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn sibling_mounts_stay_isolated() {
    let d1 = TempDir::new().unwrap();
    let d12 = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/root1/", disk("d1", &d1))
        .add_read_write("/root12/", disk("d12", &d12))
        .build()
        .unwrap();

    vfs.create_file(&folder(&vfs, "/root12/"), "only12.txt", &mut &b"12"[..])
        .await
        .unwrap();

    assert!(d12.path().join("only12.txt").is_file());
    assert!(!d1.path().join("only12.txt").exists());
    assert!(vfs.file_identifiers(&folder(&vfs, "/root1/")).await.unwrap().is_empty());
}

#[tokio::test]
async fn naming_rules_are_enforced_by_the_backend() {
    let dir = TempDir::new().unwrap();
    let vfs = FileSystemBuilder::new(id("vfs"))
        .add_read_write("/", disk("disk", &dir))
        .build()
        .unwrap();

    assert!(vfs.reserved_names().iter().any(|n| n == "CON"));
    for bad in ["con", "LPT1.txt", "a|b"] {
        assert!(matches!(
            vfs.create_folder(&vfs.get_root(), bad).await,
            Err(VfsError::InvalidPath(_))
        ));
    }
}

#[tokio::test]
async fn concurrent_readers_share_one_table() {
    let dir = TempDir::new().unwrap();
    let vfs = Arc::new(
        FileSystemBuilder::new(id("vfs"))
            .add_read_write("/work/", disk("disk", &dir))
            .add_read_only("/docs/", guide_bundle())
            .build()
            .unwrap(),
    );
    vfs.create_file(&folder(&vfs, "/work/"), "shared.txt", &mut &b"shared"[..])
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let vfs = Arc::clone(&vfs);
        handles.push(tokio::spawn(async move {
            let path = if i % 2 == 0 {
                "/work/shared.txt"
            } else {
                "/docs/index.md"
            };
            vfs.read_all(&FileIdentifier::new(vfs.id().clone(), path))
                .await
                .unwrap()
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let data = handle.await.unwrap();
        let expected: &[u8] = if i % 2 == 0 { b"shared" } else { b"# Guides" };
        assert_eq!(data, expected);
    }
}

#[test]
fn mounts_report_their_configuration() {
    let dir = TempDir::new().unwrap();
    let vfs = VirtualFileSystem::builder(id("vfs"))
        .add_read_write("work", disk("disk", &dir))
        .add_read_only("docs", guide_bundle())
        .build()
        .unwrap();

    let mounts = vfs.mounts();
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].root.as_str(), "/work/");
    assert_eq!(mounts[0].kind, "disk");
    assert_eq!(mounts[1].root.as_str(), "/docs/");
    assert_eq!(mounts[1].backend.as_str(), "guides");
}
