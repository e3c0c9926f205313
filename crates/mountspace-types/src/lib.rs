//! Shared identifier types for mountspace.
//!
//! This crate is the leaf of the workspace: it knows nothing about mounts,
//! backends or dispatch. It only defines how files and folders are named.
//!
//! # Identifier Overview
//!
//! ```text
//! FolderIdentifier ── BackendId  (which store: the aggregate, or one backend)
//!                 └── FolderId   ("/docs/guides/" or a native form like "guides.")
//!
//! FileIdentifier ──── BackendId
//!                 └── FileId     ("/docs/guides/intro.md")
//! ```
//!
//! The same pair shape is used on both sides of a mount boundary. A *virtual*
//! identifier carries the aggregate file system's id and a path in the unified
//! namespace; a *native* identifier carries one backend's id and a path in
//! that backend's own addressing scheme.
//!
//! |----------------------|---------------------------------------------|
//! | Type                 | Purpose                                     |
//! |----------------------|---------------------------------------------|
//! | [`BackendId`]        | Opaque, case-sensitive store identity       |
//! | [`FolderId`]         | Folder path, case-insensitive equality      |
//! | [`FileId`]           | File path, case-insensitive equality        |
//! | [`FolderIdentifier`] | (BackendId, FolderId)                       |
//! | [`FileIdentifier`]   | (BackendId, FileId)                         |
//! | [`Capability`]       | Read-only vs read-write mount access        |
//! | [`FileMetadata`]     | Size and timestamps reported by a backend   |
//! |----------------------|---------------------------------------------|

pub mod capability;
pub mod ids;
pub mod metadata;

pub use capability::Capability;
pub use ids::{
    BackendId, FileId, FileIdentifier, FolderId, FolderIdentifier, IdError, fold_eq,
};
pub use metadata::FileMetadata;
