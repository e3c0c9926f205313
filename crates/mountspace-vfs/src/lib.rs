//! Mount resolution and path translation over heterogeneous storage.
//!
//! Several independent stores (disk trees, embedded resource bundles) are
//! mounted at virtual roots and presented as one hierarchical namespace.
//! Key components:
//!
//! - [`StorageBackend`] - Core trait every store implements
//! - [`Backend`] - Closed set of stores a mount can hold
//! - [`DiskBackend`] - Local directory tree (with root confinement)
//! - [`ResourceBackend`] - Read-only embedded bundle
//! - [`PathMapper`] - Virtual/native id translation for one mount
//! - [`MountTable`] - Immutable trie of mount roots plus per-node lookup
//! - [`VirtualFileSystem`] - Dispatches every operation to one mount
//! - [`FileSystemBuilder`] / [`MountManifest`] - Composition in code or RON
//!
//! ## Design Decisions
//!
//! - **Built once**: the mount set is fixed at build time, so dispatch is
//!   lock-free and concurrent callers never contend.
//! - **Deepest mount wins**: a path belongs to the deepest mount root on it;
//!   anything below that root is the backend's business.
//! - **Pure-virtual folders**: trie nodes with no mount list the mount roots
//!   beneath them and refuse everything else.
//! - **Case-insensitive paths, case-sensitive backend ids.**

pub mod backends;
mod builder;
mod config;
mod error;
mod fs;
mod mapper;
mod ops;
pub mod path;
mod table;
pub mod trie;

pub use backends::{Backend, DiskBackend, ResourceBackend, ResourceIndex, ResourceLayout};
pub use builder::FileSystemBuilder;
pub use config::{BackendSpec, ConfigError, MountEntry, MountManifest};
pub use error::{VfsError, VfsResult};
pub use fs::VirtualFileSystem;
pub use mapper::{NativeScheme, PathMapper};
pub use ops::{ContentReader, ContentSource, StorageBackend};
pub use path::NamingRules;
pub use table::{MountInfo, MountPoint, MountTable, Resolved};
pub use trie::{MountTrie, NodeId};

pub use mountspace_types as types;
