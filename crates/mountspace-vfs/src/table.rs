//! Immutable mount table.
//!
//! Built once from the full set of mounts and never mutated afterwards, so
//! resolution needs no locks. Two side tables indexed by [`NodeId`] record
//! which mount sits at a trie node: one for read access (every mount) and
//! one for write access (read-write mounts only).

use serde::Serialize;

use mountspace_types::{BackendId, Capability, FolderId};

use crate::backends::Backend;
use crate::error::{VfsError, VfsResult};
use crate::mapper::PathMapper;
use crate::ops::StorageBackend;
use crate::trie::{MountTrie, NodeId};

/// One backend bound to a virtual root.
#[derive(Debug)]
pub struct MountPoint {
    pub root: FolderId,
    pub capability: Capability,
    pub backend: Backend,
    pub mapper: PathMapper,
}

impl MountPoint {
    pub fn new(root: FolderId, capability: Capability, backend: Backend, separator: char) -> Self {
        let mapper = PathMapper::for_backend(&backend, root.as_str(), separator);
        Self {
            root: mapper.virtual_root().clone(),
            capability,
            backend,
            mapper,
        }
    }

    pub fn info(&self) -> MountInfo {
        MountInfo {
            root: self.root.clone(),
            backend: self.backend.id().clone(),
            kind: self.backend.kind(),
            capability: self.capability,
        }
    }
}

/// Summary of a mount for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub root: FolderId,
    pub backend: BackendId,
    pub kind: &'static str,
    pub capability: Capability,
}

/// Outcome of resolving a virtual folder path.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Deepest trie node the path matched.
    pub node: NodeId,
    /// Every segment of the path matched a trie node.
    pub complete: bool,
    /// Mount responsible for the path, if one grants the requested access.
    pub mount: Option<&'a MountPoint>,
}

/// Trie plus per-node mount lookup.
#[derive(Debug)]
pub struct MountTable {
    trie: MountTrie,
    mounts: Vec<MountPoint>,
    readable: Vec<Option<usize>>,
    writable: Vec<Option<usize>>,
}

impl MountTable {
    /// Build the table. Fails with `DuplicateMount` if two mounts share a
    /// root (compared case-insensitively).
    pub fn build(separator: char, mounts: Vec<MountPoint>) -> VfsResult<Self> {
        let mut trie = MountTrie::new(separator);
        let nodes: Vec<NodeId> = mounts.iter().map(|m| trie.insert(m.root.as_str())).collect();

        let mut readable = vec![None; trie.len()];
        let mut writable = vec![None; trie.len()];
        for (i, (node, mount)) in nodes.iter().zip(&mounts).enumerate() {
            if readable[node.index()].is_some() {
                return Err(VfsError::duplicate_mount(mount.root.as_str()));
            }
            readable[node.index()] = Some(i);
            if mount.capability.allows_write() {
                writable[node.index()] = Some(i);
            }
        }

        Ok(Self {
            trie,
            mounts,
            readable,
            writable,
        })
    }

    pub fn trie(&self) -> &MountTrie {
        &self.trie
    }

    pub fn mounts(&self) -> &[MountPoint] {
        &self.mounts
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Mounts that accept writes.
    pub fn writable_mounts(&self) -> impl Iterator<Item = &MountPoint> {
        self.mounts.iter().filter(|m| m.capability.allows_write())
    }

    /// The mount registered exactly at `node` for `access`.
    pub fn mount_at(&self, node: NodeId, access: Capability) -> Option<&MountPoint> {
        let side = match access {
            Capability::ReadOnly => &self.readable,
            Capability::ReadWrite => &self.writable,
        };
        side.get(node.index())
            .copied()
            .flatten()
            .map(|i| &self.mounts[i])
    }

    /// Resolve a virtual folder path.
    ///
    /// The responsible mount is the deepest mount root on the path. If that
    /// mount does not grant `access` the path is treated as unbacked, so a
    /// write beneath a read-only mount never falls through to a read-write
    /// mount further up.
    pub fn resolve(&self, folder: &str, access: Capability) -> Resolved<'_> {
        let walk = self.trie.walk(folder);
        let mounted = walk
            .nodes
            .iter()
            .rev()
            .copied()
            .find(|n| self.readable[n.index()].is_some());

        Resolved {
            node: walk.last(),
            complete: walk.complete,
            mount: mounted.and_then(|n| self.mount_at(n, access)),
        }
    }

    /// Synthetic folder paths for the trie children of `node`.
    pub fn child_roots(&self, node: NodeId) -> Vec<FolderId> {
        self.trie
            .children(node)
            .iter()
            .map(|&c| FolderId::new(self.trie.path_of(c)))
            .collect()
    }
}
