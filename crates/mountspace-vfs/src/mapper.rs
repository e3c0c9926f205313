//! Two-way identifier translation at one mount boundary.
//!
//! A [`PathMapper`] owns one mount's virtual root and knows how its backend
//! spells paths. Going in, a virtual path under the root loses the root
//! prefix and has its separators rewritten. Coming out, a native id from the
//! same backend gets the virtual separator back and the root prepended.
//!
//! ```text
//! virtual  /docs/guides/intro.md      root = /docs/
//!             │ strip root, rewrite separators
//!             ▼
//! disk     guides/intro.md            (OS separator)
//! resource guides.intro.md            (dot-joined manifest name)
//! ```
//!
//! Dot-joined names are not self-describing: `a.b.md` could be the file
//! `b.md` in folder `a.` or the file `a.b.md` at the root. The manifest
//! scheme therefore consults the bundle's folder index when splitting a file
//! id. Folder segments in a manifest never contain a dot, so segment-wise
//! prefix tests and common-ancestor walks behave the same on both sides.

use std::sync::Arc;

use mountspace_types::{BackendId, FileId, FileIdentifier, FolderId, FolderIdentifier};

use crate::backends::{Backend, RESOURCE_SEPARATOR, ResourceIndex};
use crate::ops::StorageBackend;
use crate::path;

/// How a backend spells its native ids.
#[derive(Debug, Clone)]
pub enum NativeScheme {
    /// Separator-joined relative paths, folders ending with the separator.
    Hierarchical { separator: char },
    /// Dot-joined manifest names, split with the help of the folder index.
    Manifest { index: Arc<ResourceIndex> },
}

impl NativeScheme {
    pub fn separator(&self) -> char {
        match self {
            NativeScheme::Hierarchical { separator } => *separator,
            NativeScheme::Manifest { .. } => RESOURCE_SEPARATOR,
        }
    }
}

/// Translator between one mount's virtual paths and its backend's ids.
#[derive(Debug, Clone)]
pub struct PathMapper {
    backend: BackendId,
    virtual_root: FolderId,
    separator: char,
    scheme: NativeScheme,
}

impl PathMapper {
    pub fn new(
        backend: BackendId,
        virtual_root: &str,
        separator: char,
        scheme: NativeScheme,
    ) -> Self {
        Self {
            backend,
            virtual_root: FolderId::new(path::folder_form(virtual_root, separator)),
            separator,
            scheme,
        }
    }

    /// The mapper matching `backend`'s addressing scheme.
    pub fn for_backend(backend: &Backend, virtual_root: &str, separator: char) -> Self {
        let scheme = match backend {
            Backend::Disk(disk) => NativeScheme::Hierarchical {
                separator: disk.native_separator(),
            },
            Backend::Resource(res) => NativeScheme::Manifest {
                index: Arc::clone(res.index()),
            },
        };
        Self::new(backend.id().clone(), virtual_root, separator, scheme)
    }

    pub fn backend_id(&self) -> &BackendId {
        &self.backend
    }

    pub fn virtual_root(&self) -> &FolderId {
        &self.virtual_root
    }

    /// True if `virtual_path` is at or below this mount's root.
    pub fn covers(&self, virtual_path: &str) -> bool {
        path::is_prefix_of(self.virtual_root.as_str(), virtual_path, self.separator)
    }

    /// Segments of `virtual_path` below the mount root, or `None` if the path
    /// is not under it.
    fn relative<'a>(&self, virtual_path: &'a str) -> Option<Vec<&'a str>> {
        if !self.covers(virtual_path) {
            return None;
        }
        let depth = path::split(self.virtual_root.as_str(), self.separator).count();
        let rest: Vec<&str> = path::split(virtual_path, self.separator).skip(depth).collect();
        let native_sep = self.scheme.separator();
        if rest.iter().any(|s| s.contains(native_sep)) {
            return None;
        }
        Some(rest)
    }

    /// Virtual folder to native folder id.
    pub fn map_folder_from_virtual(&self, virtual_folder: &FolderId) -> Option<FolderIdentifier> {
        let rest = self.relative(virtual_folder.as_str())?;
        let native_sep = self.scheme.separator();
        let mut native = String::new();
        for segment in rest {
            native.push_str(segment);
            native.push(native_sep);
        }
        Some(FolderIdentifier::new(self.backend.clone(), native))
    }

    /// Virtual file to native file id.
    ///
    /// The file name itself may contain the native separator when the scheme
    /// is dot-joined; only folder segments are checked.
    pub fn map_file_from_virtual(&self, virtual_file: &FileId) -> Option<FileIdentifier> {
        let virtual_path = virtual_file.as_str();
        if virtual_path.ends_with(self.separator) {
            return None;
        }
        let folder = path::parent_folder(virtual_path, self.separator);
        let name = path::file_name(virtual_path, self.separator);
        if name.is_empty() {
            return None;
        }
        let native_folder = self.map_folder_from_virtual(&FolderId::from(folder))?;
        let mut native = native_folder.folder.into_string();
        if matches!(self.scheme, NativeScheme::Hierarchical { separator } if name.contains(separator))
        {
            return None;
        }
        native.push_str(name);
        Some(FileIdentifier::new(self.backend.clone(), native))
    }

    /// Native folder id to virtual folder path.
    pub fn map_folder_to_virtual(&self, native: &FolderIdentifier) -> Option<FolderId> {
        if native.backend != self.backend {
            return None;
        }
        let mut out = self.virtual_root.as_str().to_string();
        for segment in path::split(native.folder.as_str(), self.scheme.separator()) {
            out.push_str(segment);
            out.push(self.separator);
        }
        Some(FolderId::new(out))
    }

    /// Native file id to virtual file path.
    pub fn map_file_to_virtual(&self, native: &FileIdentifier) -> Option<FileId> {
        if native.backend != self.backend {
            return None;
        }
        let id = native.file.as_str();
        let (folder, name) = match &self.scheme {
            NativeScheme::Hierarchical { separator } => {
                (path::parent_folder(id, *separator), path::file_name(id, *separator))
            }
            NativeScheme::Manifest { index } => index.split_file(id),
        };
        if name.is_empty() {
            return None;
        }
        let folder = self.map_folder_to_virtual(&FolderIdentifier::new(
            self.backend.clone(),
            folder,
        ))?;
        let mut out = folder.into_string();
        out.push_str(name);
        Some(FileId::new(out))
    }
}
