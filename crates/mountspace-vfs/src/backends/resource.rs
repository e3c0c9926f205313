//! Embedded resource backend.
//!
//! Serves `&'static [u8]` blobs (usually from `include_bytes!`) as a
//! read-only tree. Native ids are dot-joined names in the style of resource
//! manifests: `guides.` is a folder, `guides.intro.md` a file inside it, and
//! the root is the empty string.
//!
//! Because the dot is also legal inside a file name, a dot-joined file id is
//! only split correctly with the folder index at hand. The index is shared
//! with the path mapper for that reason.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;

use mountspace_types::{
    BackendId, Capability, FileIdentifier, FileMetadata, FolderIdentifier, fold_eq,
};

use crate::error::{VfsError, VfsResult};
use crate::ops::{ContentReader, StorageBackend, ensure_owned};
use crate::path::NamingRules;

/// Separator of resource-native ids.
pub const RESOURCE_SEPARATOR: char = '.';

/// How entry names are laid out in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLayout {
    /// Entry names are hierarchical (`guides/intro.md`); folders are
    /// synthesized from them. Folder segments may not contain a dot.
    Manifest,
    /// Every entry is a file at the root. Names are used verbatim once
    /// `prefix` is stripped; entries without the prefix are skipped.
    Flat { prefix: Option<String> },
}

#[derive(Debug)]
struct ResourceFolder {
    id: String,
    parent: Option<usize>,
}

struct ResourceFile {
    id: String,
    folder: usize,
    name: String,
    data: &'static [u8],
}

impl fmt::Debug for ResourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFile")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Folder and file index of one bundle.
#[derive(Debug)]
pub struct ResourceIndex {
    folders: Vec<ResourceFolder>,
    files: Vec<ResourceFile>,
}

impl ResourceIndex {
    fn empty() -> Self {
        Self {
            folders: vec![ResourceFolder {
                id: String::new(),
                parent: None,
            }],
            files: Vec::new(),
        }
    }

    fn build(
        layout: &ResourceLayout,
        entries: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> VfsResult<Self> {
        let mut index = Self::empty();
        for (name, data) in entries {
            match layout {
                ResourceLayout::Manifest => index.add_manifest_entry(name, data)?,
                ResourceLayout::Flat { prefix } => {
                    let Some(stripped) = strip_prefix_folded(name, prefix.as_deref()) else {
                        continue;
                    };
                    index.add_file(0, stripped, data)?;
                }
            }
        }
        Ok(index)
    }

    fn add_manifest_entry(&mut self, name: &str, data: &'static [u8]) -> VfsResult<()> {
        let mut segments: Vec<&str> = name.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
        let Some(file_name) = segments.pop() else {
            return Err(VfsError::invalid_argument(format!(
                "resource entry {name:?} has no file name"
            )));
        };

        let mut folder = 0;
        for segment in segments {
            if segment.contains(RESOURCE_SEPARATOR) {
                return Err(VfsError::invalid_argument(format!(
                    "resource folder {segment:?} in {name:?} contains a dot"
                )));
            }
            folder = self.ensure_folder(folder, segment);
        }
        self.add_file(folder, file_name, data)
    }

    fn ensure_folder(&mut self, parent: usize, segment: &str) -> usize {
        let id = format!("{}{segment}{RESOURCE_SEPARATOR}", self.folders[parent].id);
        if let Some(existing) = self.folder(&id) {
            return existing;
        }
        self.folders.push(ResourceFolder {
            id,
            parent: Some(parent),
        });
        self.folders.len() - 1
    }

    fn add_file(&mut self, folder: usize, name: &str, data: &'static [u8]) -> VfsResult<()> {
        if name.is_empty() {
            return Err(VfsError::invalid_argument("resource entry with an empty name"));
        }
        let id = format!("{}{name}", self.folders[folder].id);
        if self.file(&id).is_some() {
            return Err(VfsError::invalid_argument(format!(
                "resource {id:?} appears twice"
            )));
        }
        self.files.push(ResourceFile {
            id,
            folder,
            name: name.to_string(),
            data,
        });
        Ok(())
    }

    /// Index of the folder with native id `id`.
    pub fn folder(&self, id: &str) -> Option<usize> {
        self.folders.iter().position(|f| fold_eq(&f.id, id))
    }

    fn file(&self, id: &str) -> Option<&ResourceFile> {
        self.files.iter().find(|f| fold_eq(&f.id, id))
    }

    /// Split a native file id into its folder id and file name.
    ///
    /// Known files split where they were indexed. Anything else splits after
    /// the longest known folder prefix, so `guides.new.md` splits as
    /// `guides.` + `new.md` when `guides.` is a folder.
    pub fn split_file<'a>(&self, id: &'a str) -> (&'a str, &'a str) {
        if let Some(file) = self.file(id) {
            let at = id.len().saturating_sub(file.name.len());
            if id.is_char_boundary(at) {
                return id.split_at(at);
            }
        }
        let at = self
            .folders
            .iter()
            .filter(|f| f.id.len() < id.len() && prefix_folded(id, &f.id))
            .map(|f| f.id.len())
            .max()
            .unwrap_or(0);
        id.split_at(at)
    }

    fn child_folders(&self, parent: usize) -> impl Iterator<Item = &str> {
        self.folders
            .iter()
            .filter(move |f| f.parent == Some(parent))
            .map(|f| f.id.as_str())
    }

    fn files_in(&self, folder: usize) -> impl Iterator<Item = &ResourceFile> {
        self.files.iter().filter(move |f| f.folder == folder)
    }
}

fn prefix_folded(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len()).is_some_and(|head| fold_eq(head, prefix))
}

fn strip_prefix_folded<'a>(name: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    match prefix {
        None | Some("") => Some(name),
        Some(p) if prefix_folded(name, p) => Some(&name[p.len()..]),
        Some(_) => None,
    }
}

/// Read-only backend over embedded byte slices.
#[derive(Debug, Clone)]
pub struct ResourceBackend {
    id: BackendId,
    index: Arc<ResourceIndex>,
}

impl ResourceBackend {
    /// Index `entries` (name, bytes) under the given layout.
    pub fn new(
        id: BackendId,
        layout: ResourceLayout,
        entries: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> VfsResult<Self> {
        let index = ResourceIndex::build(&layout, entries)?;
        Ok(Self {
            id,
            index: Arc::new(index),
        })
    }

    /// Hierarchical bundle, e.g. `("guides/intro.md", include_bytes!(..))`.
    pub fn manifest(
        id: BackendId,
        entries: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> VfsResult<Self> {
        Self::new(id, ResourceLayout::Manifest, entries)
    }

    /// Flat bundle: every entry lands at the root.
    pub fn flat(
        id: BackendId,
        prefix: Option<&str>,
        entries: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> VfsResult<Self> {
        let layout = ResourceLayout::Flat {
            prefix: prefix.map(str::to_string),
        };
        Self::new(id, layout, entries)
    }

    /// The folder index, shared with path mappers.
    pub fn index(&self) -> &Arc<ResourceIndex> {
        &self.index
    }

    fn folder_index(&self, folder: &FolderIdentifier) -> VfsResult<usize> {
        ensure_owned(&self.id, &folder.backend, folder.folder.as_str())?;
        self.index
            .folder(folder.folder.as_str())
            .ok_or_else(|| VfsError::not_found(folder.folder.as_str()))
    }

    fn entry(&self, file: &FileIdentifier) -> VfsResult<&ResourceFile> {
        ensure_owned(&self.id, &file.backend, file.file.as_str())?;
        self.index
            .file(file.file.as_str())
            .ok_or_else(|| VfsError::not_found(file.file.as_str()))
    }
}

#[async_trait]
impl StorageBackend for ResourceBackend {
    fn id(&self) -> &BackendId {
        &self.id
    }

    fn root(&self) -> FolderIdentifier {
        FolderIdentifier::new(self.id.clone(), "")
    }

    fn native_separator(&self) -> char {
        RESOURCE_SEPARATOR
    }

    fn capability(&self) -> Capability {
        Capability::ReadOnly
    }

    fn naming_rules(&self) -> NamingRules {
        NamingRules {
            invalid_path_chars: vec!['\0'],
            invalid_file_name_chars: vec!['\0'],
            reserved_names: Vec::new(),
        }
    }

    async fn open_read(&self, file: &FileIdentifier) -> VfsResult<ContentReader> {
        let entry = self.entry(file)?;
        Ok(Box::pin(Cursor::new(entry.data)))
    }

    async fn metadata(&self, file: &FileIdentifier) -> VfsResult<FileMetadata> {
        let entry = self.entry(file)?;
        Ok(FileMetadata {
            file: FileIdentifier::new(self.id.clone(), entry.id.as_str()),
            name: entry.name.clone(),
            size: entry.data.len() as u64,
            modified: None,
        })
    }

    async fn file_identifiers(&self, folder: &FolderIdentifier) -> VfsResult<Vec<FileIdentifier>> {
        let idx = self.folder_index(folder)?;
        Ok(self
            .index
            .files_in(idx)
            .map(|f| FileIdentifier::new(self.id.clone(), f.id.as_str()))
            .collect())
    }

    async fn folder_identifiers(
        &self,
        folder: &FolderIdentifier,
    ) -> VfsResult<Vec<FolderIdentifier>> {
        let idx = self.folder_index(folder)?;
        Ok(self
            .index
            .child_folders(idx)
            .map(|id| FolderIdentifier::new(self.id.clone(), id))
            .collect())
    }

    fn file_identifier(&self, folder: &FolderIdentifier, name: &str) -> VfsResult<FileIdentifier> {
        ensure_owned(&self.id, &folder.backend, folder.folder.as_str())?;
        self.naming_rules().check_name(name)?;
        Ok(FileIdentifier::new(
            self.id.clone(),
            format!("{}{name}", folder.folder),
        ))
    }
}
