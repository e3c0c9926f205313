//! Path algebra over virtual paths.
//!
//! Virtual paths are plain strings of segments joined by one separator
//! character. Folder paths begin and end with the separator (the root is
//! the separator alone); file paths begin with it and never end with it.
//! Every segment comparison is case-insensitive.
//!
//! Nothing here touches a backend. The same functions are reused with a
//! backend's native separator when a backend builds its own identifiers.

use mountspace_types::{FileId, FolderId, fold_eq};

use crate::error::{VfsError, VfsResult};

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: char = '/';

/// Split `path` into its non-empty segments.
///
/// The empty string and the separator alone both yield no segments (the root).
pub fn split(path: &str, separator: char) -> impl Iterator<Item = &str> {
    path.split(separator).filter(|s| !s.is_empty())
}

/// Segment-wise, case-insensitive prefix test.
///
/// `/root1/` is a prefix of `/ROOT1/child/` but not of `/root12/`, which a
/// raw string `starts_with` would get wrong.
pub fn is_prefix_of(prefix: &str, path: &str, separator: char) -> bool {
    let mut path_segments = split(path, separator);
    split(prefix, separator).all(|p| path_segments.next().is_some_and(|s| fold_eq(p, s)))
}

/// Normalize `path` into folder form: leading and trailing separator, no
/// empty segments.
pub fn folder_form(path: &str, separator: char) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    out.push(separator);
    for segment in split(path, separator) {
        out.push_str(segment);
        out.push(separator);
    }
    out
}

/// Append one child segment to `base`, producing a folder path.
///
/// The result always ends with the separator and is exactly one segment
/// longer than `base`. A `child` containing the separator is rejected: a
/// leading one would make it ambiguous between absolute and relative, and an
/// inner one would add more than one segment.
pub fn combine(base: &str, child: &str, separator: char) -> VfsResult<FolderId> {
    check_child(child, separator)?;
    let mut out = with_trailing_separator(base, separator);
    out.push_str(child);
    out.push(separator);
    Ok(FolderId::new(out))
}

/// Append a file name to `base`, producing a file path.
pub fn combine_file(base: &str, name: &str, separator: char) -> VfsResult<FileId> {
    check_child(name, separator)?;
    let mut out = with_trailing_separator(base, separator);
    out.push_str(name);
    Ok(FileId::new(out))
}

fn check_child(child: &str, separator: char) -> VfsResult<()> {
    if child.is_empty() {
        return Err(VfsError::invalid_path("empty name"));
    }
    if child.contains(separator) {
        return Err(VfsError::invalid_path(format!(
            "name {child:?} contains the separator {separator:?}"
        )));
    }
    Ok(())
}

/// `base` with exactly the separator appended when missing.
///
/// The empty string stays empty so native roots (which are `""`) combine to
/// relative names.
fn with_trailing_separator(base: &str, separator: char) -> String {
    let mut out = base.to_string();
    if !out.is_empty() && !out.ends_with(separator) {
        out.push(separator);
    }
    out
}

/// The folder part of a file path, including the trailing separator.
///
/// Returns `""` when the path has no separator at all.
pub fn parent_folder(file: &str, separator: char) -> &str {
    match file.rfind(separator) {
        Some(idx) => &file[..idx + separator.len_utf8()],
        None => "",
    }
}

/// The last segment of a file path.
pub fn file_name(file: &str, separator: char) -> &str {
    match file.rfind(separator) {
        Some(idx) => &file[idx + separator.len_utf8()..],
        None => file,
    }
}

/// The deepest folder that contains every path in `paths`.
///
/// A single path is returned unchanged. For several paths, the shortest one
/// is segmented and walked index by index; the walk stops at the first index
/// where any path disagrees (case-insensitively) or when the shortest path
/// runs out. The matched prefix is returned in folder form, spelled the way
/// the first path spells it.
pub fn common_ancestor(paths: &[FolderId], separator: char) -> VfsResult<FolderId> {
    match paths {
        [] => Err(VfsError::invalid_argument(
            "no common ancestor of an empty set of paths",
        )),
        [only] => Ok(only.clone()),
        _ => {
            let segmented: Vec<Vec<&str>> = paths
                .iter()
                .map(|p| split(p.as_str(), separator).collect())
                .collect();

            let depth = segmented.iter().map(Vec::len).min().unwrap_or(0);
            let first = &segmented[0];

            let matched = (0..depth)
                .take_while(|&i| segmented.iter().all(|s| fold_eq(s[i], first[i])))
                .count();

            let mut out = String::new();
            out.push(separator);
            for segment in &first[..matched] {
                out.push_str(segment);
                out.push(separator);
            }
            Ok(FolderId::new(out))
        }
    }
}

/// Characters and names a store refuses.
///
/// Backends report their own rules; the virtual file system exposes the
/// union across its read-write mounts so callers can validate up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingRules {
    pub invalid_path_chars: Vec<char>,
    pub invalid_file_name_chars: Vec<char>,
    pub reserved_names: Vec<String>,
}

impl NamingRules {
    /// Check a single file or folder name.
    ///
    /// Reserved names match case-insensitively, with or without an extension
    /// (`nul` and `NUL.txt` are both reserved if `NUL` is).
    pub fn check_name(&self, name: &str) -> VfsResult<()> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(VfsError::invalid_path(format!("invalid name {name:?}")));
        }
        if let Some(c) = name.chars().find(|c| self.invalid_file_name_chars.contains(c)) {
            return Err(VfsError::invalid_path(format!(
                "name {name:?} contains invalid character {c:?}"
            )));
        }
        let stem = name.split('.').next().unwrap_or(name);
        if self
            .reserved_names
            .iter()
            .any(|r| fold_eq(r, name) || fold_eq(r, stem))
        {
            return Err(VfsError::invalid_path(format!("name {name:?} is reserved")));
        }
        Ok(())
    }

    /// Union of several rule sets, deduplicated, first occurrence wins.
    pub fn union<'a>(rules: impl IntoIterator<Item = &'a NamingRules>) -> Self {
        let mut out = NamingRules::default();
        for r in rules {
            for c in &r.invalid_path_chars {
                if !out.invalid_path_chars.contains(c) {
                    out.invalid_path_chars.push(*c);
                }
            }
            for c in &r.invalid_file_name_chars {
                if !out.invalid_file_name_chars.contains(c) {
                    out.invalid_file_name_chars.push(*c);
                }
            }
            for n in &r.reserved_names {
                if !out.reserved_names.iter().any(|e| fold_eq(e, n)) {
                    out.reserved_names.push(n.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(paths: &[&str]) -> Vec<FolderId> {
        paths.iter().map(|p| FolderId::from(*p)).collect()
    }

    #[test]
    fn test_split_root_is_empty() {
        assert_eq!(split("", '/').count(), 0);
        assert_eq!(split("/", '/').count(), 0);
        let segs: Vec<_> = split("/a/bb/c/", '/').collect();
        assert_eq!(segs, vec!["a", "bb", "c"]);
    }

    #[test]
    fn test_is_prefix_segment_wise() {
        assert!(is_prefix_of("/root1/", "/root1/child/", '/'));
        assert!(is_prefix_of("/root1/", "/ROOT1/", '/'));
        assert!(is_prefix_of("/", "/anything/", '/'));
        assert!(!is_prefix_of("/root1/", "/root12/", '/'));
        assert!(!is_prefix_of("/root1/child/", "/root1/", '/'));
    }

    #[test]
    fn test_folder_form() {
        assert_eq!(folder_form("", '/'), "/");
        assert_eq!(folder_form("root1", '/'), "/root1/");
        assert_eq!(folder_form("//a//b", '/'), "/a/b/");
    }

    #[test]
    fn test_combine_adds_one_segment() {
        assert_eq!(combine("/", "child1", '/').unwrap().as_str(), "/child1/");
        assert_eq!(
            combine("/child1/", "child2", '/').unwrap().as_str(),
            "/child1/child2/"
        );
        assert_eq!(combine("/a", "b", '/').unwrap().as_str(), "/a/b/");
    }

    #[test]
    fn test_combine_rejects_separator() {
        assert!(matches!(
            combine("/", "/abs", '/'),
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(
            combine("/", "a/b", '/'),
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(combine("/", "", '/'), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_combine_file_native_root() {
        assert_eq!(combine_file("", "a.txt", '/').unwrap().as_str(), "a.txt");
        assert_eq!(combine_file("x/", "a.txt", '/').unwrap().as_str(), "x/a.txt");
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_folder("/a/b/c.txt", '/'), "/a/b/");
        assert_eq!(parent_folder("c.txt", '/'), "");
        assert_eq!(file_name("/a/b/c.txt", '/'), "c.txt");
        assert_eq!(file_name("c.txt", '/'), "c.txt");
    }

    #[test]
    fn test_common_ancestor_empty_fails() {
        assert!(matches!(
            common_ancestor(&[], '/'),
            Err(VfsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_common_ancestor_single_is_identity() {
        let result = common_ancestor(&ids(&["/test/"]), '/').unwrap();
        assert_eq!(result.as_str(), "/test/");
    }

    #[test]
    fn test_common_ancestor_siblings() {
        let result = common_ancestor(&ids(&["/a/1/", "/a/2/"]), '/').unwrap();
        assert_eq!(result.as_str(), "/a/");
    }

    #[test]
    fn test_common_ancestor_disjoint_is_root() {
        let result = common_ancestor(&ids(&["/a/1/", "/b/2/"]), '/').unwrap();
        assert_eq!(result.as_str(), "/");
    }

    #[test]
    fn test_common_ancestor_nested_and_case() {
        let result = common_ancestor(&ids(&["/Data/x/y/", "/data/X/", "/DATA/x/z/"]), '/').unwrap();
        assert_eq!(result, FolderId::from("/data/x/"));
        assert_eq!(result.as_str(), "/Data/x/");
    }

    #[test]
    fn test_naming_rules() {
        let rules = NamingRules {
            invalid_path_chars: vec!['\0'],
            invalid_file_name_chars: vec!['\0', '/', ':'],
            reserved_names: vec!["NUL".into(), "CON".into()],
        };
        assert!(rules.check_name("report.txt").is_ok());
        assert!(rules.check_name("a:b").is_err());
        assert!(rules.check_name("nul").is_err());
        assert!(rules.check_name("Con.txt").is_err());
        assert!(rules.check_name("..").is_err());
        assert!(rules.check_name("console").is_ok());
    }

    #[test]
    fn test_naming_rules_union_dedups() {
        let a = NamingRules {
            invalid_path_chars: vec!['\0'],
            invalid_file_name_chars: vec!['/'],
            reserved_names: vec!["CON".into()],
        };
        let b = NamingRules {
            invalid_path_chars: vec!['\0', '|'],
            invalid_file_name_chars: vec!['/', ':'],
            reserved_names: vec!["con".into(), "NUL".into()],
        };
        let u = NamingRules::union([&a, &b]);
        assert_eq!(u.invalid_path_chars, vec!['\0', '|']);
        assert_eq!(u.invalid_file_name_chars, vec!['/', ':']);
        assert_eq!(u.reserved_names, vec!["CON".to_string(), "NUL".to_string()]);
    }
}
