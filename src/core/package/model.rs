use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Where a resolved package came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// A regular file inside a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// Lowercase hex SHA-1 of the file contents.
    pub sha1: String,
    pub size: u64,
    pub executable: bool,
}

/// A resolved installation: the folders, files and symlinks that make it up.
///
/// Built once, either by inspecting a folder or by parsing a manifest, and
/// never mutated afterwards. Paths are relative, `/`-separated and free of
/// `.`/`..` segments.
///
/// An invalid package carries no entries; check [`Package::is_valid`] before
/// reading any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    valid: bool,
    origin: Origin,
    folders: BTreeSet<String>,
    files: BTreeMap<String, PackageFile>,
    symlinks: BTreeMap<String, String>,
}

impl Package {
    pub(crate) fn invalid(origin: Origin) -> Self {
        Self {
            valid: false,
            origin,
            folders: BTreeSet::new(),
            files: BTreeMap::new(),
            symlinks: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        origin: Origin,
        folders: BTreeSet<String>,
        files: BTreeMap<String, PackageFile>,
        symlinks: BTreeMap<String, String>,
    ) -> Self {
        Self {
            valid: true,
            origin,
            folders,
            files,
            symlinks,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn folders(&self) -> &BTreeSet<String> {
        &self.folders
    }

    pub fn files(&self) -> &BTreeMap<String, PackageFile> {
        &self.files
    }

    /// Link path → raw link target.
    pub fn symlinks(&self) -> &BTreeMap<String, String> {
        &self.symlinks
    }

    /// True when both packages are valid and describe the same tree.
    /// Origin is ignored.
    pub fn same_identity(&self, other: &Package) -> bool {
        self.valid
            && other.valid
            && self.folders == other.folders
            && self.files == other.files
            && self.symlinks == other.symlinks
    }
}

/// Normalize a manifest/inspection path. Returns `None` for anything that
/// could escape the install root.
pub(crate) fn normalize_rel_path(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.starts_with('/') || raw.contains('\\') || raw.contains(':') {
        return None;
    }

    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return None;
    }

    Some(segments.join("/"))
}

/// Every proper ancestor of a normalized path, e.g. `a/b/c` → `a`, `a/b`.
pub(crate) fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rejects_escapes() {
        assert_eq!(normalize_rel_path("bin/java"), Some("bin/java".into()));
        assert_eq!(normalize_rel_path("bin//java/"), Some("bin/java".into()));
        assert_eq!(normalize_rel_path(""), None);
        assert_eq!(normalize_rel_path("/etc/passwd"), None);
        assert_eq!(normalize_rel_path("lib/../../x"), None);
        assert_eq!(normalize_rel_path("./x"), None);
        assert_eq!(normalize_rel_path("C:/x"), None);
        assert_eq!(normalize_rel_path("a\\b"), None);
    }

    #[test]
    fn ancestors_of_nested_path() {
        let all: Vec<&str> = ancestors("a/b/c").collect();
        assert_eq!(all, vec!["a", "a/b"]);
        assert_eq!(ancestors("top").count(), 0);
    }

    #[test]
    fn invalid_package_has_no_identity() {
        let pkg = Package::invalid(Origin::Local);
        assert!(!pkg.is_valid());
        assert!(pkg.files().is_empty());
        assert!(!pkg.same_identity(&pkg.clone()));
    }
}
