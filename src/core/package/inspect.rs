// ─── Folder Inspection ───
// Derives a package from what is already installed on disk. Read-only.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::model::{normalize_rel_path, Origin, Package, PackageFile};

const HASH_BLOCK: usize = 64 * 1024;

enum WalkStop {
    Cancelled,
    Io(std::io::Error),
    /// An on-disk name a manifest could not express.
    UnsafeName(String),
}

impl From<std::io::Error> for WalkStop {
    fn from(e: std::io::Error) -> Self {
        WalkStop::Io(e)
    }
}

#[derive(Default)]
struct Tree {
    folders: BTreeSet<String>,
    files: BTreeMap<String, PackageFile>,
    symlinks: BTreeMap<String, String>,
}

impl Package {
    /// Scan `path` and describe what is installed there.
    ///
    /// Valid only when the folder holds at least one file or symlink. A
    /// missing, unreadable or empty folder gives an invalid package.
    pub fn from_inspected_folder(path: &Path) -> Package {
        inspect_folder(path, &CancellationToken::new())
            .unwrap_or_else(|| Package::invalid(Origin::Local))
    }
}

/// Cancellable form of [`Package::from_inspected_folder`]. Returns `None`
/// if `cancel` fires before the scan is done.
pub fn inspect_folder(root: &Path, cancel: &CancellationToken) -> Option<Package> {
    let mut tree = Tree::default();

    match walk(root, "", &mut tree, cancel) {
        Ok(()) => {}
        Err(WalkStop::Cancelled) => return None,
        Err(WalkStop::Io(e)) => {
            debug!("Inspection of {:?} failed: {}", root, e);
            return Some(Package::invalid(Origin::Local));
        }
        Err(WalkStop::UnsafeName(name)) => {
            debug!("Inspection of {:?} found unusable entry {:?}", root, name);
            return Some(Package::invalid(Origin::Local));
        }
    }

    if tree.files.is_empty() && tree.symlinks.is_empty() {
        debug!("No installation artifacts under {:?}", root);
        return Some(Package::invalid(Origin::Local));
    }

    debug!(
        "Inspected {:?}: {} files, {} folders, {} links",
        root,
        tree.files.len(),
        tree.folders.len(),
        tree.symlinks.len()
    );
    Some(Package::from_parts(
        Origin::Local,
        tree.folders,
        tree.files,
        tree.symlinks,
    ))
}

fn walk(
    dir: &Path,
    prefix: &str,
    tree: &mut Tree,
    cancel: &CancellationToken,
) -> Result<(), WalkStop> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(WalkStop::Cancelled);
        }

        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| WalkStop::UnsafeName(name.to_string_lossy().into_owned()))?;
        let joined = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };
        // Same rule the manifest parser applies, so inspected trees always
        // serialize to a manifest that parses back.
        let rel = match normalize_rel_path(&joined) {
            Some(rel) if rel == joined => rel,
            _ => return Err(WalkStop::UnsafeName(joined)),
        };

        let path = entry.path();
        let meta = std::fs::symlink_metadata(&path)?;
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            let target = std::fs::read_link(&path)?;
            tree.symlinks
                .insert(rel, target.to_string_lossy().replace('\\', "/"));
        } else if file_type.is_dir() {
            walk(&path, &rel, tree, cancel)?;
            tree.folders.insert(rel);
        } else if file_type.is_file() {
            let sha1 = hash_file(&path, cancel)?;
            tree.files.insert(
                rel,
                PackageFile {
                    sha1,
                    size: meta.len(),
                    executable: is_executable(&meta),
                },
            );
        }
    }

    Ok(())
}

fn hash_file(path: &Path, cancel: &CancellationToken) -> Result<String, WalkStop> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut block = vec![0u8; HASH_BLOCK];

    loop {
        if cancel.is_cancelled() {
            return Err(WalkStop::Cancelled);
        }
        let read = file.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}
