// ─── Package Manifest ───
// Parses and writes the Mojang runtime manifest (`{"files": {...}}`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::model::{ancestors, normalize_rel_path, Origin, Package, PackageFile};

#[derive(Debug, Serialize, Deserialize)]
struct ManifestDocument {
    files: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ManifestEntry {
    Directory,
    File {
        #[serde(default)]
        executable: bool,
        downloads: FileDownloads,
    },
    Link {
        target: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct FileDownloads {
    raw: DownloadInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lzma: Option<DownloadInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DownloadInfo {
    sha1: String,
    size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

/// Why a manifest was refused. Only logged; callers see `valid = false`.
#[derive(Debug, Error)]
pub(crate) enum ManifestError {
    #[error("malformed manifest: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("unsafe path in manifest: {0:?}")]
    UnsafePath(String),

    #[error("bad sha1 for {path}: {sha1:?}")]
    BadSha1 { path: String, sha1: String },

    #[error("empty link target for {0}")]
    EmptyLinkTarget(String),

    #[error("{0} is both a folder and a file or link")]
    Conflict(String),
}

impl Package {
    /// Parse downloaded manifest bytes. Any problem yields an invalid
    /// package; nothing partial is ever returned.
    pub fn from_manifest_contents(bytes: &[u8]) -> Package {
        match parse_manifest(bytes) {
            Ok(package) => package,
            Err(e) => {
                debug!("Rejected package manifest: {}", e);
                Package::invalid(Origin::Remote)
            }
        }
    }

    /// Serialize back to manifest form. Invalid packages have no manifest.
    pub fn to_manifest_contents(&self) -> Option<Vec<u8>> {
        if !self.is_valid() {
            return None;
        }

        let mut files = BTreeMap::new();
        for folder in self.folders() {
            files.insert(folder.clone(), ManifestEntry::Directory);
        }
        for (path, file) in self.files() {
            files.insert(
                path.clone(),
                ManifestEntry::File {
                    executable: file.executable,
                    downloads: FileDownloads {
                        raw: DownloadInfo {
                            sha1: file.sha1.clone(),
                            size: file.size,
                            url: None,
                        },
                        lzma: None,
                    },
                },
            );
        }
        for (path, target) in self.symlinks() {
            files.insert(
                path.clone(),
                ManifestEntry::Link {
                    target: target.clone(),
                },
            );
        }

        serde_json::to_vec_pretty(&ManifestDocument { files }).ok()
    }
}

pub(crate) fn parse_manifest(bytes: &[u8]) -> Result<Package, ManifestError> {
    let document: ManifestDocument = serde_json::from_slice(bytes)?;

    let mut folders = BTreeSet::new();
    let mut files = BTreeMap::new();
    let mut symlinks = BTreeMap::new();

    for (raw_path, entry) in document.files {
        let path =
            normalize_rel_path(&raw_path).ok_or_else(|| ManifestError::UnsafePath(raw_path))?;

        for parent in ancestors(&path) {
            folders.insert(parent.to_string());
        }

        match entry {
            ManifestEntry::Directory => {
                folders.insert(path);
            }
            ManifestEntry::File {
                executable,
                downloads,
            } => {
                let sha1 = downloads.raw.sha1.to_ascii_lowercase();
                if !is_sha1_hex(&sha1) {
                    return Err(ManifestError::BadSha1 {
                        path,
                        sha1: downloads.raw.sha1,
                    });
                }
                files.insert(
                    path,
                    PackageFile {
                        sha1,
                        size: downloads.raw.size,
                        executable,
                    },
                );
            }
            ManifestEntry::Link { target } => {
                if target.is_empty() {
                    return Err(ManifestError::EmptyLinkTarget(path));
                }
                symlinks.insert(path, target);
            }
        }
    }

    if let Some(clash) = folders
        .iter()
        .find(|f| files.contains_key(*f) || symlinks.contains_key(*f))
    {
        return Err(ManifestError::Conflict(clash.clone()));
    }

    Ok(Package::from_parts(Origin::Remote, folders, files, symlinks))
}

fn is_sha1_hex(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
