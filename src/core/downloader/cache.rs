use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{InstallError, InstallResult};

/// Destination for one cached download.
///
/// Nothing touches `path` until [`CacheEntry::commit`]; the commit goes
/// through a sibling `.part` file and a rename, so readers see either the
/// old contents or the new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    path: PathBuf,
}

impl CacheEntry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<cache_dir>/manifests/<sha1(url)>.json`
    pub fn for_url(cache_dir: &Path, url: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(url.as_bytes());
        let key = hex::encode(hasher.finalize());
        Self::new(cache_dir.join("manifests").join(format!("{}.json", key)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn read(&self) -> InstallResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| InstallError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub async fn commit(&self, bytes: &[u8]) -> InstallResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| InstallError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let part = self.part_path();
        let written = write_part(&part, bytes).await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&part).await;
            return written;
        }

        tokio::fs::rename(&part, &self.path)
            .await
            .map_err(|source| InstallError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!("Committed {} bytes to {:?}", bytes.len(), self.path);
        Ok(())
    }

    fn part_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        self.path.with_file_name(name)
    }
}

async fn write_part(part: &Path, bytes: &[u8]) -> InstallResult<()> {
    // Scoped so the handle is closed before the rename.
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| InstallError::Io {
            path: part.to_path_buf(),
            source: e,
        })?;
    file.write_all(bytes).await.map_err(|e| InstallError::Io {
        path: part.to_path_buf(),
        source: e,
    })?;
    file.flush().await.map_err(|e| InstallError::Io {
        path: part.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_key_is_stable_and_distinct() {
        let dir = Path::new("/cache");
        let a = CacheEntry::for_url(dir, "https://example.com/a.json");
        let b = CacheEntry::for_url(dir, "https://example.com/b.json");
        assert_eq!(a, CacheEntry::for_url(dir, "https://example.com/a.json"));
        assert_ne!(a, b);
        assert!(a.path().starts_with("/cache/manifests"));
    }

    #[tokio::test]
    async fn commit_replaces_contents_and_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let entry = CacheEntry::new(dir.path().join("nested/m.json"));
        assert!(!entry.exists());

        entry.commit(b"first").await.unwrap();
        entry.commit(b"second").await.unwrap();

        assert_eq!(entry.read().await.unwrap(), b"second");
        assert!(!dir.path().join("nested/m.json.part").exists());
    }

    #[tokio::test]
    async fn read_of_missing_entry_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = CacheEntry::new(dir.path().join("m.json"));
        assert!(matches!(
            entry.read().await,
            Err(InstallError::Io { .. })
        ));
    }
}
