use std::path::PathBuf;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::package::{inspect_folder, Package};

/// Runs folder inspection on the blocking pool.
pub struct FolderInspector {
    root: PathBuf,
}

impl FolderInspector {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves to `None` when `cancel` fired before the scan finished.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Option<Package>> {
        tokio::task::spawn_blocking(move || inspect_folder(&self.root, &cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inspection_runs_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("release"), b"JAVA_VERSION=21").unwrap();

        let handle =
            FolderInspector::new(dir.path().to_path_buf()).spawn(CancellationToken::new());
        let pkg = handle.await.unwrap().unwrap();
        assert!(pkg.is_valid());
    }

    #[tokio::test]
    async fn pre_cancelled_inspection_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("release"), b"JAVA_VERSION=21").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = FolderInspector::new(dir.path().to_path_buf()).spawn(cancel);
        assert!(handle.await.unwrap().is_none());
    }
}
