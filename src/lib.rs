pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::{FetchConfig, InstallConfig, NetMode, TaskMode};
pub use crate::core::downloader::{
    CacheEntry, Fetch, FetchRequest, HttpFetcher, ParsingValidator, Validator,
};
pub use crate::core::error::{FailureKind, InstallError, InstallResult};
pub use crate::core::package::{Origin, Package, PackageFile};
pub use crate::core::task::{
    InstallParams, LoadStatus, PackageInstallTask, Resolved, TaskCanceller, TaskHandle,
    TaskOutcome, TaskStatus, UpdateStatus,
};

/// Install a `fmt` subscriber filtered by `RUST_LOG`. Safe to call more
/// than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,runtime_packages=debug")),
        )
        .try_init();
}
