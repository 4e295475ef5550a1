pub mod inspector;
pub mod install;
pub mod status;

pub use inspector::FolderInspector;
pub use install::{InstallParams, PackageInstallTask, TaskCanceller, TaskHandle};
pub use status::{LoadStatus, Resolved, TaskOutcome, TaskStatus, UpdateStatus};
