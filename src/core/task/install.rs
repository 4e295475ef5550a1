// ─── Package Install Task ───
// Races folder inspection against the manifest download and settles the
// task exactly once.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::inspector::FolderInspector;
use super::status::{Resolved, TaskOutcome, TaskStatus};
use crate::core::config::{InstallConfig, NetMode, TaskMode};
use crate::core::downloader::{CacheEntry, Fetch, FetchRequest, ParsingValidator};
use crate::core::error::{InstallError, InstallResult};
use crate::core::package::{Origin, Package};

/// What to resolve and where.
#[derive(Debug, Clone)]
pub struct InstallParams {
    /// Label of the package version, carried into the result.
    pub version: String,
    pub manifest_url: String,
    pub target_dir: PathBuf,
}

/// Resolves the package installed in `target_dir` against its manifest.
///
/// Both paths start together:
/// - the folder is inspected on the blocking pool;
/// - the manifest is fetched through a [`ParsingValidator`], so it reaches
///   the cache only if it parses.
///
/// A good remote manifest wins. A valid local package is the fallback when
/// the fetch fails, or wins outright if `local_authoritative` is set.
pub struct PackageInstallTask {
    id: Uuid,
    params: InstallParams,
    net_mode: NetMode,
    task_mode: TaskMode,
    local_authoritative: bool,
    cache: CacheEntry,
    fetcher: Arc<dyn Fetch>,
}

impl PackageInstallTask {
    pub fn new(params: InstallParams, config: &InstallConfig, fetcher: Arc<dyn Fetch>) -> Self {
        let cache = CacheEntry::for_url(&config.cache_dir, &params.manifest_url);
        Self {
            id: Uuid::new_v4(),
            params,
            net_mode: config.net_mode,
            task_mode: config.task_mode,
            local_authoritative: config.local_authoritative,
            cache,
            fetcher,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cache_entry(&self) -> &CacheEntry {
        &self.cache
    }

    /// Launch both paths and return immediately. Must be called from within
    /// a tokio runtime.
    pub fn start(self) -> TaskHandle {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(TaskStatus::default());
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let handle = TaskHandle {
            id: self.id,
            cancel: cancel.clone(),
            status: status_rx,
            outcome: outcome_rx,
        };

        tokio::spawn(self.drive(cancel, status_tx, outcome_tx));
        handle
    }

    async fn drive(
        self,
        cancel: CancellationToken,
        status_tx: watch::Sender<TaskStatus>,
        outcome_tx: oneshot::Sender<TaskOutcome>,
    ) {
        info!(
            "Install task {} started: version={} mode={:?} net={:?} dir={:?}",
            self.id, self.params.version, self.task_mode, self.net_mode, self.params.target_dir
        );

        // Cancelled on owner request and again on settle, so no path outlives
        // the task.
        let work = cancel.child_token();

        let mut inspection =
            FolderInspector::new(self.params.target_dir.clone()).spawn(work.child_token());

        let request = FetchRequest {
            url: self.params.manifest_url.clone(),
            cache: self.cache.clone(),
            mode: self.net_mode,
        };
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_cancel = work.child_token();
        let mut fetch = tokio::spawn(async move {
            let mut validator = ParsingValidator::new();
            let result = fetcher.fetch(&request, &mut validator, &fetch_cancel).await;
            result.map(|()| validator.into_package())
        });

        let mut resolution =
            Resolution::new(self.local_authoritative, self.params.version.clone());
        let mut inspection_done = false;
        let mut fetch_done = false;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Install task {} cancelled by owner", self.id);
                    break TaskOutcome::Cancelled;
                }
                joined = &mut fetch, if !fetch_done => {
                    fetch_done = true;
                    let result = joined.unwrap_or_else(|e| Err(lost("manifest fetch", e)));
                    if let Some(outcome) = resolution.on_remote(result) {
                        break outcome;
                    }
                }
                joined = &mut inspection, if !inspection_done => {
                    inspection_done = true;
                    let step = match joined {
                        Ok(Some(package)) => resolution.on_local(package),
                        // The inspector only stops early when the task token fired.
                        Ok(None) => Some(TaskOutcome::Cancelled),
                        Err(e) if e.is_cancelled() => Some(TaskOutcome::Cancelled),
                        Err(e) => {
                            warn!("Folder inspection crashed: {}", e);
                            resolution.on_local(Package::invalid(Origin::Local))
                        }
                    };
                    if let Some(outcome) = step {
                        break outcome;
                    }
                }
            }
        };

        // Tear down whatever is still running before anyone hears the result.
        work.cancel();
        if !fetch_done {
            let _ = fetch.await;
        }
        if !inspection_done {
            let _ = inspection.await;
        }

        match &outcome {
            TaskOutcome::Succeeded(resolved) => info!(
                "Install task {} succeeded from {} ({} files)",
                self.id,
                resolved.origin(),
                resolved.package.files().len()
            ),
            TaskOutcome::Failed(e) => warn!("Install task {} failed: {}", self.id, e),
            TaskOutcome::Cancelled => info!("Install task {} cancelled", self.id),
        }

        let load = outcome.load_status();
        let update = outcome.status();
        status_tx.send_if_modified(|s| {
            if s.update.settle(update) {
                s.load = load;
                true
            } else {
                false
            }
        });

        // The owner may have dropped its handle; nothing else to do then.
        let _ = outcome_tx.send(outcome);
    }
}

fn lost(what: &str, e: JoinError) -> InstallError {
    InstallError::TaskLost(format!("{}: {}", what, e))
}

/// Owner side of a running task.
pub struct TaskHandle {
    id: Uuid,
    cancel: CancellationToken,
    status: watch::Receiver<TaskStatus>,
    outcome: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation. No effect once the task has settled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cancel switch that can be moved elsewhere while the handle waits.
    pub fn canceller(&self) -> TaskCanceller {
        TaskCanceller(self.cancel.clone())
    }

    /// Changes once, on settle. `load` stays `Unresolved` until the task
    /// has a package, so observers never see it move backwards.
    pub fn status(&self) -> watch::Receiver<TaskStatus> {
        self.status.clone()
    }

    /// Wait for the single terminal event.
    pub async fn outcome(self) -> TaskOutcome {
        self.outcome.await.unwrap_or_else(|_| {
            TaskOutcome::Failed(InstallError::TaskLost("install task dropped".into()))
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskCanceller(CancellationToken);

impl TaskCanceller {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

// ─── Resolution policy ───

enum LocalPath {
    Running,
    Done(Package),
}

enum RemotePath {
    Running,
    Failed(InstallError),
}

/// Decides the outcome from whatever each path has reported so far.
/// Returns `Some` exactly when the task can settle.
struct Resolution {
    local_authoritative: bool,
    version: String,
    local: LocalPath,
    remote: RemotePath,
}

impl Resolution {
    fn new(local_authoritative: bool, version: String) -> Self {
        Self {
            local_authoritative,
            version,
            local: LocalPath::Running,
            remote: RemotePath::Running,
        }
    }

    fn on_local(&mut self, package: Package) -> Option<TaskOutcome> {
        debug!("Local inspection finished, valid={}", package.is_valid());

        if package.is_valid() && self.local_authoritative {
            return Some(self.succeeded(package));
        }

        match std::mem::replace(&mut self.remote, RemotePath::Running) {
            RemotePath::Failed(e) => Some(if package.is_valid() {
                self.succeeded(package)
            } else {
                TaskOutcome::Failed(e)
            }),
            RemotePath::Running => {
                self.local = LocalPath::Done(package);
                None
            }
        }
    }

    fn on_remote(&mut self, result: InstallResult<Package>) -> Option<TaskOutcome> {
        let error = match result {
            Ok(package) if package.is_valid() => return Some(self.succeeded(package)),
            Ok(_) => InstallError::TaskLost("fetch reported success without a package".into()),
            Err(e) => e,
        };
        debug!("Manifest path failed: {}", error);

        match std::mem::replace(&mut self.local, LocalPath::Running) {
            LocalPath::Done(package) if package.is_valid() => Some(self.succeeded(package)),
            LocalPath::Done(_) => Some(TaskOutcome::Failed(error)),
            LocalPath::Running => {
                self.remote = RemotePath::Failed(error);
                None
            }
        }
    }

    fn succeeded(&self, package: Package) -> TaskOutcome {
        TaskOutcome::Succeeded(Resolved {
            package,
            version: self.version.clone(),
            resolved_at: Utc::now(),
        })
    }
}
