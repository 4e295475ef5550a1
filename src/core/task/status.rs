use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::InstallError;
use crate::core::package::{Origin, Package};

/// Which path the current package came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Unresolved,
    Local,
    Remote,
}

/// Lifecycle of a task. Leaves `Pending` once and never comes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl UpdateStatus {
    pub fn is_terminal(self) -> bool {
        self != UpdateStatus::Pending
    }

    /// Move to `next` if still pending. Returns whether the transition
    /// happened; a terminal status is never overwritten.
    pub fn settle(&mut self, next: UpdateStatus) -> bool {
        if self.is_terminal() || !next.is_terminal() {
            return false;
        }
        *self = next;
        true
    }
}

/// Snapshot published to observers while the task runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub load: LoadStatus,
    pub update: UpdateStatus,
}

/// The package a task settled on.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub package: Package,
    pub version: String,
    pub resolved_at: DateTime<Utc>,
}

impl Resolved {
    pub fn origin(&self) -> Origin {
        self.package.origin()
    }
}

/// The single terminal event of a task.
#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded(Resolved),
    /// Keeps the last failure so the owner can tell network from parse errors.
    Failed(InstallError),
    Cancelled,
}

impl TaskOutcome {
    pub fn status(&self) -> UpdateStatus {
        match self {
            TaskOutcome::Succeeded(_) => UpdateStatus::Succeeded,
            TaskOutcome::Failed(_) => UpdateStatus::Failed,
            TaskOutcome::Cancelled => UpdateStatus::Cancelled,
        }
    }

    pub fn load_status(&self) -> LoadStatus {
        match self {
            TaskOutcome::Succeeded(resolved) => match resolved.origin() {
                Origin::Local => LoadStatus::Local,
                Origin::Remote => LoadStatus::Remote,
            },
            _ => LoadStatus::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_is_sticky() {
        let mut status = UpdateStatus::Pending;
        assert!(!status.settle(UpdateStatus::Pending));
        assert!(status.settle(UpdateStatus::Failed));
        assert!(!status.settle(UpdateStatus::Succeeded));
        assert!(!status.settle(UpdateStatus::Pending));
        assert_eq!(status, UpdateStatus::Failed);
    }

    #[test]
    fn outcome_maps_to_status() {
        assert_eq!(TaskOutcome::Cancelled.status(), UpdateStatus::Cancelled);
        assert_eq!(
            TaskOutcome::Failed(InstallError::Cancelled).load_status(),
            LoadStatus::Unresolved
        );
    }
}
