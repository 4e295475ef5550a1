use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{InstallError, InstallResult};

const APP_DIR_NAME: &str = "runtime-packages";
const APP_USER_AGENT: &str = "runtime-packages/0.1.0";

/// Whether the manifest may be fetched over the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetMode {
    #[default]
    Online,
    /// Serve the manifest from the cache only.
    Offline,
}

/// What the task is resolving for. Informational only: both modes use the
/// same fallback policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    #[default]
    Launch,
    Resolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Whole-request timeout. `None` leaves it to the transport.
    pub timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: APP_USER_AGENT.to_string(),
            timeout_secs: Some(30),
        }
    }
}

/// Settings shared by every install task, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub net_mode: NetMode,
    pub task_mode: TaskMode,
    /// A valid local installation settles the task without waiting for the
    /// network.
    pub local_authoritative: bool,
    pub cache_dir: PathBuf,
    pub fetch: FetchConfig,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            net_mode: NetMode::default(),
            task_mode: TaskMode::default(),
            local_authoritative: false,
            cache_dir: default_cache_dir(),
            fetch: FetchConfig::default(),
        }
    }
}

impl InstallConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> InstallResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(InstallError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: InstallConfig = serde_json::from_str(&raw)?;
        if config.fetch.user_agent.trim().is_empty() {
            return Err(InstallError::Config("fetch.user_agent must not be empty".into()));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> InstallResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| InstallError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstallConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.net_mode, NetMode::Online);
        assert!(!config.local_authoritative);
        assert_eq!(config.fetch.timeout_secs, Some(30));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "net_mode": "offline", "task_mode": "resolution" }"#,
        )
        .unwrap();

        let config = InstallConfig::load(&path).unwrap();
        assert_eq!(config.net_mode, NetMode::Offline);
        assert_eq!(config.task_mode, TaskMode::Resolution);
        assert_eq!(config.fetch.user_agent, APP_USER_AGENT);
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "fetch": { "user_agent": "  " } }"#).unwrap();

        let err = InstallConfig::load(&path).unwrap_err();
        assert!(matches!(err, InstallError::Config(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = InstallConfig {
            local_authoritative: true,
            ..InstallConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = InstallConfig::load(&path).unwrap();
        assert!(loaded.local_authoritative);
    }
}
