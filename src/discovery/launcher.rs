//! Discovery process launcher.

use crate::config::{dated_log_file, log_dir, DiscoveryConfig};
use crate::error::{ExplorerError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Log file stem of the discovery process
pub const DISCOVER_LOG_STEM: &str = "kic-discover";

/// Builds and spawns the discovery command line
#[derive(Debug, Clone)]
pub struct DiscoveryLauncher {
    executable: PathBuf,
    scope: String,
    timeout_secs: u64,
    log_dir: PathBuf,
}

impl DiscoveryLauncher {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            scope: config.scope.clone(),
            timeout_secs: config.timeout_secs,
            log_dir: log_dir(),
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `--log-file <log> <scope> --timeout <secs> --exit`
    pub fn args(&self) -> Vec<String> {
        vec![
            "--log-file".to_string(),
            dated_log_file(&self.log_dir, DISCOVER_LOG_STEM)
                .display()
                .to_string(),
            self.scope.clone(),
            "--timeout".to_string(),
            self.timeout_secs.to_string(),
            "--exit".to_string(),
        ]
    }

    /// Start the discovery process. It is killed if the handle is dropped.
    pub fn spawn(&self) -> Result<Child> {
        if let Err(e) = std::fs::create_dir_all(&self.log_dir) {
            tracing::warn!("Failed to create log directory {:?}: {}", self.log_dir, e);
        }

        let args = self.args();
        tracing::info!("Launching {:?} {}", self.executable, args.join(" "));

        Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExplorerError::Discovery(format!("Failed to launch {:?}: {}", self.executable, e))
            })
    }
}
