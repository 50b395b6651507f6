//! Delegated instrument actions.
//!
//! Resetting an instrument is handed to the external instrument tool, which
//! sends the reset command and exits. Only LAN and VISA connections are
//! distinguished on its command line; USB instruments go through the VISA
//! path.

use crate::config::{dated_log_file, log_dir, DiscoveryConfig};
use crate::error::{ExplorerError, Result};
use crate::explorer::TreeNode;
use crate::types::TransportType;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Log file stem of the instrument tool
pub const TOOL_LOG_STEM: &str = "kic";

/// A reset request for one instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCommand {
    executable: PathBuf,
    connection_type: &'static str,
    address: String,
    log_dir: PathBuf,
}

impl ResetCommand {
    pub fn new(executable: impl Into<PathBuf>, transport: TransportType, address: impl Into<String>) -> Self {
        let connection_type = match transport {
            TransportType::Lan => "lan",
            TransportType::Usb | TransportType::Visa => "visa",
        };
        Self {
            executable: executable.into(),
            connection_type,
            address: address.into(),
            log_dir: log_dir(),
        }
    }

    /// Reset request for the instrument behind a tree node.
    pub fn for_node(config: &DiscoveryConfig, node: &TreeNode) -> Option<Self> {
        let record = node.instrument()?;
        Some(Self::new(
            config.reset_executable.clone(),
            record.transport,
            record.address.clone(),
        ))
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// `--log-file <log> reset <lan|visa> <address>`
    pub fn args(&self) -> Vec<String> {
        vec![
            "--log-file".to_string(),
            dated_log_file(&self.log_dir, TOOL_LOG_STEM).display().to_string(),
            "reset".to_string(),
            self.connection_type.to_string(),
            self.address.clone(),
        ]
    }

    /// Start the reset process. The process exits on its own.
    pub fn spawn(&self) -> Result<Child> {
        tracing::info!("Resetting instrument at {}", self.address);
        Command::new(&self.executable)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ExplorerError::Io(e).with_context(format!("Launching {:?}", self.executable))
            })
    }
}
