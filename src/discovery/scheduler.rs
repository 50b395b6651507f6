//! Discovery scheduler.
//!
//! Runs one discovery at a time: launch the discovery process, poll the
//! source on a fixed interval while it runs, and poll once more after it
//! exits so late results are not lost. Each poll result goes through
//! [`Explorer::ingest`]. A start request while a run is in progress is a
//! no-op.
//!
//! Fetch failures are logged and treated as an empty cycle; the next tick
//! simply tries again.

use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryLauncher, InstrumentSource};
use crate::error::{ExplorerError, Result};
use crate::explorer::{Explorer, ExplorerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct DiscoveryScheduler {
    explorer: Explorer,
    source: Arc<dyn InstrumentSource>,
    launcher: Option<DiscoveryLauncher>,
    poll_interval: Duration,
    /// Per-request timeout, and run length when no process is launched
    run_timeout: Duration,
    cycle_interval: Option<Duration>,
    in_progress: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl DiscoveryScheduler {
    /// Scheduler that polls `source` without launching a process.
    pub fn new(explorer: Explorer, source: Arc<dyn InstrumentSource>, config: &DiscoveryConfig) -> Self {
        Self {
            explorer,
            source,
            launcher: None,
            poll_interval: config.poll_interval(),
            run_timeout: config.timeout(),
            cycle_interval: config.cycle_interval(),
            in_progress: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    /// Launch the discovery process on every run.
    pub fn with_launcher(mut self, launcher: DiscoveryLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_cycle_interval(mut self, interval: Option<Duration>) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the current run and any periodic re-trigger.
    pub fn shutdown(&self) {
        tracing::debug!("Discovery scheduler shutting down");
        self.cancel.cancel();
    }

    /// Fetch one batch and ingest it. Returns true if it carried new data.
    pub async fn poll_once(&self) -> bool {
        let fetched = match tokio::time::timeout(self.run_timeout, self.source.fetch_batch()).await {
            Ok(fetched) => fetched,
            Err(_) => Err(ExplorerError::Timeout(format!(
                "No discovery reply within {:?}",
                self.run_timeout
            ))),
        };

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Discovery poll failed: {}", e);
                return false;
            }
        };
        if raw.trim().is_empty() {
            return false;
        }

        match self.explorer.ingest(&raw) {
            Ok(summary) => summary.has_new_data(),
            Err(e) => {
                tracing::warn!("Failed to ingest discovery batch: {}", e);
                false
            }
        }
    }

    /// Run one discovery to completion.
    ///
    /// Returns `Ok(false)` without doing anything if a run is already in
    /// progress.
    pub async fn start_discovery(&self) -> Result<bool> {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            tracing::debug!("Discovery already in progress");
            return Ok(false);
        }
        let _guard = RunGuard(&self.in_progress);

        let child = match &self.launcher {
            Some(launcher) => Some(launcher.spawn()?),
            None => None,
        };

        tracing::info!("Instrument discovery in progress...");
        self.explorer.notify(ExplorerEvent::DiscoveryStarted);

        let run = self.cancel.child_token();
        let exited = wait_for_exit(child, self.run_timeout);
        tokio::pin!(exited);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = run.cancelled() => {
                    tracing::info!("Discovery cancelled");
                    break;
                }
                _ = &mut exited => {
                    self.poll_once().await;
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        self.explorer.notify(ExplorerEvent::DiscoveryFinished);
        tracing::info!("Instrument discovery finished");
        Ok(true)
    }

    /// Run discovery now and then on the configured cycle interval until shut down.
    pub async fn run(&self) -> Result<()> {
        loop {
            if let Err(e) = self.start_discovery().await {
                if !e.is_recoverable() {
                    return Err(e);
                }
                tracing::warn!("{}", e);
            }

            let Some(interval) = self.cycle_interval else {
                return Ok(());
            };
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

/// Resolves when the discovery process exits, or after `fallback` when
/// there is no process.
async fn wait_for_exit(child: Option<Child>, fallback: Duration) {
    let Some(mut child) = child else {
        tokio::time::sleep(fallback).await;
        return;
    };
    match child.wait().await {
        Ok(status) => tracing::debug!("Discovery process exited: {}", status),
        Err(e) => tracing::warn!("Failed waiting for discovery process: {}", e),
    }
}

impl std::fmt::Debug for DiscoveryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryScheduler")
            .field("poll_interval", &self.poll_interval)
            .field("in_progress", &self.is_in_progress())
            .finish_non_exhaustive()
    }
}
