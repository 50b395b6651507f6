//! Shared handle over the discovery model.
//!
//! [`Explorer`] is the thread boundary between the discovery side (scheduler
//! tasks feeding batches) and viewers (reading roots, issuing save / remove /
//! rename). Every operation takes the model lock exactly once, so a batch
//! ingest and a save can never interleave. Viewers are told to re-read the
//! tree through [`ExplorerEvent`]s on a crossbeam channel.

use crate::error::{ExplorerError, Result};
use crate::explorer::id::UniqueId;
use crate::explorer::model::{DiscoveryModel, IngestSummary};
use crate::explorer::tree::{self, NodeKind, TreeNode};
use crate::types::{IdnInfo, TransportType};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

/// Notifications sent to viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEvent {
    /// The projected tree changed; re-read the roots.
    TreeChanged,
    /// A discovery run started.
    DiscoveryStarted,
    /// The discovery run finished (process exited or was cancelled).
    DiscoveryFinished,
}

/// Cloneable, thread-safe handle to a [`DiscoveryModel`].
#[derive(Clone)]
pub struct Explorer {
    model: Arc<Mutex<DiscoveryModel>>,
    events: Sender<ExplorerEvent>,
}

impl Explorer {
    /// Wrap a model, returning the handle and the viewer event receiver.
    pub fn new(model: DiscoveryModel) -> (Self, Receiver<ExplorerEvent>) {
        let (events, rx) = unbounded();
        let explorer = Self {
            model: Arc::new(Mutex::new(model)),
            events,
        };
        (explorer, rx)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DiscoveryModel>> {
        self.model
            .lock()
            .map_err(|e| ExplorerError::LockPoisoned(e.to_string()))
    }

    /// Run `f` with exclusive access to the model.
    pub fn with_model<R>(&self, f: impl FnOnce(&mut DiscoveryModel) -> R) -> Result<R> {
        let mut model = self.lock()?;
        Ok(f(&mut model))
    }

    /// Send an event to viewers. A dropped receiver is not an error.
    pub fn notify(&self, event: ExplorerEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No viewer listening for explorer events");
        }
    }

    /// Send [`ExplorerEvent::TreeChanged`] if an operation changed the model.
    ///
    /// A recoverable error comes from the write-through, which runs after the
    /// in-memory change, so it still counts as a change.
    fn notify_on_change<T>(&self, outcome: &Result<T>, changed: impl FnOnce(&T) -> bool) {
        let changed = match outcome {
            Ok(value) => changed(value),
            Err(e) => e.is_recoverable(),
        };
        if changed {
            self.notify(ExplorerEvent::TreeChanged);
        }
    }

    /// Ingest one discovery batch and reconcile saved addresses.
    ///
    /// Viewers are notified when the batch added or moved an instrument.
    pub fn ingest(&self, raw: &str) -> Result<IngestSummary> {
        let (summary, new_data) = {
            let mut model = self.lock()?;
            let summary = model.ingest_batch(raw);
            if let Err(e) = model.reconcile_saved_address_drift() {
                tracing::warn!("{}", e);
            }
            (summary, model.take_new_data())
        };

        if new_data {
            self.notify(ExplorerEvent::TreeChanged);
        }
        Ok(summary)
    }

    /// Current root forest.
    pub fn roots(&self) -> Result<Vec<TreeNode>> {
        Ok(self.lock()?.roots())
    }

    /// Text rendering of the current forest.
    pub fn render(&self) -> Result<String> {
        Ok(tree::render(&self.roots()?))
    }

    /// Save the instrument behind a selected tree node.
    pub fn save_instrument(&self, node: &TreeNode) -> Result<bool> {
        let saved = self.lock()?.add_from_tree_selection(node);
        self.notify_on_change(&saved, |saved| *saved);
        saved
    }

    /// Save an instrument identified while opening a connection.
    ///
    /// `idn_json` is the identification reply (`vendor`, `model`,
    /// `serial_number`, `firmware_rev`).
    pub fn save_while_connect(
        &self,
        address: &str,
        transport: TransportType,
        idn_json: &str,
        friendly_name: &str,
        port: Option<String>,
    ) -> Result<()> {
        let record = IdnInfo::from_json(idn_json)?.into_record(transport, address, port, friendly_name);
        let saved = self.lock()?.add_from_connect(record);
        self.notify_on_change(&saved, |_| true);
        saved
    }

    /// Remove the saved instrument behind a tree node.
    pub fn remove_instrument(&self, node: &TreeNode) -> Result<bool> {
        let removed = self.lock()?.remove_from_saved(node);
        self.notify_on_change(&removed, |removed| *removed);
        removed
    }

    /// Rename the instrument behind a tree node. Blank names are ignored.
    pub fn rename(&self, node: &TreeNode, name: &str) -> Result<bool> {
        let Some(id) = node.unique_id() else {
            return Ok(false);
        };
        self.rename_id(&id, name)
    }

    /// Rename by unique ID.
    pub fn rename_id(&self, id: &UniqueId, name: &str) -> Result<bool> {
        if name.trim().is_empty() {
            return Ok(false);
        }
        let renamed = self.lock()?.rename(id, name);
        self.notify_on_change(&renamed, |renamed| *renamed);
        renamed
    }
}

/// Connection string for an instrument node: `label@address`, plus
/// `model#serial` for USB and VISA instruments.
pub fn connection_args(node: &TreeNode) -> Option<(String, Option<String>)> {
    let NodeKind::Instrument { record, .. } = node.kind() else {
        return None;
    };
    let conn = format!("{}@{}", node.label(), record.address);
    let model_serial = match record.transport {
        TransportType::Lan => None,
        TransportType::Usb | TransportType::Visa => Some(record.model_serial()),
    };
    Some((conn, model_serial))
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer").finish_non_exhaustive()
    }
}
