//! Discovery model: the reconciliation state machine.
//!
//! The model owns the current discovery list, the connection ("known") list,
//! the saved-set registry and the discovered-provenance groups. One
//! discovery cycle runs:
//!
//! ```text
//! Idle -> ingest_batch -> Merged -> reconcile_saved_address_drift
//!      -> compose_roots -> Projected -> Idle
//! ```
//!
//! # Invariants
//!
//! - No two records in the discovery list share a [`UniqueId`].
//! - An instrument in the registry is shown under Saved only, never also
//!   under a discovered group.
//! - Persistence failures never roll back in-memory state; the in-memory
//!   lists are authoritative for the session and the write is retried by the
//!   next mutating operation.
//!
//! The model is not internally synchronized. Shared use goes through
//! [`crate::explorer::Explorer`], which serializes every operation on one mutex.

use crate::config::store::{SavedInstrumentStore, SettingsStore};
use crate::error::{ExplorerError, Result, ResultExt};
use crate::explorer::group::{AddOutcome, TransportGroup};
use crate::explorer::id::UniqueId;
use crate::explorer::registry::SavedRegistry;
use crate::explorer::tree::{NodeKind, TreeNode};
use crate::types::{InstrumentRecord, Provenance, TransportType};
use std::collections::hash_map::{Entry, HashMap};

/// Where the model is within a discovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    BatchReceived,
    Merged,
    Projected,
}

/// Counts from one [`DiscoveryModel::ingest_batch`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    /// Records not seen before
    pub added: usize,
    /// Known records whose address changed
    pub updated: usize,
    /// Known records with no change
    pub unchanged: usize,
    /// Lines that failed to parse
    pub skipped: usize,
}

impl IngestSummary {
    pub fn has_new_data(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}

pub struct DiscoveryModel {
    discovery_list: Vec<InstrumentRecord>,
    connection_list: Vec<InstrumentRecord>,
    registry: SavedRegistry,
    discovered: [TransportGroup; 3],
    store: SavedInstrumentStore,
    new_data: bool,
    state: CycleState,
    roots: Vec<TreeNode>,
}

impl DiscoveryModel {
    /// Create a model seeded from the persisted saved-instrument list.
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        let mut model = Self {
            discovery_list: Vec::new(),
            connection_list: Vec::new(),
            registry: SavedRegistry::new(),
            discovered: TransportGroup::for_all_transports(Provenance::Discovered),
            store: SavedInstrumentStore::new(store),
            new_data: false,
            state: CycleState::Idle,
            roots: Vec::new(),
        };
        model.load_persisted();
        model
    }

    fn load_persisted(&mut self) {
        let saved = match self.store.load() {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Failed to load saved instruments, starting empty: {}", e);
                return;
            }
        };

        for record in saved {
            self.registry.save(record.unique_id());
            self.upsert_connection(record);
        }

        let saved_ids = self.registry.list();
        for group in &mut self.discovered {
            group.update_saved_list(&saved_ids, false);
        }
        tracing::info!("Loaded {} saved instrument(s)", self.registry.len());
    }

    // ==================== Accessors ====================

    pub fn discovery_list(&self) -> &[InstrumentRecord] {
        &self.discovery_list
    }

    pub fn connection_list(&self) -> &[InstrumentRecord] {
        &self.connection_list
    }

    pub fn registry(&self) -> &SavedRegistry {
        &self.registry
    }

    pub fn discovered_group(&self, transport: TransportType) -> &TransportGroup {
        &self.discovered[transport.index()]
    }

    pub fn saved_group(&self, transport: TransportType) -> &TransportGroup {
        self.registry.group(transport)
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Whether a batch added or moved anything since the flag was last taken.
    pub fn has_new_data(&self) -> bool {
        self.new_data
    }

    /// Read and clear the new-data flag.
    pub fn take_new_data(&mut self) -> bool {
        std::mem::take(&mut self.new_data)
    }

    // ==================== Discovery ====================

    /// Merge one batch of newline-delimited JSON records.
    ///
    /// Malformed lines are logged and skipped; the rest of the batch still
    /// applies. When a batch reports one instrument more than once, only its
    /// last observation is merged.
    pub fn ingest_batch(&mut self, raw: &str) -> IngestSummary {
        self.state = CycleState::BatchReceived;
        let mut summary = IngestSummary::default();

        let mut batch: Vec<InstrumentRecord> = Vec::new();
        let mut positions: HashMap<UniqueId, usize> = HashMap::new();
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match InstrumentRecord::from_json_line(line) {
                Ok(record) => match positions.entry(record.unique_id()) {
                    Entry::Occupied(slot) => batch[*slot.get()] = record,
                    Entry::Vacant(slot) => {
                        slot.insert(batch.len());
                        batch.push(record);
                    }
                },
                Err(e) => {
                    tracing::warn!("Skipping discovery record: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        for record in batch {
            self.merge_discovered(record, &mut summary);
        }
        self.finish_ingest(summary)
    }

    fn finish_ingest(&mut self, summary: IngestSummary) -> IngestSummary {
        if summary.has_new_data() {
            self.new_data = true;
        }
        self.state = CycleState::Merged;
        tracing::debug!(
            "Ingested batch: {} new, {} moved, {} unchanged, {} skipped",
            summary.added,
            summary.updated,
            summary.unchanged,
            summary.skipped
        );
        summary
    }

    fn merge_discovered(&mut self, record: InstrumentRecord, summary: &mut IngestSummary) {
        match self
            .discovery_list
            .iter()
            .position(|known| known.same_instrument(&record))
        {
            Some(idx) if self.discovery_list[idx].address != record.address => {
                tracing::trace!(
                    "{} moved {} -> {}",
                    record.unique_id(),
                    self.discovery_list[idx].address,
                    record.address
                );
                self.discovery_list[idx] = record;
                summary.updated += 1;
            }
            Some(_) => summary.unchanged += 1,
            None => {
                tracing::trace!("Discovered {} at {}", record.unique_id(), record.address);
                self.discovery_list.push(record);
                summary.added += 1;
            }
        }
    }

    /// Carry new addresses of discovered instruments over to saved ones.
    ///
    /// Every moved entry is written through to persistence. All in-memory
    /// updates are applied even if a write fails; the first write error is
    /// returned. Returns the number of saved instruments that moved.
    pub fn reconcile_saved_address_drift(&mut self) -> Result<usize> {
        let mut moved = 0;
        let mut first_error: Option<ExplorerError> = None;

        for discovered in &self.discovery_list {
            let Some(saved) = self
                .connection_list
                .iter_mut()
                .find(|c| c.same_instrument(discovered) && c.address != discovered.address)
            else {
                continue;
            };

            tracing::info!(
                "Saved instrument {} moved {} -> {}",
                saved.unique_id(),
                saved.address,
                discovered.address
            );
            saved.address = discovered.address.clone();
            moved += 1;

            if let Err(e) = self.store.persist(saved) {
                tracing::warn!("Failed to persist new address of {}: {}", saved.unique_id(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.with_context("Saving moved instrument addresses")),
            None => Ok(moved),
        }
    }

    /// Build the root forest: Saved, then LAN, USB, VISA, each omitted when empty.
    pub fn compose_roots(&mut self) -> &[TreeNode] {
        let mut roots = Vec::with_capacity(1 + TransportType::ALL.len());

        for record in &self.connection_list {
            self.registry.project(record);
        }
        self.apply_saved_labels();

        let saved_groups: Vec<TreeNode> = self
            .registry
            .groups()
            .iter()
            .filter(|g| !g.is_empty())
            .map(TreeNode::from_group)
            .collect();
        if !saved_groups.is_empty() {
            roots.push(TreeNode::saved_root(saved_groups));
        }

        let saved_ids = self.registry.list();
        for group in &mut self.discovered {
            group.update_saved_list(&saved_ids, true);
            for record in &self.discovery_list {
                group.add_instrument(record);
            }
            if !group.is_empty() {
                roots.push(TreeNode::from_group(group));
            }
        }

        self.roots = roots;
        self.state = CycleState::Projected;
        &self.roots
    }

    /// Drift reconciliation followed by composition, for viewers.
    ///
    /// A persistence failure during drift reconciliation is logged; the
    /// in-memory addresses are still used for the projection.
    pub fn roots(&mut self) -> Vec<TreeNode> {
        if let Err(e) = self.reconcile_saved_address_drift() {
            tracing::warn!("{}", e);
        }
        let roots = self.compose_roots().to_vec();
        self.state = CycleState::Idle;
        roots
    }

    fn apply_saved_labels(&mut self) {
        for transport in TransportType::ALL {
            for entry in self.registry.group_mut(transport).entries_mut() {
                let label = self
                    .connection_list
                    .iter()
                    .find(|c| &c.unique_id() == entry.unique_id())
                    .map(|c| c.friendly_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| entry.record().model_serial());
                entry.set_label(label);
            }
        }
    }

    // ==================== Saving ====================

    /// Add or update a connection-list entry by unique ID.
    ///
    /// A known instrument is replaced when its address or port moved;
    /// otherwise only its friendly name is refreshed.
    fn upsert_connection(&mut self, record: InstrumentRecord) -> AddOutcome {
        match self
            .connection_list
            .iter_mut()
            .find(|known| known.same_instrument(&record))
        {
            None => {
                self.connection_list.push(record);
                AddOutcome::Added
            }
            Some(known) if known.address != record.address || known.port != record.port => {
                *known = record;
                AddOutcome::Updated
            }
            Some(known) => {
                if !record.friendly_name.is_empty() && known.friendly_name != record.friendly_name {
                    known.friendly_name = record.friendly_name;
                    return AddOutcome::Updated;
                }
                AddOutcome::Unchanged
            }
        }
    }

    fn refresh_saved_list(&mut self, transport: TransportType, clear: bool) {
        let saved_ids = self.registry.list();
        self.discovered[transport.index()].update_saved_list(&saved_ids, clear);
    }

    /// Save an instrument the user connected to.
    ///
    /// Registers the ID, upserts the connection list, writes through to
    /// persistence and removes the now-saved instrument from its discovered
    /// group. A persistence failure is returned after all in-memory steps.
    pub fn add_from_connect(&mut self, mut record: InstrumentRecord) -> Result<()> {
        record.fill_defaults();
        let id = record.unique_id();
        tracing::debug!("Saving {} at {}", id, record.address);

        self.registry.save(id.clone());
        self.upsert_connection(record.clone());
        let persisted = self.store.persist(&record);

        self.refresh_saved_list(record.transport, true);
        self.registry.project(&record);

        persisted
            .map(|_| ())
            .with_context(|| format!("Persisting saved instrument {}", id))
    }

    /// Save the instrument behind a tree node.
    ///
    /// Returns false when the node is not an instrument.
    pub fn add_from_tree_selection(&mut self, node: &TreeNode) -> Result<bool> {
        let NodeKind::Instrument { record, .. } = node.kind() else {
            tracing::debug!("Ignoring save of non-instrument node {:?}", node.label());
            return Ok(false);
        };

        let mut record = record.clone();
        if !self.registry.contains(&record.unique_id()) {
            record.friendly_name = record.model_serial();
        } else if let Some(known) = self.connection_list.iter().find(|c| c.same_instrument(&record)) {
            record.friendly_name = known.friendly_name.clone();
        }

        self.add_from_connect(record)?;
        Ok(true)
    }

    // ==================== Removal ====================

    /// Forget a saved instrument.
    ///
    /// Removes it from the connection list, the registry (and its saved
    /// group) and persistence, in that order. Each step tolerates the
    /// instrument already being gone. Returns true if anything was removed
    /// from memory.
    pub fn remove_saved(&mut self, record: &InstrumentRecord) -> Result<bool> {
        let id = record.unique_id();

        let in_connections = match self
            .connection_list
            .iter()
            .position(|known| known.same_instrument(record))
        {
            Some(idx) => {
                self.connection_list.remove(idx);
                true
            }
            None => false,
        };

        let in_registry = self.registry.remove(&id);
        self.refresh_saved_list(record.transport, false);

        self.store
            .remove(record)
            .with_context(|| format!("Removing saved instrument {}", id))?;

        tracing::debug!("Removed saved instrument {}", id);
        Ok(in_connections || in_registry)
    }

    /// Forget the saved instrument behind a tree node.
    pub fn remove_from_saved(&mut self, node: &TreeNode) -> Result<bool> {
        match node.instrument() {
            Some(record) => self.remove_saved(record),
            None => Ok(false),
        }
    }

    /// Forget a saved instrument by ID.
    pub fn remove_saved_by_id(&mut self, id: &UniqueId) -> Result<bool> {
        let Some(record) = self.connection_list.iter().find(|c| &c.unique_id() == id).cloned() else {
            // Still drop a dangling registry entry
            return Ok(self.registry.remove(id));
        };
        self.remove_saved(&record)
    }

    // ==================== Renaming ====================

    /// Set the friendly name of an instrument.
    ///
    /// Saved instruments are renamed in place and written through; a
    /// discovered instrument is saved under the new name. Blank names are
    /// ignored.
    pub fn rename(&mut self, id: &UniqueId, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }

        if let Some(saved) = self.connection_list.iter_mut().find(|c| &c.unique_id() == id) {
            saved.friendly_name = name.to_string();
            let record = saved.clone();
            self.store
                .persist(&record)
                .with_context(|| format!("Renaming {}", id))?;
            return Ok(true);
        }

        let Some(discovered) = self.discovery_list.iter().find(|d| &d.unique_id() == id) else {
            return Err(ExplorerError::UnknownInstrument(id.to_string()));
        };
        let record = discovered.clone().with_friendly_name(name);
        self.add_from_connect(record)?;
        Ok(true)
    }
}

impl std::fmt::Debug for DiscoveryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryModel")
            .field("discovered", &self.discovery_list.len())
            .field("connections", &self.connection_list.len())
            .field("saved", &self.registry.len())
            .field("state", &self.state)
            .finish()
    }
}
