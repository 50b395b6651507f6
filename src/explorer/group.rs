//! Transport groups: one grouping node per (transport, provenance) pair.
//!
//! A [`TransportGroup`] holds deduplicated [`InstrumentEntry`] children for
//! one transport and one provenance, plus a parallel member-ID set. The two
//! are kept in 1:1 correspondence by every mutating method.
//!
//! The reconciler operations are permissive: a record routed to the wrong
//! group, an unknown ID or an empty removal list is a no-op, never an error.
//!
//! ```text
//! LAN                          (group, Discovered)
//! +-- 2450#04512345            (entry)
//! |   +-- 10.0.0.5
//! |   +-- Model: 2450
//! |   +-- Port: 5025
//! |   +-- Serial No: 04512345
//! +-- DMM6500#0001
//! ```

use crate::explorer::id::{EntryId, UniqueId};
use crate::types::{InstrumentRecord, Provenance, TransportType};
use std::collections::HashSet;

/// One instrument under a group node.
#[derive(Debug, Clone)]
pub struct InstrumentEntry {
    id: EntryId,
    unique_id: UniqueId,
    record: InstrumentRecord,
    saved: bool,
    label: String,
    details: Vec<String>,
}

impl InstrumentEntry {
    fn new(record: InstrumentRecord, saved: bool) -> Self {
        let mut entry = Self {
            id: EntryId::next(),
            unique_id: record.unique_id(),
            label: record.model_serial(),
            record,
            saved,
            details: Vec::with_capacity(4),
        };
        entry.refresh_details();
        entry
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn unique_id(&self) -> &UniqueId {
        &self.unique_id
    }

    pub fn record(&self) -> &InstrumentRecord {
        &self.record
    }

    /// Whether this entry sits under the Saved grouping.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Informational leaf labels: address, model, port, serial.
    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub(crate) fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    fn refresh_details(&mut self) {
        self.details.clear();
        self.details.push(self.record.address.clone());
        self.details.push(format!("Model: {}", self.record.model));
        self.details.push(format!("Port: {}", self.record.port_label()));
        self.details.push(format!("Serial No: {}", self.record.serial_number));
    }

    /// Swap in a newer observation when its address or port moved.
    ///
    /// The entry keeps its [`EntryId`]. Returns true if anything changed.
    fn update_connection(&mut self, record: &InstrumentRecord) -> bool {
        if self.record.address == record.address && self.record.port == record.port {
            return false;
        }
        self.record = record.clone();
        self.refresh_details();
        true
    }
}

/// Result of [`TransportGroup::add_instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Wrong transport, or the ID is protected
    Ignored,
    /// A new entry was appended
    Added,
    /// An existing entry's address or port was updated in place
    Updated,
    /// Already present with the same connection details
    Unchanged,
}

impl AddOutcome {
    pub fn changed(self) -> bool {
        matches!(self, AddOutcome::Added | AddOutcome::Updated)
    }
}

/// Grouping node for one transport and provenance.
#[derive(Debug, Clone)]
pub struct TransportGroup {
    transport: TransportType,
    provenance: Provenance,
    members: HashSet<UniqueId>,
    entries: Vec<InstrumentEntry>,
    /// IDs that must not be added here (saved instruments, for discovered groups).
    protected: HashSet<UniqueId>,
}

impl TransportGroup {
    pub fn new(transport: TransportType, provenance: Provenance) -> Self {
        Self {
            transport,
            provenance,
            members: HashSet::new(),
            entries: Vec::new(),
            protected: HashSet::new(),
        }
    }

    /// One group per transport, in root order.
    pub fn for_all_transports(provenance: Provenance) -> [TransportGroup; 3] {
        TransportType::ALL.map(|t| TransportGroup::new(t, provenance))
    }

    pub fn transport(&self) -> TransportType {
        self.transport
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn label(&self) -> &'static str {
        self.transport.label()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &UniqueId) -> bool {
        self.members.contains(id)
    }

    pub fn entries(&self) -> &[InstrumentEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &UniqueId) -> Option<&InstrumentEntry> {
        self.entries.iter().find(|e| &e.unique_id == id)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut InstrumentEntry> {
        self.entries.iter_mut()
    }

    /// Merge one observation into the group.
    pub fn add_instrument(&mut self, record: &InstrumentRecord) -> AddOutcome {
        if record.transport != self.transport {
            return AddOutcome::Ignored;
        }

        let id = record.unique_id();
        if self.protected.contains(&id) {
            return AddOutcome::Ignored;
        }

        if self.members.contains(&id) {
            let updated = self
                .entries
                .iter_mut()
                .find(|e| e.unique_id == id)
                .map(|e| e.update_connection(record))
                .unwrap_or(false);
            if updated {
                tracing::debug!("{:?}/{} entry {} moved to {}", self.provenance, self.label(), id, record.address);
                return AddOutcome::Updated;
            }
            return AddOutcome::Unchanged;
        }

        let saved = self.provenance == Provenance::Saved;
        self.members.insert(id);
        self.entries.push(InstrumentEntry::new(record.clone(), saved));
        self.check_invariant();
        AddOutcome::Added
    }

    /// Drop entries whose IDs appear in `ids`. Returns how many were removed.
    pub fn clear_duplicates<'a>(&mut self, ids: impl IntoIterator<Item = &'a UniqueId>) -> usize {
        let before = self.entries.len();
        for id in ids {
            if self.members.remove(id) {
                self.entries.retain(|e| &e.unique_id != id);
            }
        }
        self.check_invariant();
        before - self.entries.len()
    }

    /// Remove one entry. No-op if absent.
    pub fn remove_by_id(&mut self, id: &UniqueId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.entries.retain(|e| &e.unique_id != id);
        self.check_invariant();
        true
    }

    /// Replace the protected set, optionally clearing entries that are now protected.
    pub fn update_saved_list(&mut self, saved: &[UniqueId], clear: bool) {
        if clear {
            let removed = self.clear_duplicates(saved);
            if removed > 0 {
                tracing::debug!("Cleared {} saved duplicate(s) from {:?}/{}", removed, self.provenance, self.label());
            }
        }
        self.protected = saved.iter().cloned().collect();
    }

    #[inline]
    fn check_invariant(&self) {
        debug_assert_eq!(self.members.len(), self.entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lan(address: &str, serial: &str) -> InstrumentRecord {
        InstrumentRecord::new(TransportType::Lan, address, "2450", serial)
    }

    #[test]
    fn test_add_new_instrument() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        assert_eq!(group.add_instrument(&lan("10.0.0.5", "1")), AddOutcome::Added);
        assert_eq!(group.len(), 1);

        let entry = &group.entries()[0];
        assert_eq!(entry.label(), "2450#1");
        assert!(!entry.is_saved());
        assert_eq!(
            entry.details(),
            &["10.0.0.5", "Model: 2450", "Port: NA", "Serial No: 1"]
        );
    }

    #[test]
    fn test_transport_mismatch_ignored() {
        let mut group = TransportGroup::new(TransportType::Usb, Provenance::Discovered);
        assert_eq!(group.add_instrument(&lan("10.0.0.5", "1")), AddOutcome::Ignored);
        assert!(group.is_empty());
    }

    #[test]
    fn test_same_instrument_not_duplicated() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        group.add_instrument(&lan("10.0.0.5", "1"));
        assert_eq!(group.add_instrument(&lan("10.0.0.5", "1")), AddOutcome::Unchanged);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_address_change_updates_in_place() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Saved);
        group.add_instrument(&lan("10.0.0.5", "1"));
        let entry_id = group.entries()[0].id();

        assert_eq!(group.add_instrument(&lan("10.0.0.6", "1")), AddOutcome::Updated);
        assert_eq!(group.len(), 1);

        let entry = &group.entries()[0];
        assert_eq!(entry.id(), entry_id);
        assert_eq!(entry.record().address, "10.0.0.6");
        assert_eq!(entry.details()[0], "10.0.0.6");
        assert!(entry.is_saved());
    }

    #[test]
    fn test_port_change_updates_in_place() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        group.add_instrument(&lan("10.0.0.5", "1"));
        let moved = lan("10.0.0.5", "1").with_port("5030");

        assert_eq!(group.add_instrument(&moved), AddOutcome::Updated);
        assert_eq!(group.entries()[0].details()[2], "Port: 5030");
    }

    #[test]
    fn test_protected_ids_skipped() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        let record = lan("10.0.0.5", "1");
        group.update_saved_list(&[record.unique_id()], false);

        assert_eq!(group.add_instrument(&record), AddOutcome::Ignored);
        assert!(group.is_empty());
    }

    #[test]
    fn test_update_saved_list_clears_duplicates() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        let a = lan("10.0.0.5", "1");
        let b = lan("10.0.0.7", "2");
        group.add_instrument(&a);
        group.add_instrument(&b);

        group.update_saved_list(&[a.unique_id()], true);
        assert_eq!(group.len(), 1);
        assert!(!group.contains(&a.unique_id()));
        assert!(group.contains(&b.unique_id()));

        // Unprotecting lets the instrument back in
        group.update_saved_list(&[], false);
        assert_eq!(group.add_instrument(&a), AddOutcome::Added);
    }

    #[test]
    fn test_clear_duplicates_multiple() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Discovered);
        let records: Vec<_> = (0..4).map(|i| lan("10.0.0.1", &i.to_string())).collect();
        for r in &records {
            group.add_instrument(r);
        }

        let ids = [records[0].unique_id(), records[2].unique_id(), UniqueId::new(TransportType::Lan, "x", "y")];
        assert_eq!(group.clear_duplicates(&ids), 2);
        assert_eq!(group.len(), 2);
        assert_eq!(group.entries()[0].unique_id(), &records[1].unique_id());
        assert_eq!(group.entries()[1].unique_id(), &records[3].unique_id());
    }

    #[test]
    fn test_remove_by_id() {
        let mut group = TransportGroup::new(TransportType::Lan, Provenance::Saved);
        let record = lan("10.0.0.5", "1");
        group.add_instrument(&record);

        assert!(group.remove_by_id(&record.unique_id()));
        assert!(!group.remove_by_id(&record.unique_id()));
        assert!(group.is_empty());
    }
}
