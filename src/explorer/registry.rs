//! Saved-set registry.
//!
//! The ordered set of [`UniqueId`]s the user has chosen to keep. Membership
//! here is the only thing that decides whether an instrument shows up under
//! the Saved grouping, so the registry also owns the three saved-provenance
//! [`TransportGroup`]s and keeps them in step with removals.

use crate::explorer::group::{AddOutcome, TransportGroup};
use crate::explorer::id::UniqueId;
use crate::types::{InstrumentRecord, Provenance, TransportType};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SavedRegistry {
    order: Vec<UniqueId>,
    members: HashSet<UniqueId>,
    groups: [TransportGroup; 3],
}

impl Default for SavedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SavedRegistry {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
            groups: TransportGroup::for_all_transports(Provenance::Saved),
        }
    }

    /// Insert `id` if absent. Returns true if it was new.
    pub fn save(&mut self, id: UniqueId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Delete `id` and its saved-group entry. Returns true if it was a member.
    pub fn remove(&mut self, id: &UniqueId) -> bool {
        let was_member = self.members.remove(id);
        if was_member {
            self.order.retain(|saved| saved != id);
        }

        match id.transport() {
            Some(transport) => {
                self.groups[transport.index()].remove_by_id(id);
            }
            None => tracing::warn!("Saved ID {} has no recognizable transport tag", id),
        }

        was_member
    }

    pub fn contains(&self, id: &UniqueId) -> bool {
        self.members.contains(id)
    }

    /// Snapshot of the saved IDs, in save order.
    pub fn list(&self) -> Vec<UniqueId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Project a saved record into its transport's saved group.
    ///
    /// Records that are not registry members are ignored.
    pub fn project(&mut self, record: &InstrumentRecord) -> AddOutcome {
        if !self.contains(&record.unique_id()) {
            return AddOutcome::Ignored;
        }
        self.groups[record.transport.index()].add_instrument(record)
    }

    pub fn group(&self, transport: TransportType) -> &TransportGroup {
        &self.groups[transport.index()]
    }

    pub(crate) fn group_mut(&mut self, transport: TransportType) -> &mut TransportGroup {
        &mut self.groups[transport.index()]
    }

    /// Saved groups in root order.
    pub fn groups(&self) -> &[TransportGroup; 3] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(transport: TransportType, serial: &str) -> InstrumentRecord {
        InstrumentRecord::new(transport, "10.0.0.5", "2450", serial)
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut registry = SavedRegistry::new();
        let id = UniqueId::new(TransportType::Lan, "2450", "1");

        assert!(registry.save(id.clone()));
        assert!(!registry.save(id.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list(), vec![id]);
    }

    #[test]
    fn test_list_keeps_save_order() {
        let mut registry = SavedRegistry::new();
        let ids: Vec<_> = ["c", "a", "b"]
            .iter()
            .map(|s| UniqueId::new(TransportType::Usb, "DMM6500", s))
            .collect();
        for id in &ids {
            registry.save(id.clone());
        }
        assert_eq!(registry.list(), ids);
    }

    #[test]
    fn test_project_requires_membership() {
        let mut registry = SavedRegistry::new();
        let r = record(TransportType::Lan, "1");

        assert_eq!(registry.project(&r), AddOutcome::Ignored);
        registry.save(r.unique_id());
        assert_eq!(registry.project(&r), AddOutcome::Added);
        assert_eq!(registry.group(TransportType::Lan).len(), 1);
        assert!(registry.group(TransportType::Usb).is_empty());
    }

    #[test]
    fn test_remove_propagates_to_group() {
        let mut registry = SavedRegistry::new();
        let r = record(TransportType::Visa, "7");
        registry.save(r.unique_id());
        registry.project(&r);

        assert!(registry.remove(&r.unique_id()));
        assert!(registry.is_empty());
        assert!(registry.group(TransportType::Visa).is_empty());

        // Second removal is a no-op
        assert!(!registry.remove(&r.unique_id()));
    }
}
