//! Identity types for the instrument tree.
//!
//! [`UniqueId`] is the stable key of a physical instrument,
//! `transport:model#serial`. Two records describe the same instrument iff
//! their unique IDs are equal, whatever their addresses.
//!
//! [`EntryId`] names one entry node inside a group. It survives in-place
//! record updates so a viewer can keep selection state across refreshes.

use crate::types::{InstrumentRecord, TransportType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity key: `transport:model#serial`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn new(transport: TransportType, model: &str, serial_number: &str) -> Self {
        Self(format!("{}:{}#{}", transport.tag(), model, serial_number))
    }

    /// Derive the key of a record.
    pub fn of(record: &InstrumentRecord) -> Self {
        Self::new(record.transport, &record.model, &record.serial_number)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Transport encoded in the key, if the tag is recognizable.
    pub fn transport(&self) -> Option<TransportType> {
        self.0
            .split_once(':')
            .and_then(|(tag, _)| TransportType::from_tag(tag))
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({})", self.0)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&InstrumentRecord> for UniqueId {
    fn from(record: &InstrumentRecord) -> Self {
        Self::of(record)
    }
}

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// Handle of one instrument entry node, unique for the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
