//! Instrument tree model.
//!
//! Reconciles repeated, unordered discovery batches with the user's saved
//! instruments and projects the result into a tree:
//!
//! - [`id`] - identity of instruments and entry nodes
//! - [`group`] - per-transport grouping nodes and their reconciler
//! - [`registry`] - the saved-set registry
//! - [`model`] - the discovery model state machine
//! - [`tree`] - read-only tree projection for viewers
//! - [`handle`] - mutex-guarded shared handle and viewer events

pub mod group;
pub mod handle;
pub mod id;
pub mod model;
pub mod registry;
pub mod tree;

pub use group::{AddOutcome, InstrumentEntry, TransportGroup};
pub use handle::{connection_args, Explorer, ExplorerEvent};
pub use id::{EntryId, UniqueId};
pub use model::{CycleState, DiscoveryModel, IngestSummary};
pub use registry::SavedRegistry;
pub use tree::{find_in, get_children, render, CollapsibleState, NodeKind, TreeNode};
