//! Read-only tree projection for viewers.
//!
//! [`TreeNode`] is an owned snapshot of the reconciled state. Each node
//! carries a [`NodeKind`] discriminant, so a viewer handing a node back to
//! the model (save, remove, rename) is resolved by pattern matching on the
//! kind rather than by guessing at the node's concrete type.
//!
//! ```text
//! Saved                        (SavedRoot)
//! +-- LAN                      (Group, Saved)
//!     +-- bench smu            (Instrument, saved)
//!         +-- 10.0.0.6         (Detail)
//!         +-- Model: 2450      (Detail)
//! LAN                          (Group, Discovered)
//! +-- DMM6500#0001             (Instrument)
//! ```

use crate::explorer::group::{InstrumentEntry, TransportGroup};
use crate::explorer::id::{EntryId, UniqueId};
use crate::types::{InstrumentRecord, Provenance, TransportType};
use std::fmt::Write as _;

/// Label of the saved super-node
pub const SAVED_ROOT_LABEL: &str = "Saved";

/// What a tree node represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The single "Saved" super-node
    SavedRoot,
    /// A transport grouping
    Group {
        transport: TransportType,
        provenance: Provenance,
    },
    /// One instrument
    Instrument {
        entry: EntryId,
        record: InstrumentRecord,
        saved: bool,
    },
    /// Informational leaf under an instrument
    Detail,
}

/// How a viewer should initially present a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsibleState {
    None,
    Collapsed,
    Expanded,
}

/// A labelled node with zero or more children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    label: String,
    expandable: bool,
    kind: NodeKind,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn detail(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            expandable: false,
            kind: NodeKind::Detail,
            children: Vec::new(),
        }
    }

    pub(crate) fn from_entry(entry: &InstrumentEntry) -> Self {
        Self {
            label: entry.label().to_string(),
            expandable: false,
            kind: NodeKind::Instrument {
                entry: entry.id(),
                record: entry.record().clone(),
                saved: entry.is_saved(),
            },
            children: entry.details().iter().map(|d| TreeNode::detail(d.as_str())).collect(),
        }
    }

    pub(crate) fn from_group(group: &TransportGroup) -> Self {
        Self {
            label: group.label().to_string(),
            expandable: true,
            kind: NodeKind::Group {
                transport: group.transport(),
                provenance: group.provenance(),
            },
            children: group.entries().iter().map(TreeNode::from_entry).collect(),
        }
    }

    pub(crate) fn saved_root(groups: Vec<TreeNode>) -> Self {
        Self {
            label: SAVED_ROOT_LABEL.to_string(),
            expandable: true,
            kind: NodeKind::SavedRoot,
            children: groups,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Expanded for populated groups, collapsed for instruments, none for leaves.
    pub fn collapsible_state(&self) -> CollapsibleState {
        if self.children.is_empty() {
            CollapsibleState::None
        } else if self.expandable {
            CollapsibleState::Expanded
        } else {
            CollapsibleState::Collapsed
        }
    }

    /// Instrument record, for instrument nodes.
    pub fn instrument(&self) -> Option<&InstrumentRecord> {
        match &self.kind {
            NodeKind::Instrument { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn unique_id(&self) -> Option<UniqueId> {
        self.instrument().map(InstrumentRecord::unique_id)
    }

    /// Context value selecting the viewer's action menu.
    ///
    /// `NotSaved` or `ToRemove`, followed by `VersatestInstr` or `RegInstr`.
    pub fn context_value(&self) -> Option<String> {
        let NodeKind::Instrument { record, saved, .. } = &self.kind else {
            return None;
        };
        let state = if *saved { "ToRemove" } else { "NotSaved" };
        let family = if record.is_versatest() {
            "VersatestInstr"
        } else {
            "RegInstr"
        };
        Some(format!("{}{}", state, family))
    }

    /// Depth-first search for an instrument node.
    pub fn find(&self, id: &UniqueId) -> Option<&TreeNode> {
        if self.unique_id().as_ref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), self.label);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Children of `node`.
pub fn get_children(node: &TreeNode) -> &[TreeNode] {
    node.children()
}

/// Find an instrument node anywhere in a forest.
pub fn find_in(roots: &[TreeNode], id: &UniqueId) -> Option<TreeNode> {
    roots.iter().find_map(|r| r.find(id)).cloned()
}

/// Indented text rendering of a forest, one node per line.
pub fn render(roots: &[TreeNode]) -> String {
    let mut out = String::new();
    for root in roots {
        root.render_into(&mut out, 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lan_group(records: &[InstrumentRecord], provenance: Provenance) -> TransportGroup {
        let mut group = TransportGroup::new(TransportType::Lan, provenance);
        for r in records {
            group.add_instrument(r);
        }
        group
    }

    #[test]
    fn test_group_projection() {
        let record = InstrumentRecord::new(TransportType::Lan, "10.0.0.5", "2450", "1");
        let node = TreeNode::from_group(&lan_group(&[record.clone()], Provenance::Discovered));

        assert_eq!(node.label(), "LAN");
        assert_eq!(node.collapsible_state(), CollapsibleState::Expanded);
        assert_eq!(node.children().len(), 1);

        let instr = &node.children()[0];
        assert_eq!(instr.label(), "2450#1");
        assert_eq!(instr.collapsible_state(), CollapsibleState::Collapsed);
        assert_eq!(instr.instrument(), Some(&record));
        assert_eq!(get_children(instr).len(), 4);
        assert_eq!(instr.children()[0].collapsible_state(), CollapsibleState::None);
    }

    #[test]
    fn test_context_values() {
        let reg = InstrumentRecord::new(TransportType::Lan, "10.0.0.5", "2450", "1");
        let vt = InstrumentRecord::new(TransportType::Lan, "10.0.0.9", "VERSATEST-600", "2");

        let discovered = TreeNode::from_group(&lan_group(&[reg.clone(), vt.clone()], Provenance::Discovered));
        assert_eq!(discovered.children()[0].context_value().as_deref(), Some("NotSavedRegInstr"));
        assert_eq!(discovered.children()[1].context_value().as_deref(), Some("NotSavedVersatestInstr"));

        let saved = TreeNode::from_group(&lan_group(&[reg], Provenance::Saved));
        assert_eq!(saved.children()[0].context_value().as_deref(), Some("ToRemoveRegInstr"));
        assert_eq!(saved.context_value(), None);
    }

    #[test]
    fn test_find_and_render() {
        let record = InstrumentRecord::new(TransportType::Lan, "10.0.0.5", "2450", "1");
        let group = TreeNode::from_group(&lan_group(&[record.clone()], Provenance::Saved));
        let roots = vec![TreeNode::saved_root(vec![group])];

        let found = find_in(&roots, &record.unique_id()).unwrap();
        assert!(matches!(found.kind(), NodeKind::Instrument { saved: true, .. }));

        let text = render(&roots);
        assert!(text.starts_with("Saved\n  LAN\n    2450#1\n      10.0.0.5\n"));
    }
}
