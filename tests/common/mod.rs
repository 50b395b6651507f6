//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use instrument_explorer::config::MemoryStore;
use instrument_explorer::explorer::{DiscoveryModel, TreeNode};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Model backed by a shared in-memory store
pub fn memory_model(store: &MemoryStore) -> DiscoveryModel {
    DiscoveryModel::new(Box::new(store.clone()))
}

/// Labels of a list of nodes
pub fn labels(nodes: &[TreeNode]) -> Vec<String> {
    nodes.iter().map(|n| n.label().to_string()).collect()
}

/// Labels of every instrument node under `root`, depth first
pub fn instrument_labels(root: &TreeNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_instruments(root, &mut out);
    out
}

fn collect_instruments(node: &TreeNode, out: &mut Vec<String>) {
    if node.instrument().is_some() {
        out.push(node.label().to_string());
        return;
    }
    for child in node.children() {
        collect_instruments(child, out);
    }
}
