//! Instrument discovery
//!
//! Discovery is delegated to an external executable that scans the
//! configured transports and serves what it has found so far over JSON-RPC.
//! This module launches that process, polls it for batches and feeds each
//! batch into the [`Explorer`](crate::explorer::Explorer).
//!
//! - [`InstrumentSource`] - anything that can produce a raw batch
//! - [`rpc::RpcInstrumentSource`] - JSON-RPC `get_instr_list` client
//! - [`launcher::DiscoveryLauncher`] - discovery process arguments and spawn
//! - [`scheduler::DiscoveryScheduler`] - single-flight polling loop

pub mod launcher;
pub mod rpc;
pub mod scheduler;

pub use launcher::DiscoveryLauncher;
pub use rpc::RpcInstrumentSource;
pub use scheduler::DiscoveryScheduler;

use crate::error::Result;
use async_trait::async_trait;

/// Producer of raw discovery batches
///
/// A batch is newline-delimited JSON, one instrument record per line. An
/// empty string means nothing is available yet.
#[async_trait]
pub trait InstrumentSource: Send + Sync {
    /// Fetch the current batch
    async fn fetch_batch(&self) -> Result<String>;
}
