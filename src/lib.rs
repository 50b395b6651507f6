//! # Instrument Explorer
//!
//! Discovery, reconciliation and persistence of networked test instruments.
//! An external discovery service reports instruments as batches of JSON
//! records; the explorer merges those batches into a deduplicated model,
//! carries address changes over to the user's saved instruments, and
//! projects everything into a tree grouped by transport.
//!
//! ## Architecture
//!
//! - **Explorer**: The reconciliation model and its tree projection, behind a
//!   mutex-guarded shared handle
//! - **Discovery**: Launches the discovery process and polls it over JSON-RPC
//!   on a tokio runtime
//! - **Persistence**: Saved instruments live in a JSON settings file
//! - **Communication**: Crossbeam channels notify viewers when the tree changes
//!
//! ## Configuration
//!
//! Settings and logs are stored in the platform-appropriate data directory
//! under `dev.hxyulin.instrument-explorer`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.instrument-explorer/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.instrument-explorer/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.instrument-explorer\`
//!
//! ## Example
//!
//! ```ignore
//! use instrument_explorer::{
//!     config::{AppConfig, MemoryStore},
//!     explorer::{DiscoveryModel, Explorer},
//! };
//!
//! let model = DiscoveryModel::new(Box::new(MemoryStore::new()));
//! let (explorer, events) = Explorer::new(model);
//!
//! explorer.ingest(r#"{"io_type":"Lan","instr_address":"10.0.0.5","model":"2450","serial_number":"1"}"#)?;
//! print!("{}", explorer.render()?);
//! ```

pub mod actions;
pub mod config;
pub mod discovery;
pub mod error;
pub mod explorer;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DiscoveryConfig};
pub use discovery::{DiscoveryScheduler, InstrumentSource};
pub use error::{ExplorerError, Result};
pub use explorer::{DiscoveryModel, Explorer, ExplorerEvent, TreeNode, UniqueId};
pub use types::{InstrumentRecord, Provenance, TransportType};
