//! Core data types for the instrument explorer
//!
//! This module contains the record shape shared by the discovery service, the
//! persistence store and the tree model.
//!
//! # Main Types
//!
//! - [`TransportType`] - Connection medium (LAN, USB, VISA bus)
//! - [`Provenance`] - Whether a grouping holds discovered or saved instruments
//! - [`InstrumentRecord`] - One observed or saved instrument
//! - [`IdnInfo`] - Identification reply captured while connecting
//!
//! # Wire Format
//!
//! Records travel as JSON objects using the discovery service's field names:
//!
//! ```text
//! {"io_type":"Lan","instr_address":"10.0.0.5","socket_port":"5025",
//!  "manufacturer":"KEITHLEY INSTRUMENTS LLC","model":"2450",
//!  "serial_number":"04512345","firmware_revision":"1.7.12b",
//!  "instr_categ":"nimitz","friendly_name":"bench-smu"}
//! ```

use crate::error::{ExplorerError, Result};
use crate::explorer::id::UniqueId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection medium of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportType {
    /// Ethernet / LXI
    Lan,
    /// USB-TMC
    Usb,
    /// Bus-addressed instruments reached through a VISA layer
    Visa,
}

impl TransportType {
    /// All transports in root display order
    pub const ALL: [TransportType; 3] = [TransportType::Lan, TransportType::Usb, TransportType::Visa];

    /// Tag used inside unique IDs and on the wire
    pub fn tag(&self) -> &'static str {
        match self {
            TransportType::Lan => "Lan",
            TransportType::Usb => "Usb",
            TransportType::Visa => "Visa",
        }
    }

    /// Label shown on tree group nodes
    pub fn label(&self) -> &'static str {
        match self {
            TransportType::Lan => "LAN",
            TransportType::Usb => "USB",
            TransportType::Visa => "VISA",
        }
    }

    /// Parse a wire tag back into a transport
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Position in [`TransportType::ALL`], used to index per-transport arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            TransportType::Lan => 0,
            TransportType::Usb => 1,
            TransportType::Visa => 2,
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where the members of a tree grouping come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Seen by the most recent discovery cycles
    Discovered,
    /// Persisted by the user
    Saved,
}

/// Category tag for instrument families that need the extended command set
pub const VERSATEST_CATEGORY: &str = "versatest";

/// Model number to family category
const MODEL_CATEGORIES: &[(&str, &str)] = &[
    ("2601", "non_nimitz"),
    ("2602", "non_nimitz"),
    ("2611", "non_nimitz"),
    ("2612", "non_nimitz"),
    ("2635", "non_nimitz"),
    ("2636", "non_nimitz"),
    ("2601A", "non_nimitz"),
    ("2602A", "non_nimitz"),
    ("2611A", "non_nimitz"),
    ("2612A", "non_nimitz"),
    ("2635A", "non_nimitz"),
    ("2636A", "non_nimitz"),
    ("2651A", "non_nimitz"),
    ("2657A", "non_nimitz"),
    ("2601B", "non_nimitz"),
    ("2601B-PULSE", "non_nimitz"),
    ("2602B", "non_nimitz"),
    ("2606B", "non_nimitz"),
    ("2611B", "non_nimitz"),
    ("2612B", "non_nimitz"),
    ("2635B", "non_nimitz"),
    ("2636B", "non_nimitz"),
    ("2604B", "non_nimitz"),
    ("2614B", "non_nimitz"),
    ("2634B", "non_nimitz"),
    ("2601B-L", "non_nimitz"),
    ("2602B-L", "non_nimitz"),
    ("2611B-L", "non_nimitz"),
    ("2612B-L", "non_nimitz"),
    ("2635B-L", "non_nimitz"),
    ("2636B-L", "non_nimitz"),
    ("2604B-L", "non_nimitz"),
    ("2614B-L", "non_nimitz"),
    ("2634B-L", "non_nimitz"),
    ("3706-SNFP", "non_nimitz"),
    ("3706-S", "non_nimitz"),
    ("3706-NFP", "non_nimitz"),
    ("3706A", "non_nimitz"),
    ("3706A-SNFP", "non_nimitz"),
    ("3706A-S", "non_nimitz"),
    ("3706A-NFP", "non_nimitz"),
    ("707B", "non_nimitz"),
    ("708B", "non_nimitz"),
    ("2450", "nimitz"),
    ("2470", "nimitz"),
    ("DMM7510", "nimitz"),
    ("2460", "nimitz"),
    ("2461", "nimitz"),
    ("2461-SYS", "nimitz"),
    ("DMM7512", "nimitz"),
    ("DMM6500", "nimitz"),
    ("DAQ6510", "nimitz"),
    ("VERSATEST-300", VERSATEST_CATEGORY),
    ("VERSATEST-600", VERSATEST_CATEGORY),
    ("MP5103", VERSATEST_CATEGORY),
    ("TSP", VERSATEST_CATEGORY),
];

/// Look up the family category for a model number
pub fn category_for_model(model: &str) -> Option<&'static str> {
    MODEL_CATEGORIES
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, categ)| *categ)
}

/// A single observed or saved instrument
///
/// `(transport, model, serial_number)` identifies the physical unit and never
/// changes; address, port, friendly name and firmware revision may differ
/// between observations of the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Connection medium
    #[serde(rename = "io_type")]
    pub transport: TransportType,

    /// Transport-specific address (IP, USB path, VISA resource)
    #[serde(rename = "instr_address")]
    pub address: String,

    /// Socket port, if the transport has one
    #[serde(rename = "socket_port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    #[serde(default)]
    pub manufacturer: String,

    pub model: String,

    pub serial_number: String,

    #[serde(default)]
    pub firmware_revision: String,

    /// Family tag derived from the model, used for display grouping only
    #[serde(rename = "instr_categ", default)]
    pub category: String,

    /// User-editable display label
    #[serde(default)]
    pub friendly_name: String,
}

impl InstrumentRecord {
    /// Create a record with defaults filled in
    pub fn new(
        transport: TransportType,
        address: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            transport,
            address: address.into(),
            port: None,
            manufacturer: String::new(),
            model: model.into(),
            serial_number: serial_number.into(),
            firmware_revision: String::new(),
            category: String::new(),
            friendly_name: String::new(),
        };
        record.fill_defaults();
        record
    }

    /// Parse one line of discovery output
    pub fn from_json_line(line: &str) -> Result<Self> {
        let mut record: Self = serde_json::from_str(line.trim())
            .map_err(|e| ExplorerError::Parse(format!("{}: {:?}", e, line)))?;
        record.fill_defaults();
        Ok(record)
    }

    /// Default the friendly name to `model#serial` and derive the category
    pub fn fill_defaults(&mut self) {
        if self.friendly_name.is_empty() {
            self.friendly_name = self.model_serial();
        }
        if self.category.is_empty() {
            if let Some(categ) = category_for_model(&self.model) {
                self.category = categ.to_string();
            }
        }
    }

    /// Set the socket port
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Set the manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    /// Set the firmware revision
    pub fn with_firmware_revision(mut self, revision: impl Into<String>) -> Self {
        self.firmware_revision = revision.into();
        self
    }

    /// Set the friendly name
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = name.into();
        self
    }

    /// Stable identity key of this record
    pub fn unique_id(&self) -> UniqueId {
        UniqueId::of(self)
    }

    /// `model#serial`, the default display label
    pub fn model_serial(&self) -> String {
        format!("{}#{}", self.model, self.serial_number)
    }

    /// Whether `other` describes the same physical instrument.
    ///
    /// Identity is the [`UniqueId`], so records whose model and serial only
    /// differ in where a `#` falls are one instrument.
    pub fn same_instrument(&self, other: &InstrumentRecord) -> bool {
        self.unique_id() == other.unique_id()
    }

    /// Port text for display, `NA` when absent
    pub fn port_label(&self) -> &str {
        self.port.as_deref().unwrap_or("NA")
    }

    /// Whether this instrument belongs to the extended-command family
    pub fn is_versatest(&self) -> bool {
        self.category.contains(VERSATEST_CATEGORY)
    }
}

/// Identification reply captured when a connection is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdnInfo {
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_rev: String,
}

impl IdnInfo {
    /// Parse the JSON identification reply
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ExplorerError::Parse(format!("IDN reply: {}", e)))
    }

    /// Build a record for this instrument reached at `address`
    pub fn into_record(
        self,
        transport: TransportType,
        address: impl Into<String>,
        port: Option<String>,
        friendly_name: impl Into<String>,
    ) -> InstrumentRecord {
        let mut record = InstrumentRecord::new(transport, address, self.model, self.serial_number)
            .with_manufacturer(self.vendor)
            .with_firmware_revision(self.firmware_rev)
            .with_friendly_name(friendly_name);
        record.port = port;
        record.fill_defaults();
        record
    }
}
