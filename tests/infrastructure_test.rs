//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{batch, RecordBuilder};
use common::mock_helpers::ReadOnlyStore;
use instrument_explorer::config::{SavedInstrumentStore, SettingsStore};
use instrument_explorer::{InstrumentRecord, TransportType};

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let record = RecordBuilder::new("7")
        .transport(TransportType::Visa)
        .address("GPIB0::16::INSTR")
        .port("5025")
        .build();

    assert_eq!(record.transport, TransportType::Visa);
    assert_eq!(record.address, "GPIB0::16::INSTR");
    assert_eq!(record.port_label(), "5025");
}

#[test]
fn test_json_lines_parse_back() {
    let raw = batch([
        RecordBuilder::new("1").json_line(),
        RecordBuilder::new("2").friendly_name("bench").json_line(),
    ]);

    let records: Vec<_> = raw
        .lines()
        .map(|l| InstrumentRecord::from_json_line(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].friendly_name, "bench");
}

#[test]
fn test_read_only_store_rejects_writes() {
    let mut store = ReadOnlyStore::default();
    assert_eq!(store.get("anything").unwrap(), None);
    assert!(store.set("anything", serde_json::json!(1)).is_err());
    assert_eq!(store.writes_attempted, 1);

    let mut saved = SavedInstrumentStore::new(Box::new(ReadOnlyStore::default()));
    assert!(saved.persist(&RecordBuilder::new("1").build()).is_err());
}
