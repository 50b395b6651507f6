//! Test data builders for creating test objects

use instrument_explorer::{InstrumentRecord, TransportType};

/// Builder for creating test InstrumentRecords
pub struct RecordBuilder {
    transport: TransportType,
    address: String,
    model: String,
    serial: String,
    port: Option<String>,
    friendly_name: Option<String>,
}

impl RecordBuilder {
    pub fn new(serial: &str) -> Self {
        Self {
            transport: TransportType::Lan,
            address: "10.0.0.1".to_string(),
            model: "2450".to_string(),
            serial: serial.to_string(),
            port: None,
            friendly_name: None,
        }
    }

    pub fn transport(mut self, transport: TransportType) -> Self {
        self.transport = transport;
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    pub fn friendly_name(mut self, name: &str) -> Self {
        self.friendly_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> InstrumentRecord {
        let mut record = InstrumentRecord::new(self.transport, self.address, self.model, self.serial);
        record.port = self.port;
        if let Some(name) = self.friendly_name {
            record.friendly_name = name;
        }
        record
    }

    /// One line of discovery output
    pub fn json_line(self) -> String {
        serde_json::to_string(&self.build()).unwrap()
    }
}

/// Join records into a newline-delimited batch
pub fn batch(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = RecordBuilder::new("42")
            .transport(TransportType::Usb)
            .address("USB0::1")
            .model("DMM6500")
            .build();

        assert_eq!(record.transport, TransportType::Usb);
        assert_eq!(record.address, "USB0::1");
        assert_eq!(record.friendly_name, "DMM6500#42");
    }
}
