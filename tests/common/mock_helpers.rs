//! Mock construction helpers

use async_trait::async_trait;
use instrument_explorer::config::SettingsStore;
use instrument_explorer::discovery::InstrumentSource;
use instrument_explorer::error::{ExplorerError, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Settings store whose writes always fail
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    pub writes_attempted: usize,
}

impl SettingsStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn set(&mut self, _key: &str, _value: Value) -> Result<()> {
        self.writes_attempted += 1;
        Err(ExplorerError::Persistence("store is read-only".to_string()))
    }
}

/// Source replaying a script of batches, then repeating the last one
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Result<String>>>,
    last: Mutex<String>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Result<String>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            last: Mutex::new(String::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstrumentSource for ScriptedSource {
    async fn fetch_batch(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(batch)) => {
                *self.last.lock().unwrap() = batch.clone();
                Ok(batch)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}
