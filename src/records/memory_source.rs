use super::{PlayEvent, RecordError, RecordIter, RecordSource};

/// Record source over events already held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    events: Vec<PlayEvent>,
}

impl MemorySource {
    pub fn new(events: Vec<PlayEvent>) -> Self {
        Self { events }
    }
}

impl RecordSource for MemorySource {
    fn scan(&self) -> Result<RecordIter<'_>, RecordError> {
        Ok(Box::new(self.events.iter().cloned().map(Ok)))
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} events)", self.events.len())
    }
}
