//! No-op backend for ephemeral stores and tests.

use crate::error::Result;
use crate::model::TripleSet;
use crate::store::StorageBackend;

/// Persists nothing; graph state lives only in the store's in-memory index.
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl MemoryBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for MemoryBackend {
    fn load_all(&self) -> Result<Vec<(String, TripleSet)>> {
        Ok(Vec::new())
    }

    fn persist(&self, _graph_name: &str, _graph: &TripleSet) -> Result<()> {
        Ok(())
    }
}
