//! Persistence seam behind the store.

use crate::error::Result;
use crate::model::TripleSet;

/// Durable storage for named graphs.
///
/// The store keeps the live state in memory; a backend only has to
/// round-trip whole graph documents. `persist` receives the full current
/// contents of one graph and is always called with the store's write guard
/// held, so calls never overlap.
pub trait StorageBackend: Send + Sync {
    /// Loads every persisted graph. Called once at store construction.
    fn load_all(&self) -> Result<Vec<(String, TripleSet)>>;

    /// Persists the full current contents of one named graph.
    fn persist(&self, graph_name: &str, graph: &TripleSet) -> Result<()>;
}
