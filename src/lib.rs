//! # Synapse
//!
//! Synapse is a pattern-reactive RDF triple store with named-graph
//! persistence and SPARQL querying.
//!
//! The name "Synapse" comes from the junction across which a neuron passes a
//! signal onward: every triple written to or erased from the store is relayed
//! as an event to the subscriptions whose patterns it matches, so downstream
//! logic fires on the changes it cares about instead of polling.
//!
//! ## Features
//!
//! - Named graphs persisted as Turtle documents and reloaded on startup
//! - SPARQL SELECT/ASK/CONSTRUCT queries over the union of all graphs
//! - Pattern-matched change notification with sync and deferred delivery
//! - Deterministic URI minting and reference-rewriting merge of individuals
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxigraph::model::NamedNode;
//! use synapse::{EventDispatcher, TripleSet, TripleStore, DEFAULT_GRAPH};
//!
//! fn main() -> synapse::Result<()> {
//!     let dispatcher = Arc::new(EventDispatcher::new());
//!     let store = TripleStore::in_memory(dispatcher);
//!
//!     let mut graph = TripleSet::new();
//!     graph.add(
//!         NamedNode::new("http://example.org/org1")?,
//!         NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")?,
//!         NamedNode::new("http://example.org/Organization")?,
//!     );
//!     store.insert(DEFAULT_GRAPH, &graph)?;
//!
//!     let mut rows = store.query("SELECT ?s WHERE { ?s ?p ?o }")?;
//!     assert!(rows.next().is_some());
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

/// Error types and result definitions
pub mod error;

/// Change events, subscription patterns, and the dispatcher
pub mod events;

/// RDF terms, triple sets, and URI minting
pub mod model;

/// SPARQL execution and prepared queries
pub mod query;

/// The named-graph store and its persistence backends
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use events::{
    CallbackResult, DispatcherConfig, EventDispatcher, EventKind, RunMode, SubscriptionId,
    TripleEvent, TriplePattern,
};
pub use model::{mint, Namespace, TripleSet};
pub use query::{PreparedQuery, QueryRows, Row};
pub use store::{
    FilesystemBackend, MemoryBackend, StorageBackend, StoreConfig, TripleStore, DEFAULT_GRAPH,
};
