//! RDF data model: the triple container, individual minting, and vocabulary
//! constants. Term types come from `oxigraph::model` and stay opaque validated
//! strings end to end.

pub mod graph;
pub mod namespace;
pub mod vocab;

pub use graph::TripleSet;
pub use namespace::{mint, Namespace};
