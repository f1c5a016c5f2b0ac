//! Crate-wide error type and result alias.
//!
//! Persistence and query errors propagate synchronously to the caller, which
//! decides whether to retry or abort; the store never retries internally.
//! Callback failures during event dispatch are contained by the dispatcher and
//! logged, never returned from the mutating call that triggered them.

use thiserror::Error;

use crate::events::SubscriptionId;
use oxigraph::model::NamedNode;

#[derive(Error, Debug)]
pub enum Error {
    /// The backing persistence (filesystem or otherwise) could not be reached
    /// or written. Transient infrastructure failure; retrying is the caller's
    /// decision.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The named graph has never been created. Update paths should treat this
    /// as an empty graph rather than a hard failure.
    #[error("graph not found: {0}")]
    GraphNotFound(String),

    /// The query text failed to parse. An authoring bug, surfaced before any
    /// execution happens.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// The query parsed but failed during evaluation.
    #[error("query failed: {0}")]
    Query(String),

    /// A term string is not a valid IRI.
    #[error("invalid IRI: {0}")]
    InvalidIri(#[from] oxigraph::model::IriParseError),

    /// An RDF document could not be parsed or serialized.
    #[error("document error: {0}")]
    Document(String),

    /// A subscribed callback returned an error or panicked during dispatch.
    /// Logged by the dispatcher; never propagated to the mutating caller.
    #[error("callback for subscription {subscription} failed: {message}")]
    CallbackFailure {
        subscription: SubscriptionId,
        message: String,
    },

    /// Merge was attempted across individuals whose class sets are disjoint.
    #[error("cannot merge {drop} into {keep}: class sets are disjoint")]
    TypeMismatch { keep: NamedNode, drop: NamedNode },
}

pub type Result<T> = std::result::Result<T, Error>;
