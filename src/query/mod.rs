//! SPARQL query surface.
//!
//! Queries run over a snapshot of the store and stream their results back as
//! a lazy, finite, one-shot sequence of rows. The surface covers exact
//! triple-pattern matching, `UNION`, `OPTIONAL`, `FILTER` (including
//! lexicographic string and date comparison via `STR()`), and transitive
//! property paths (`predicate+`).

mod executor;
mod prepared;

pub use prepared::PreparedQuery;

pub(crate) use executor::execute;

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use oxigraph::model::{NamedOrBlankNode, Term, Triple};
use oxigraph::sparql::QuerySolution;

use crate::error::Result;

/// One result row: the named bindings of the query's projected variables.
///
/// A variable left unbound by the query (an unmatched `OPTIONAL`, for
/// instance) is simply absent.
#[derive(Debug, Clone, Default)]
pub struct Row {
    bindings: HashMap<String, Term>,
}

impl Row {
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_solution(solution: &QuerySolution) -> Self {
        let bindings = solution
            .iter()
            .map(|(variable, term)| (variable.as_str().to_string(), term.clone()))
            .collect();
        Self { bindings }
    }

    pub(crate) fn from_triple(triple: &Triple) -> Self {
        let subject = match &triple.subject {
            NamedOrBlankNode::NamedNode(n) => Term::NamedNode(n.clone()),
            NamedOrBlankNode::BlankNode(b) => Term::BlankNode(b.clone()),
        };
        let mut bindings = HashMap::new();
        bindings.insert("subject".to_string(), subject);
        bindings.insert(
            "predicate".to_string(),
            Term::NamedNode(triple.predicate.clone()),
        );
        bindings.insert("object".to_string(), triple.object.clone());
        Self { bindings }
    }
}

/// Lazy stream of query results.
///
/// Rows arrive from an evaluation thread through a bounded channel and are
/// consumed exactly once; the stream cannot be restarted. Dropping it early
/// stops the evaluation. SELECT queries yield one row per solution; ASK
/// yields a single empty row for `true` and nothing for `false`; CONSTRUCT
/// and DESCRIBE yield one row per produced triple with `subject`,
/// `predicate`, and `object` bindings.
pub struct QueryRows {
    receiver: Receiver<Result<Row>>,
}

impl QueryRows {
    pub(crate) fn new(receiver: Receiver<Result<Row>>) -> Self {
        Self { receiver }
    }
}

impl Iterator for QueryRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}
