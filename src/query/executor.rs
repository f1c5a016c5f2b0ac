//! SPARQL evaluation over a staged snapshot.
//!
//! Execution follows the scratch-store pattern: the affected graphs are
//! loaded into a fresh in-memory oxigraph `Store`, the parsed query runs
//! against it, and rows stream back through a bounded channel from a worker
//! thread. The snapshot is taken under the store's read guard, so a running
//! query never observes a half-applied write.

use std::sync::mpsc::{self, SyncSender};
use std::thread;

use oxigraph::model::{GraphName, NamedNode, Quad};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;

use crate::error::{Error, Result};
use crate::model::TripleSet;
use crate::query::{QueryRows, Row};

/// Bound of the row channel between the evaluation thread and the consumer.
const ROW_BUFFER: usize = 64;

/// Validates the query text eagerly, then evaluates it on a worker thread.
///
/// A malformed query surfaces `Error::QuerySyntax` here, before any thread is
/// spawned. Evaluation failures arrive as `Err` rows in the stream.
pub(crate) fn execute(snapshot: Vec<(NamedNode, TripleSet)>, sparql: &str) -> Result<QueryRows> {
    SparqlEvaluator::new()
        .parse_query(sparql)
        .map_err(|e| Error::QuerySyntax(e.to_string()))?;

    let query = sparql.to_string();
    let (sender, receiver) = mpsc::sync_channel(ROW_BUFFER);
    thread::spawn(move || evaluate(snapshot, query, sender));
    Ok(QueryRows::new(receiver))
}

fn evaluate(snapshot: Vec<(NamedNode, TripleSet)>, query: String, sender: SyncSender<Result<Row>>) {
    let store = match stage(&snapshot) {
        Ok(store) => store,
        Err(e) => {
            let _ = sender.send(Err(e));
            return;
        }
    };

    let evaluator = SparqlEvaluator::new();
    let parsed = match evaluator.parse_query(&query) {
        Ok(parsed) => parsed,
        Err(e) => {
            let _ = sender.send(Err(Error::QuerySyntax(e.to_string())));
            return;
        }
    };
    let results = match parsed.on_store(&store).execute() {
        Ok(results) => results,
        Err(e) => {
            let _ = sender.send(Err(Error::Query(e.to_string())));
            return;
        }
    };

    match results {
        QueryResults::Solutions(solutions) => {
            for solution in solutions {
                let row = solution
                    .map(|s| Row::from_solution(&s))
                    .map_err(|e| Error::Query(e.to_string()));
                // A send failure means the consumer dropped the stream.
                if sender.send(row).is_err() {
                    return;
                }
            }
        }
        QueryResults::Boolean(true) => {
            let _ = sender.send(Ok(Row::empty()));
        }
        QueryResults::Boolean(false) => {}
        QueryResults::Graph(triples) => {
            for triple in triples {
                let row = triple
                    .map(|t| Row::from_triple(&t))
                    .map_err(|e| Error::Query(e.to_string()));
                if sender.send(row).is_err() {
                    return;
                }
            }
        }
    }
}

/// Loads the snapshot into a scratch in-memory store. Each triple lands
/// twice: once under its graph IRI so `GRAPH` clauses can address it, and
/// once in the default graph so plain patterns see the union of all named
/// graphs.
fn stage(snapshot: &[(NamedNode, TripleSet)]) -> Result<Store> {
    let store =
        Store::new().map_err(|e| Error::Query(format!("failed to stage query store: {e}")))?;
    for (iri, graph) in snapshot {
        for triple in graph.iter() {
            let named = Quad::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                triple.object.clone(),
                GraphName::NamedNode(iri.clone()),
            );
            store
                .insert(&named)
                .map_err(|e| Error::Query(format!("failed to stage query store: {e}")))?;
            let default = Quad::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                triple.object.clone(),
                GraphName::DefaultGraph,
            );
            store
                .insert(&default)
                .map_err(|e| Error::Query(format!("failed to stage query store: {e}")))?;
        }
    }
    Ok(store)
}
