//! Integration tests for the named-graph store
//!
//! Covers insert/remove semantics, retrieval, the end-to-end insert ->
//! notify -> query flow, and filesystem persistence across reopen.

use std::sync::mpsc;
use std::sync::Arc;

use oxigraph::model::{Literal, NamedNode, Term, Triple};
use synapse::{
    Error, EventDispatcher, EventKind, RunMode, StoreConfig, TriplePattern, TripleSet,
    TripleStore, DEFAULT_GRAPH,
};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Helper function to build a URI term.
fn uri(value: &str) -> NamedNode {
    NamedNode::new(value).expect("valid test URI")
}

/// Helper function to create an in-memory store with its own dispatcher.
fn test_store() -> TripleStore {
    TripleStore::in_memory(Arc::new(EventDispatcher::new()))
}

/// Helper function to build a graph describing one organization.
fn organization_graph() -> TripleSet {
    let mut graph = TripleSet::new();
    graph.add(
        uri("http://example.org/org1"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    );
    graph.add(
        uri("http://example.org/org1"),
        uri("http://example.org/label"),
        Literal::new_simple_literal("Acme Corp"),
    );
    graph
}

#[test]
fn test_insert_then_get_returns_contents() {
    let store = test_store();
    let graph = organization_graph();

    store.insert("main", &graph).expect("insert should succeed");

    let loaded = store.get("main").expect("graph should exist");
    assert_eq!(loaded, graph, "get should return exactly what was inserted");
}

#[test]
fn test_insert_is_idempotent() {
    let store = test_store();
    let graph = organization_graph();

    store.insert("main", &graph).expect("first insert");
    store.insert("main", &graph).expect("second insert");

    let loaded = store.get("main").expect("graph should exist");
    assert_eq!(loaded.len(), 2, "re-inserting the same triples should not duplicate them");
}

#[test]
fn test_insert_merges_into_existing_graph() {
    let store = test_store();
    store
        .insert("main", &organization_graph())
        .expect("first insert");

    let mut more = TripleSet::new();
    more.add(
        uri("http://example.org/org2"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    );
    store.insert("main", &more).expect("second insert");

    let loaded = store.get("main").expect("graph should exist");
    assert_eq!(loaded.len(), 3, "inserts should accumulate in the same graph");
}

#[test]
fn test_get_unknown_graph_is_an_error() {
    let store = test_store();
    let result = store.get("never-created");
    assert!(
        matches!(result, Err(Error::GraphNotFound(ref name)) if name == "never-created"),
        "get on an unknown graph should report GraphNotFound, got {result:?}"
    );
}

#[test]
fn test_remove_erases_only_named_triples() {
    let store = test_store();
    store.insert("main", &organization_graph()).expect("insert");

    let mut doomed = TripleSet::new();
    doomed.add(
        uri("http://example.org/org1"),
        uri("http://example.org/label"),
        Literal::new_simple_literal("Acme Corp"),
    );
    store.remove("main", &doomed).expect("remove");

    let loaded = store.get("main").expect("graph should exist");
    assert_eq!(loaded.len(), 1, "only the named triple should be gone");
    assert!(loaded.contains(&Triple::new(
        uri("http://example.org/org1"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    )));
}

#[test]
fn test_remove_absent_triple_is_a_no_op() {
    let store = test_store();
    store.insert("main", &organization_graph()).expect("insert");

    let mut absent = TripleSet::new();
    absent.add(
        uri("http://example.org/org9"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    );
    store
        .remove("main", &absent)
        .expect("removing an absent triple should succeed");

    assert_eq!(store.get("main").expect("graph").len(), 2);
}

#[test]
fn test_remove_from_unknown_graph_is_a_no_op() {
    let store = test_store();
    store
        .remove("never-created", &organization_graph())
        .expect("removing from an unknown graph should be a silent no-op");
    assert!(!store.contains_graph("never-created"));
}

#[test]
fn test_get_subject_filters_by_subject() {
    let store = test_store();
    let mut graph = organization_graph();
    graph.add(
        uri("http://example.org/org2"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    );
    store.insert("main", &graph).expect("insert");

    let about = store
        .get_subject("main", &uri("http://example.org/org1"))
        .expect("graph should exist");
    assert_eq!(about.len(), 2, "only org1's triples should be returned");
}

#[test]
fn test_graphs_are_independent() {
    let store = test_store();
    store.insert("people", &organization_graph()).expect("insert people");

    let mut other = TripleSet::new();
    other.add(
        uri("http://example.org/task1"),
        uri(RDF_TYPE),
        uri("http://example.org/Task"),
    );
    store.insert("tasks", &other).expect("insert tasks");

    assert_eq!(store.get("people").expect("people").len(), 2);
    assert_eq!(store.get("tasks").expect("tasks").len(), 1);
    assert_eq!(
        store.graph_names(),
        vec!["people".to_string(), "tasks".to_string()],
        "graph_names should list every created graph sorted"
    );
}

#[test]
fn test_insert_notifies_and_queries_back() {
    // The full flow: subscribe to new Organization individuals, insert one
    // into "main", observe exactly one event, then find it with SPARQL.
    let dispatcher = Arc::new(EventDispatcher::new());
    let store = TripleStore::in_memory(Arc::clone(&dispatcher));

    let (tx, rx) = mpsc::channel();
    store.subscribe(
        TriplePattern::any()
            .with_predicate(uri(RDF_TYPE))
            .with_object(uri("http://example.org/Organization")),
        EventKind::Insert,
        RunMode::Sync,
        move |event| {
            tx.send(event.clone()).expect("send event");
            Ok(())
        },
    );

    let expected = Triple::new(
        uri("http://example.org/org1"),
        uri(RDF_TYPE),
        uri("http://example.org/Organization"),
    );
    let mut graph = TripleSet::new();
    graph.insert(expected.clone());
    store.insert("main", &graph).expect("insert");

    let event = rx.try_recv().expect("one event should have fired");
    assert_eq!(event.kind, EventKind::Insert);
    assert_eq!(event.graph, "main");
    assert_eq!(event.triple, expected);
    assert!(rx.try_recv().is_err(), "exactly one event should fire");

    store.insert("main", &graph).expect("re-insert");
    assert!(
        rx.try_recv().is_err(),
        "re-inserting the identical triple must trigger nothing"
    );

    let rows: Vec<_> = store
        .query(r"SELECT ?org WHERE { ?org a <http://example.org/Organization> }")
        .expect("query should parse")
        .collect::<Result<Vec<_>, _>>()
        .expect("query should evaluate");
    assert_eq!(rows.len(), 1, "the inserted individual should be found");
    assert_eq!(
        rows[0].get("org"),
        Some(&Term::NamedNode(uri("http://example.org/org1"))),
        "the org binding should be the inserted subject"
    );
}

#[test]
fn test_persisted_graphs_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut graph = organization_graph();
    // Language tags and datatype IRIs must survive the Turtle round trip.
    graph.add(
        uri("http://example.org/org1"),
        uri("http://example.org/name"),
        Literal::new_language_tagged_literal("Acme", "en").expect("valid tag"),
    );
    graph.add(
        uri("http://example.org/org1"),
        uri("http://example.org/founded"),
        Literal::new_typed_literal(
            "2003-04-01",
            uri("http://www.w3.org/2001/XMLSchema#date"),
        ),
    );

    {
        let store = TripleStore::new(
            StoreConfig::persistent(dir.path()),
            Arc::new(EventDispatcher::new()),
        )
        .expect("open store");
        store.insert(DEFAULT_GRAPH, &graph).expect("insert");
        store.insert("main", &organization_graph()).expect("insert main");
    }

    let reopened = TripleStore::new(
        StoreConfig::persistent(dir.path()),
        Arc::new(EventDispatcher::new()),
    )
    .expect("reopen store");

    assert_eq!(
        reopened.get(DEFAULT_GRAPH).expect("default graph"),
        graph,
        "reloaded graph should equal the original, tags and datatypes included"
    );
    assert_eq!(
        reopened.get("main").expect("main graph"),
        organization_graph()
    );
}

#[test]
fn test_remove_is_persisted() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let store = TripleStore::new(
            StoreConfig::persistent(dir.path()),
            Arc::new(EventDispatcher::new()),
        )
        .expect("open store");
        store.insert("main", &organization_graph()).expect("insert");

        let mut doomed = TripleSet::new();
        doomed.add(
            uri("http://example.org/org1"),
            uri("http://example.org/label"),
            Literal::new_simple_literal("Acme Corp"),
        );
        store.remove("main", &doomed).expect("remove");
    }

    let reopened = TripleStore::new(
        StoreConfig::persistent(dir.path()),
        Arc::new(EventDispatcher::new()),
    )
    .expect("reopen store");
    assert_eq!(
        reopened.get("main").expect("main graph").len(),
        1,
        "the removed triple should stay gone after reopen"
    );
}
