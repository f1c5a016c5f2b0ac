//! Named-graph triple store.
//!
//! The store owns one or more named graphs, persists them through a
//! [`StorageBackend`], answers SPARQL queries over their union, and notifies
//! an injected [`EventDispatcher`] once per triple actually written or
//! erased.
//!
//! # Architecture
//!
//! 1. Live state is an in-memory map of graph name to triple set; the
//!    backend only round-trips whole graph documents
//! 2. A mutation holds the write guard through index update and persistence,
//!    rolling the index back if persistence fails, so a single call's triples
//!    are never partially visible and memory never drifts from disk
//! 3. Events collected during the mutation dispatch after the guard drops,
//!    so a synchronous callback may re-enter the store
//! 4. Queries snapshot the graphs under the read guard and evaluate on a
//!    worker thread
//!
//! Graph names are plain strings chosen by callers ("main", one per data
//! source). Every operation takes the name explicitly; [`DEFAULT_GRAPH`] is
//! the conventional name for callers that need only one.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use oxigraph::model::{NamedNode, NamedOrBlankNode, Term, Triple};

use crate::error::{Error, Result};
use crate::events::{
    CallbackResult, EventDispatcher, EventKind, RunMode, SubscriptionId, TripleEvent,
    TriplePattern,
};
use crate::model::namespace::escape_component;
use crate::model::vocab::owl;
use crate::model::TripleSet;
use crate::query::{self, PreparedQuery, QueryRows};

mod backend;
mod filesystem;
mod memory;

pub use backend::StorageBackend;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;

/// Conventional graph name for callers that need only one graph. Always
/// passed explicitly; no operation infers it.
pub const DEFAULT_GRAPH: &str = "default";

const DEFAULT_GRAPH_BASE: &str = "urn:synapse:graph:";

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Data directory for the filesystem backend; `None` keeps everything in
    /// memory.
    pub data_dir: Option<PathBuf>,
    /// IRI prefix under which public graph names are minted into graph IRIs.
    pub graph_base: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            graph_base: DEFAULT_GRAPH_BASE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Config for a store persisted under the given directory.
    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }
}

struct NamedGraph {
    iri: NamedNode,
    triples: TripleSet,
}

/// Durable, queryable storage of named RDF graphs with change notification.
pub struct TripleStore {
    graph_base: String,
    graphs: RwLock<HashMap<String, NamedGraph>>,
    backend: Box<dyn StorageBackend>,
    dispatcher: Arc<EventDispatcher>,
}

impl TripleStore {
    /// Opens a store: filesystem-backed when `config.data_dir` is set,
    /// otherwise in-memory. Loads every previously persisted graph.
    pub fn new(config: StoreConfig, dispatcher: Arc<EventDispatcher>) -> Result<Self> {
        let backend: Box<dyn StorageBackend> = match &config.data_dir {
            Some(dir) => Box::new(FilesystemBackend::open(dir.clone())?),
            None => Box::new(MemoryBackend::new()),
        };
        Self::with_backend(config, backend, dispatcher)
    }

    /// An ephemeral store with no persistence.
    pub fn in_memory(dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            graph_base: DEFAULT_GRAPH_BASE.to_string(),
            graphs: RwLock::new(HashMap::new()),
            backend: Box::new(MemoryBackend::new()),
            dispatcher,
        }
    }

    /// Opens a store over an explicit backend.
    pub fn with_backend(
        config: StoreConfig,
        backend: Box<dyn StorageBackend>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Result<Self> {
        let mut graphs = HashMap::new();
        for (name, triples) in backend.load_all()? {
            let iri = graph_iri(&config.graph_base, &name)?;
            graphs.insert(name, NamedGraph { iri, triples });
        }
        if !graphs.is_empty() {
            tracing::info!(graphs = graphs.len(), "loaded persisted graphs");
        }
        Ok(Self {
            graph_base: config.graph_base,
            graphs: RwLock::new(graphs),
            backend,
            dispatcher,
        })
    }

    /// Merges `graph` into the named graph, creating the graph on first use.
    ///
    /// Idempotent per triple: inserting an already-present triple changes
    /// nothing and fires nothing. One INSERT event per triple actually
    /// added, delivered after the write has committed.
    ///
    /// # Errors
    ///
    /// `Error::StoreUnavailable` when persistence fails; the in-memory state
    /// is rolled back and no events fire.
    pub fn insert(&self, graph_name: &str, graph: &TripleSet) -> Result<()> {
        let iri = graph_iri(&self.graph_base, graph_name)?;
        let events = {
            let mut graphs = self.graphs.write().unwrap();
            let created = !graphs.contains_key(graph_name);
            let entry = graphs
                .entry(graph_name.to_string())
                .or_insert_with(|| NamedGraph {
                    iri,
                    triples: TripleSet::new(),
                });

            let mut added = Vec::new();
            for triple in graph.iter() {
                if entry.triples.insert(triple.clone()) {
                    added.push(triple.clone());
                }
            }

            if created || !added.is_empty() {
                if let Err(e) = self.backend.persist(graph_name, &entry.triples) {
                    // Roll the index back so memory and disk stay consistent.
                    for triple in &added {
                        entry.triples.remove(triple);
                    }
                    if created {
                        graphs.remove(graph_name);
                    }
                    return Err(e);
                }
            }

            tracing::debug!(graph = graph_name, added = added.len(), "insert committed");
            added
                .into_iter()
                .map(|triple| TripleEvent {
                    kind: EventKind::Insert,
                    graph: graph_name.to_string(),
                    triple,
                })
                .collect::<Vec<_>>()
        };

        // Dispatch after the guard drops so synchronous callbacks may
        // re-enter the store.
        for event in &events {
            self.dispatcher.dispatch(event);
        }
        Ok(())
    }

    /// Removes `graph`'s triples from the named graph.
    ///
    /// Removing an absent triple, or removing from a graph that was never
    /// created, is a no-op. One DELETE event per triple actually erased.
    pub fn remove(&self, graph_name: &str, graph: &TripleSet) -> Result<()> {
        let events = {
            let mut graphs = self.graphs.write().unwrap();
            let entry = match graphs.get_mut(graph_name) {
                Some(entry) => entry,
                None => return Ok(()),
            };

            let mut removed = Vec::new();
            for triple in graph.iter() {
                if entry.triples.remove(triple) {
                    removed.push(triple.clone());
                }
            }

            if !removed.is_empty() {
                if let Err(e) = self.backend.persist(graph_name, &entry.triples) {
                    for triple in &removed {
                        entry.triples.insert(triple.clone());
                    }
                    return Err(e);
                }
            }

            tracing::debug!(graph = graph_name, removed = removed.len(), "remove committed");
            removed
                .into_iter()
                .map(|triple| TripleEvent {
                    kind: EventKind::Delete,
                    graph: graph_name.to_string(),
                    triple,
                })
                .collect::<Vec<_>>()
        };

        for event in &events {
            self.dispatcher.dispatch(event);
        }
        Ok(())
    }

    /// Full current contents of a named graph.
    ///
    /// # Errors
    ///
    /// `Error::GraphNotFound` when the name has never been created. Callers
    /// updating idempotently should treat that as an empty graph.
    pub fn get(&self, graph_name: &str) -> Result<TripleSet> {
        let graphs = self.graphs.read().unwrap();
        match graphs.get(graph_name) {
            Some(entry) => Ok(entry.triples.clone()),
            None => Err(Error::GraphNotFound(graph_name.to_string())),
        }
    }

    /// The triples about one subject in a named graph.
    pub fn get_subject(&self, graph_name: &str, subject: &NamedNode) -> Result<TripleSet> {
        let graphs = self.graphs.read().unwrap();
        match graphs.get(graph_name) {
            Some(entry) => Ok(entry.triples.about(subject)),
            None => Err(Error::GraphNotFound(graph_name.to_string())),
        }
    }

    /// Whether the named graph has ever been created.
    pub fn contains_graph(&self, graph_name: &str) -> bool {
        self.graphs.read().unwrap().contains_key(graph_name)
    }

    /// Names of every created graph, sorted.
    pub fn graph_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.graphs.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs a SPARQL query and streams its rows.
    ///
    /// Plain patterns see the union of all named graphs; `GRAPH` clauses
    /// address individual graphs by IRI. Malformed text fails here with
    /// `Error::QuerySyntax` before anything executes.
    pub fn query(&self, sparql: &str) -> Result<QueryRows> {
        query::execute(self.snapshot(), sparql)
    }

    /// Runs a prepared query with its bound values.
    pub fn query_prepared(&self, prepared: &PreparedQuery) -> Result<QueryRows> {
        query::execute(self.snapshot(), &prepared.render())
    }

    fn snapshot(&self) -> Vec<(NamedNode, TripleSet)> {
        let graphs = self.graphs.read().unwrap();
        graphs
            .values()
            .map(|entry| (entry.iri.clone(), entry.triples.clone()))
            .collect()
    }

    /// Rewrites every triple in every graph where `drop` appears as subject
    /// or object to use `keep` instead, leaving no reference to `drop`.
    ///
    /// When both individuals carry `rdf:type` statements, their class sets
    /// must share at least one class (`owl:NamedIndividual` does not count);
    /// otherwise the merge fails with `Error::TypeMismatch` and nothing
    /// changes. An untyped individual merges freely.
    ///
    /// Subscribers observe the rewrite as ordinary change events: a DELETE
    /// per rewritten-away triple and an INSERT per rewrite not already
    /// present. Rewrites that collide with an existing triple deduplicate
    /// silently. Graphs are persisted one at a time; if persistence fails
    /// midway, already-persisted graphs stay merged and re-running the merge
    /// completes the rest.
    pub fn merge(&self, keep: &NamedNode, drop: &NamedNode) -> Result<()> {
        if keep == drop {
            return Ok(());
        }

        let events = {
            let mut graphs = self.graphs.write().unwrap();

            let keep_classes = classes_of(&graphs, keep);
            let drop_classes = classes_of(&graphs, drop);
            if !keep_classes.is_empty()
                && !drop_classes.is_empty()
                && keep_classes.is_disjoint(&drop_classes)
            {
                return Err(Error::TypeMismatch {
                    keep: keep.clone(),
                    drop: drop.clone(),
                });
            }

            let mut events = Vec::new();
            for (name, entry) in graphs.iter_mut() {
                let affected: Vec<Triple> = entry
                    .triples
                    .iter()
                    .filter(|t| references(t, drop))
                    .cloned()
                    .collect();
                if affected.is_empty() {
                    continue;
                }

                let mut removed = Vec::new();
                let mut added = Vec::new();
                for triple in &affected {
                    entry.triples.remove(triple);
                    removed.push(triple.clone());
                    let rewritten = rewrite(triple, drop, keep);
                    if entry.triples.insert(rewritten.clone()) {
                        added.push(rewritten);
                    }
                }

                if let Err(e) = self.backend.persist(name, &entry.triples) {
                    // Restore this graph; earlier graphs stay merged and the
                    // merge can be re-run to completion.
                    for triple in &added {
                        entry.triples.remove(triple);
                    }
                    for triple in &removed {
                        entry.triples.insert(triple.clone());
                    }
                    return Err(e);
                }

                tracing::debug!(
                    graph = name.as_str(),
                    rewritten = removed.len(),
                    "merge rewrote references"
                );
                for triple in removed {
                    events.push(TripleEvent {
                        kind: EventKind::Delete,
                        graph: name.clone(),
                        triple,
                    });
                }
                for triple in added {
                    events.push(TripleEvent {
                        kind: EventKind::Insert,
                        graph: name.clone(),
                        triple,
                    });
                }
            }
            events
        };

        for event in &events {
            self.dispatcher.dispatch(event);
        }
        Ok(())
    }

    /// Registers an event callback on this store's dispatcher. See
    /// [`EventDispatcher::subscribe`].
    pub fn subscribe<F>(
        &self,
        pattern: TriplePattern,
        kind: EventKind,
        mode: RunMode,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&TripleEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(pattern, kind, mode, callback)
    }

    /// Removes a subscription from this store's dispatcher.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }
}

fn graph_iri(base: &str, graph_name: &str) -> Result<NamedNode> {
    Ok(NamedNode::new(format!(
        "{base}{}",
        escape_component(graph_name)
    ))?)
}

/// The `rdf:type` classes of an individual across all graphs, excluding
/// `owl:NamedIndividual`.
fn classes_of(graphs: &HashMap<String, NamedGraph>, individual: &NamedNode) -> HashSet<NamedNode> {
    let rdf_type = oxigraph::model::vocab::rdf::TYPE;
    let mut classes = HashSet::new();
    for entry in graphs.values() {
        for triple in entry.triples.iter() {
            if triple.predicate.as_ref() != rdf_type {
                continue;
            }
            if !matches!(&triple.subject, NamedOrBlankNode::NamedNode(n) if n == individual) {
                continue;
            }
            if let Term::NamedNode(class) = &triple.object {
                if class.as_ref() != owl::NAMED_INDIVIDUAL {
                    classes.insert(class.clone());
                }
            }
        }
    }
    classes
}

fn references(triple: &Triple, uri: &NamedNode) -> bool {
    matches!(&triple.subject, NamedOrBlankNode::NamedNode(n) if n == uri)
        || matches!(&triple.object, Term::NamedNode(n) if n == uri)
}

fn rewrite(triple: &Triple, from: &NamedNode, to: &NamedNode) -> Triple {
    let subject = match &triple.subject {
        NamedOrBlankNode::NamedNode(n) if n == from => NamedOrBlankNode::NamedNode(to.clone()),
        other => other.clone(),
    };
    let object = match &triple.object {
        Term::NamedNode(n) if n == from => Term::NamedNode(to.clone()),
        other => other.clone(),
    };
    Triple::new(subject, triple.predicate.clone(), object)
}
