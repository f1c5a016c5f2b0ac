//! Semantic triple container.
//!
//! `TripleSet` is the unit pipelines build and hand to the store: a set of
//! (subject, predicate, object) statements with set semantics. Inserting a
//! triple that is already present changes nothing, and membership is the only
//! multiplicity. Serialization round-trips exactly, including language tags
//! and datatype IRIs, because pipelines repeatedly read-modify-write the same
//! named graph.

use std::collections::hash_set;
use std::collections::HashSet;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{GraphName, NamedNode, NamedOrBlankNode, Quad, Term, Triple};

use crate::error::{Error, Result};
use crate::model::vocab::owl;

/// A set of RDF triples.
///
/// # Example
///
/// ```ignore
/// let mut graph = TripleSet::new();
/// let alice = NamedNode::new("http://example.org/alice")?;
/// let knows = NamedNode::new("http://example.org/knows")?;
/// let bob = NamedNode::new("http://example.org/bob")?;
/// graph.add(alice, knows, bob);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleSet {
    triples: HashSet<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Inserts a triple. Returns `true` when the triple was not already
    /// present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Removes a triple. Returns `true` when the triple was present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Triple> {
        self.triples.iter()
    }

    /// Builds and inserts a triple in one step. Returns `true` when the
    /// triple was not already present.
    pub fn add(
        &mut self,
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> bool {
        self.insert(Triple::new(subject, predicate, object))
    }

    /// Declares a minted individual: asserts `rdf:type <class>` and
    /// `rdf:type owl:NamedIndividual` for the subject.
    pub fn add_individual(&mut self, individual: &NamedNode, class: &NamedNode) {
        let rdf_type = oxigraph::model::vocab::rdf::TYPE.into_owned();
        self.add(individual.clone(), rdf_type.clone(), class.clone());
        self.add(
            individual.clone(),
            rdf_type,
            owl::NAMED_INDIVIDUAL.into_owned(),
        );
    }

    /// Returns the subset of triples whose subject is the given URI.
    pub fn about(&self, subject: &NamedNode) -> TripleSet {
        self.triples
            .iter()
            .filter(|t| matches!(&t.subject, NamedOrBlankNode::NamedNode(n) if n == subject))
            .cloned()
            .collect()
    }

    /// Serializes the set as a Turtle document.
    ///
    /// Triples are written in a deterministic order so the same set always
    /// produces the same document.
    pub fn to_turtle(&self) -> Result<String> {
        let mut ordered: Vec<&Triple> = self.triples.iter().collect();
        ordered.sort_by_cached_key(|t| t.to_string());

        let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle).for_writer(Vec::new());
        for triple in ordered {
            let quad = Quad::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                triple.object.clone(),
                GraphName::DefaultGraph,
            );
            serializer
                .serialize_quad(&quad)
                .map_err(|e| Error::Document(format!("failed to serialize triple: {e}")))?;
        }
        let bytes = serializer
            .finish()
            .map_err(|e| Error::Document(format!("failed to finish Turtle document: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::Document(format!("invalid UTF-8: {e}")))
    }

    /// Parses a Turtle document into a set.
    pub fn from_turtle(data: &str) -> Result<Self> {
        let mut set = TripleSet::new();
        let parser = RdfParser::from_format(RdfFormat::Turtle);
        for quad in parser.for_reader(data.as_bytes()) {
            let quad = quad.map_err(|e| Error::Document(format!("failed to parse Turtle: {e}")))?;
            set.insert(Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(set)
    }
}

impl FromIterator<Triple> for TripleSet {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl Extend<Triple> for TripleSet {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

impl IntoIterator for TripleSet {
    type Item = Triple;
    type IntoIter = hash_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

impl<'a> IntoIterator for &'a TripleSet {
    type Item = &'a Triple;
    type IntoIter = hash_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}
