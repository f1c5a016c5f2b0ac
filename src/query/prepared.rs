//! Parameterized queries.
//!
//! Interpolating caller-supplied values straight into SPARQL text invites
//! injection the moment a label contains a quote. `PreparedQuery` keeps the
//! query text fixed and carries bound values as typed RDF terms, rendered as
//! a trailing `VALUES` clause. The terms print in N-Triples syntax with full
//! escaping, so a bound string can never alter the query structure.

use std::collections::HashSet;

use oxigraph::model::Term;
use oxigraph::sparql::SparqlEvaluator;
use regex::Regex;

use crate::error::{Error, Result};

/// A validated SPARQL query with zero or more bound variables.
///
/// # Example
///
/// ```ignore
/// let query = PreparedQuery::new("SELECT ?s WHERE { ?s ex:label ?label }")?
///     .bind("label", Literal::new_simple_literal("Acme Corp"))?;
/// let rows = store.query_prepared(&query)?;
/// ```
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    text: String,
    variables: HashSet<String>,
    bindings: Vec<(String, Term)>,
}

impl PreparedQuery {
    /// Parses and validates the query text. Malformed text fails here with
    /// `Error::QuerySyntax`, before any store is involved.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        SparqlEvaluator::new()
            .parse_query(&text)
            .map_err(|e| Error::QuerySyntax(e.to_string()))?;

        let variable_pattern = Regex::new(r"[?$]([A-Za-z_][A-Za-z0-9_]*)")
            .map_err(|e| Error::Query(format!("variable scan failed: {e}")))?;
        let variables: HashSet<String> = variable_pattern
            .captures_iter(&text)
            .map(|capture| capture[1].to_string())
            .collect();

        Ok(Self {
            text,
            variables,
            bindings: Vec::new(),
        })
    }

    /// Binds a concrete term to a variable occurring in the query. Binding
    /// the same variable again replaces the earlier value.
    ///
    /// # Errors
    ///
    /// Fails when the variable does not occur in the query text or when the
    /// value is a blank node, which has no stable identity to bind.
    pub fn bind(mut self, variable: &str, value: impl Into<Term>) -> Result<Self> {
        let term = value.into();
        if !self.variables.contains(variable) {
            return Err(Error::QuerySyntax(format!(
                "unknown variable ?{variable} in prepared query"
            )));
        }
        if matches!(term, Term::BlankNode(_)) {
            return Err(Error::QuerySyntax(format!(
                "cannot bind a blank node to ?{variable}"
            )));
        }
        self.bindings.retain(|(name, _)| name != variable);
        self.bindings.push((variable.to_string(), term));
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the executable query: the original text plus one trailing
    /// `VALUES` row for the bound variables. With no bindings the text is
    /// returned unchanged.
    pub fn render(&self) -> String {
        if self.bindings.is_empty() {
            return self.text.clone();
        }
        let names: Vec<String> = self
            .bindings
            .iter()
            .map(|(name, _)| format!("?{name}"))
            .collect();
        let values: Vec<String> = self
            .bindings
            .iter()
            .map(|(_, term)| term.to_string())
            .collect();
        // The newline matters: the query text may end in a line comment.
        format!(
            "{}\nVALUES ({}) {{ ({}) }}",
            self.text,
            names.join(" "),
            values.join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    const QUERY: &str = "SELECT ?s WHERE { ?s <http://example.org/label> ?label }";

    #[test]
    fn test_rejects_malformed_query_text() {
        let result = PreparedQuery::new("SELECT WHERE {");
        assert!(matches!(result, Err(Error::QuerySyntax(_))));
    }

    #[test]
    fn test_render_without_bindings_is_the_original_text() {
        let query = PreparedQuery::new(QUERY).unwrap();
        assert_eq!(query.render(), QUERY);
    }

    #[test]
    fn test_render_appends_values_clause() {
        let query = PreparedQuery::new(QUERY)
            .unwrap()
            .bind("label", Literal::new_simple_literal("Acme Corp"))
            .unwrap();
        let rendered = query.render();
        assert!(rendered.starts_with(QUERY), "original text must be untouched");
        assert!(rendered.contains("\nVALUES (?label) { (\"Acme Corp\") }"));
    }

    #[test]
    fn test_bound_quotes_are_escaped_in_render() {
        let query = PreparedQuery::new(QUERY)
            .unwrap()
            .bind("label", Literal::new_simple_literal("x\" } hijack"))
            .unwrap();
        assert!(query.render().contains("\\\""), "quote must be escaped");
    }

    #[test]
    fn test_rebinding_replaces_the_earlier_value() {
        let query = PreparedQuery::new(QUERY)
            .unwrap()
            .bind("label", Literal::new_simple_literal("first"))
            .unwrap()
            .bind("label", Literal::new_simple_literal("second"))
            .unwrap();
        let rendered = query.render();
        assert!(!rendered.contains("first"));
        assert!(rendered.contains("second"));
    }

    #[test]
    fn test_rejects_unknown_variable() {
        let result = PreparedQuery::new(QUERY)
            .unwrap()
            .bind("missing", NamedNode::new("http://example.org/x").unwrap());
        assert!(matches!(result, Err(Error::QuerySyntax(_))));
    }

    #[test]
    fn test_rejects_blank_node_binding() {
        use oxigraph::model::BlankNode;

        let result = PreparedQuery::new(QUERY)
            .unwrap()
            .bind("label", Term::BlankNode(BlankNode::default()));
        assert!(matches!(result, Err(Error::QuerySyntax(_))));
    }
}
