//! Deterministic URI minting for individuals.
//!
//! The same `(prefix, external_id)` pair always yields the same URI: no
//! randomness, no clock. Repeated pipeline runs against an unchanged source
//! therefore update an individual instead of duplicating it.

use oxigraph::model::NamedNode;

use crate::error::Result;

/// Mints the URI for an individual from a namespace prefix and an external
/// record identifier.
///
/// The identifier is percent-escaped (`:` and `/` stay raw) and joined to the
/// prefix; a `#` separator is inserted unless the prefix already ends in `/`,
/// `#`, or `:`.
///
/// # Errors
///
/// Returns `Error::InvalidIri` if the combined string is not a valid IRI.
///
/// # Example
///
/// ```ignore
/// let uri = mint("http://example.org/person", "42")?;
/// assert_eq!(uri.as_str(), "http://example.org/person#42");
/// ```
pub fn mint(prefix: &str, external_id: &str) -> Result<NamedNode> {
    let separator = match prefix.chars().last() {
        Some('/') | Some('#') | Some(':') => "",
        _ => "#",
    };
    let uri = format!("{prefix}{separator}{}", escape_component(external_id));
    Ok(NamedNode::new(uri)?)
}

/// A namespace prefix under which individuals and terms are minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    base: String,
}

impl Namespace {
    /// Creates a namespace over the given base IRI, validating it up front.
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        NamedNode::new(&base)?;
        Ok(Self { base })
    }

    /// Mints the URI for an individual identified by `external_id` in a
    /// source system. See [`mint`].
    pub fn individual(&self, external_id: &str) -> Result<NamedNode> {
        mint(&self.base, external_id)
    }

    /// Resolves a raw local name (class or predicate) against the base
    /// without escaping.
    pub fn term(&self, local: &str) -> Result<NamedNode> {
        Ok(NamedNode::new(format!("{}{local}", self.base))?)
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }
}

/// Percent-escapes an identifier for use inside an IRI. Unreserved characters
/// plus `:` and `/` pass through; everything else (including `#`) is encoded,
/// so a minted URI carries exactly one fragment.
pub(crate) fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b':' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
