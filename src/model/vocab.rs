//! Vocabulary constants not covered by `oxigraph::model::vocab`.

use oxigraph::model::NamedNodeRef;

pub mod owl {
    use super::NamedNodeRef;

    /// `owl:NamedIndividual`.
    pub const NAMED_INDIVIDUAL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#NamedIndividual");
}
