//! Semantic-type resolution for CURIE node identifiers.
//!
//! Two lookup structures behind one interface: a built-in prefix table
//! (process-wide constant) and a per-call overlay keyed by full node id,
//! for identifiers whose type cannot be read off the prefix alone (GO
//! terms in the original export). The prefix table always wins; the
//! overlay is consulted only on a prefix miss.

use std::collections::HashMap;

/// Namespace prefix of the gene vocabulary. Gene ids are stored bare
/// (local part only) in output documents.
pub const GENE_PREFIX: &str = "HGNC";

/// Semantic type label assigned to gene nodes.
pub const GENE_TYPE: &str = "Gene";

/// Built-in namespace prefix → semantic type table.
pub fn builtin_type(prefix: &str) -> Option<&'static str> {
    match prefix {
        "CHEBI" => Some("ChemicalSubstance"),
        "CL" => Some("Cell"),
        "DOID" => Some("DiseaseOrPhenotypicFeature"),
        "HGNC" => Some(GENE_TYPE),
        "MOP" => Some("MolecularActivity"),
        "NCBITaxon" => Some("OrganismTaxon"),
        "PR" => Some("Protein"),
        "SO" => Some("GenomicEntity"),
        "UBERON" => Some("AnatomicalEntity"),
        _ => None,
    }
}

/// Resolves node identifiers to semantic type labels.
///
/// Pure lookup over its two inputs; `None` means "skip this endpoint",
/// never an error.
pub struct TypeResolver<'a> {
    overlay: &'a HashMap<String, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(overlay: &'a HashMap<String, String>) -> Self {
        Self { overlay }
    }

    /// Resolve the semantic type of a node id.
    pub fn resolve(&self, node_id: &str) -> Option<&str> {
        let prefix = node_id.split(':').next().unwrap_or(node_id);
        if let Some(label) = builtin_type(prefix) {
            return Some(label);
        }
        self.overlay.get(node_id).map(String::as_str)
    }
}
