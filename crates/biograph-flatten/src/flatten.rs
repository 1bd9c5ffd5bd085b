//! Graph scanner and per-entity accumulator.
//!
//! One pass over the edge list. Each edge is inspected from both sides:
//! an endpoint whose namespace prefix matches the target prefix gets (or
//! creates) an entity record, and the opposite endpoint — if its
//! semantic type resolves — is appended to that record as an
//! association. Direction is not retained; an edge linking two matching
//! endpoints produces one association on each record.
//!
//! Record keys are the full CURIE, except for the gene namespace where
//! the bare local id is used. The same normalization applies to
//! association targets whose resolved type is the gene type. This
//! asymmetry follows the identifier scheme of the upstream export and
//! must hold for downstream lookups to work.

use crate::graph::{GraphFileV1, NodeRefV1};
use crate::resolver::{TypeResolver, GENE_PREFIX, GENE_TYPE};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlattenError {
    /// The export is expected to carry well-formed CURIEs on every edge
    /// of interest; anything else is a data defect worth failing on
    /// rather than silently mis-keying records.
    #[error("edge {edge}: node id `{id}` is not a CURIE (missing `:` separator)")]
    MalformedNodeId { id: String, edge: usize },
}

/// One related endpoint recorded on an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// Resolved semantic type of the related node.
    pub semantic_type: String,
    /// Provenance value copied from the edge.
    pub evidence: Value,
    /// The related node's own namespace prefix (original casing;
    /// lowercased on output, where it names the id field).
    pub prefix: String,
    /// Full CURIE, or the bare local id when the type is the gene type.
    pub related_id: String,
}

impl Association {
    /// Render as a JSON object: `{"@type": .., "pmc": .., <prefix>: ..}`.
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("@type".to_string(), Value::String(self.semantic_type.clone()));
        doc.insert("pmc".to_string(), self.evidence.clone());
        doc.insert(
            self.prefix.to_lowercase(),
            Value::String(self.related_id.clone()),
        );
        Value::Object(doc)
    }
}

/// One entity of interest, keyed by `local_id` in the [`EntityMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Target namespace prefix (original casing).
    pub prefix: String,
    /// Record key: bare local id for the gene namespace, full CURIE
    /// otherwise.
    pub local_id: String,
    /// Semantic type supplied by the caller for this prefix.
    pub semantic_type: String,
    /// Append-order associations; duplicates permitted.
    pub associated_with: Vec<Association>,
}

impl EntityRecord {
    fn to_object(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(
            self.prefix.to_lowercase(),
            Value::String(self.local_id.clone()),
        );
        doc.insert(
            "associated_with".to_string(),
            Value::Array(self.associated_with.iter().map(Association::to_value).collect()),
        );
        doc.insert(
            "@type".to_string(),
            Value::String(self.semantic_type.clone()),
        );
        doc
    }

    /// Render as a JSON object, without the `_id` the emitter assigns.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_object())
    }
}

/// Insertion-ordered map of entity records with a get-or-create upsert.
///
/// Iteration and emission follow first-creation order during the scan.
#[derive(Debug, Default)]
pub struct EntityMap {
    order: Vec<String>,
    records: HashMap<String, EntityRecord>,
    unresolved: usize,
}

impl EntityMap {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&EntityRecord> {
        self.records.get(key)
    }

    /// Endpoints whose semantic type could not be resolved during the
    /// scan. Each one left its entity record without an association
    /// from that edge.
    pub fn unresolved_endpoints(&self) -> usize {
        self.unresolved
    }

    /// Records in first-creation order. Restartable, unlike
    /// [`EntityMap::into_documents`].
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    fn upsert(&mut self, key: &str, prefix: &str, semantic_type: &str) -> &mut EntityRecord {
        if !self.records.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.records
            .entry(key.to_string())
            .or_insert_with(|| EntityRecord {
                prefix: prefix.to_string(),
                local_id: key.to_string(),
                semantic_type: semantic_type.to_string(),
                associated_with: Vec::new(),
            })
    }

    /// Consume the map, yielding one finalized JSON document per record
    /// in first-creation order, each augmented with a `_id` field equal
    /// to its key. Lazy and single-pass.
    pub fn into_documents(self) -> impl Iterator<Item = Value> {
        let EntityMap {
            order, mut records, ..
        } = self;
        order.into_iter().filter_map(move |key| {
            records.remove(&key).map(|record| {
                let mut doc = record.to_object();
                doc.insert("_id".to_string(), Value::String(key));
                Value::Object(doc)
            })
        })
    }
}

fn split_curie(id: &str, edge: usize) -> Result<(&str, &str), FlattenError> {
    id.split_once(':').ok_or_else(|| FlattenError::MalformedNodeId {
        id: id.to_string(),
        edge,
    })
}

/// Walk the edge list once and accumulate an entity record for every
/// node whose namespace prefix equals `prefix`, tagging each record
/// with `semantic_type`. `term_types` is the per-call overlay for
/// related-node ids the built-in prefix table cannot classify.
///
/// Edges are processed in input order; both endpoints are checked
/// independently, so an edge between two matching nodes contributes an
/// association in each direction and an edge touching neither
/// contributes nothing.
pub fn build_entities(
    graph: &GraphFileV1,
    semantic_type: &str,
    prefix: &str,
    term_types: &HashMap<String, String>,
) -> Result<EntityMap, FlattenError> {
    let resolver = TypeResolver::new(term_types);
    let mut entities = EntityMap::default();

    for (index, edge) in graph.edges.iter().enumerate() {
        accumulate(
            &mut entities,
            &resolver,
            &edge.node1,
            &edge.node2,
            &edge.evidence,
            index,
            semantic_type,
            prefix,
        )?;
        accumulate(
            &mut entities,
            &resolver,
            &edge.node2,
            &edge.node1,
            &edge.evidence,
            index,
            semantic_type,
            prefix,
        )?;
    }

    tracing::debug!(
        prefix,
        entities = entities.len(),
        unresolved = entities.unresolved,
        edges = graph.edges.len(),
        "flatten pass complete"
    );
    Ok(entities)
}

/// Handle one direction of one edge: upsert the record for `endpoint`
/// when it matches the target prefix, then try to record `other` as an
/// association on it.
#[allow(clippy::too_many_arguments)]
fn accumulate(
    entities: &mut EntityMap,
    resolver: &TypeResolver<'_>,
    endpoint: &NodeRefV1,
    other: &NodeRefV1,
    evidence: &Value,
    edge: usize,
    semantic_type: &str,
    prefix: &str,
) -> Result<(), FlattenError> {
    let endpoint_prefix = endpoint.id.split(':').next().unwrap_or(&endpoint.id);
    if endpoint_prefix != prefix {
        return Ok(());
    }

    // Matching endpoints must be well-formed even when the full CURIE is
    // kept as the key; a bare id here is a reproducible export defect.
    let (_, endpoint_local) = split_curie(&endpoint.id, edge)?;
    let key = if prefix == GENE_PREFIX {
        endpoint_local
    } else {
        endpoint.id.as_str()
    };

    let related = resolver.resolve(&other.id);
    let record = entities.upsert(key, prefix, semantic_type);
    match related {
        Some(related_type) => {
            let (other_prefix, other_local) = split_curie(&other.id, edge)?;
            let related_id = if related_type == GENE_TYPE {
                other_local.to_string()
            } else {
                other.id.clone()
            };
            record.associated_with.push(Association {
                semantic_type: related_type.to_string(),
                evidence: evidence.clone(),
                prefix: other_prefix.to_string(),
                related_id,
            });
        }
        None => {
            entities.unresolved += 1;
            tracing::debug!(node = %other.id, edge, "unresolved semantic type, no association recorded");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeV1;
    use serde_json::json;

    fn edge(node1: &str, node2: &str, evidence: &str) -> EdgeV1 {
        EdgeV1 {
            node1: NodeRefV1 {
                id: node1.to_string(),
            },
            node2: NodeRefV1 {
                id: node2.to_string(),
            },
            evidence: json!(evidence),
        }
    }

    fn graph(edges: Vec<EdgeV1>) -> GraphFileV1 {
        GraphFileV1 { edges }
    }

    fn no_overlay() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn protein_chemical_edge_yields_one_record() {
        let graph = graph(vec![edge("PR:123", "CHEBI:456", "PMC1")]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        assert_eq!(entities.len(), 1);
        let docs: Vec<Value> = entities.into_documents().collect();
        assert_eq!(
            docs[0],
            json!({
                "pr": "PR:123",
                "associated_with": [
                    {"@type": "ChemicalSubstance", "pmc": "PMC1", "chebi": "CHEBI:456"}
                ],
                "@type": "Protein",
                "_id": "PR:123"
            })
        );
    }

    #[test]
    fn non_matching_edges_contribute_nothing() {
        let graph = graph(vec![
            edge("CHEBI:1", "DOID:2", "PMC1"),
            edge("UBERON:3", "CL:4", "PMC2"),
        ]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");
        assert!(entities.is_empty());
        assert_eq!(entities.unresolved_endpoints(), 0);
    }

    #[test]
    fn gene_target_prefix_keys_records_by_local_id() {
        let graph = graph(vec![edge("HGNC:789", "CHEBI:456", "PMC1")]);
        let entities = build_entities(&graph, "Gene", "HGNC", &no_overlay()).expect("flatten");

        assert!(entities.get("HGNC:789").is_none());
        let record = entities.get("789").expect("record keyed by local id");
        assert_eq!(record.local_id, "789");
        assert_eq!(record.prefix, "HGNC");

        let docs: Vec<Value> = entities.into_documents().collect();
        assert_eq!(docs[0]["hgnc"], json!("789"));
        assert_eq!(docs[0]["_id"], json!("789"));
    }

    #[test]
    fn gene_associations_store_the_local_id() {
        let graph = graph(vec![edge("PR:123", "HGNC:789", "PMC2")]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        let record = entities.get("PR:123").expect("record");
        assert_eq!(record.associated_with.len(), 1);
        assert_eq!(record.associated_with[0].related_id, "789");
        assert_eq!(
            record.associated_with[0].to_value(),
            json!({"@type": "Gene", "pmc": "PMC2", "hgnc": "789"})
        );
    }

    #[test]
    fn unresolved_related_type_still_creates_the_record() {
        let graph = graph(vec![edge("PR:123", "MESH:D000001", "PMC1")]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        let record = entities.get("PR:123").expect("record");
        assert!(record.associated_with.is_empty());
        assert_eq!(entities.unresolved_endpoints(), 1);
    }

    #[test]
    fn overlay_resolves_what_the_prefix_table_cannot() {
        let mut overlay = HashMap::new();
        overlay.insert("GO:0003674".to_string(), "MolecularActivity".to_string());
        let graph = graph(vec![edge("PR:123", "GO:0003674", "PMC1")]);
        let entities = build_entities(&graph, "Protein", "PR", &overlay).expect("flatten");

        let record = entities.get("PR:123").expect("record");
        assert_eq!(record.associated_with[0].semantic_type, "MolecularActivity");
        assert_eq!(record.associated_with[0].related_id, "GO:0003674");
        assert_eq!(entities.unresolved_endpoints(), 0);
    }

    #[test]
    fn both_endpoints_matching_links_both_ways() {
        let graph = graph(vec![edge("PR:1", "PR:2", "PMC1")]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        assert_eq!(entities.len(), 2);
        let first = entities.get("PR:1").expect("record PR:1");
        let second = entities.get("PR:2").expect("record PR:2");
        assert_eq!(first.associated_with[0].related_id, "PR:2");
        assert_eq!(second.associated_with[0].related_id, "PR:1");
    }

    #[test]
    fn repeated_edges_append_duplicate_associations() {
        let graph = graph(vec![
            edge("PR:123", "CHEBI:456", "PMC1"),
            edge("PR:123", "CHEBI:456", "PMC1"),
            edge("CHEBI:456", "PR:123", "PMC2"),
        ]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        assert_eq!(entities.len(), 1);
        let record = entities.get("PR:123").expect("record");
        assert_eq!(record.associated_with.len(), 3);
        assert_eq!(record.associated_with[0], record.associated_with[1]);
        assert_eq!(record.associated_with[2].evidence, json!("PMC2"));
    }

    #[test]
    fn emission_follows_first_creation_order() {
        let graph = graph(vec![
            edge("PR:3", "CHEBI:1", "PMC1"),
            edge("PR:1", "CHEBI:1", "PMC2"),
            edge("PR:2", "PR:3", "PMC3"),
        ]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        let ids: Vec<Value> = entities
            .into_documents()
            .map(|doc| doc["_id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("PR:3"), json!("PR:1"), json!("PR:2")]);
    }

    #[test]
    fn emitted_ids_are_unique_and_equal_to_keys() {
        let graph = graph(vec![
            edge("PR:1", "CHEBI:1", "PMC1"),
            edge("PR:1", "DOID:2", "PMC2"),
            edge("PR:2", "CL:3", "PMC3"),
        ]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        let mut seen = std::collections::HashSet::new();
        for doc in entities.into_documents() {
            let id = doc["_id"].as_str().expect("string _id").to_string();
            assert_eq!(doc["pr"], doc["_id"]);
            assert!(seen.insert(id), "duplicate _id emitted");
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn malformed_matching_endpoint_fails_fast() {
        let graph = graph(vec![edge("PR", "CHEBI:456", "PMC1")]);
        let err = build_entities(&graph, "Protein", "PR", &no_overlay()).expect_err("bare id");
        match err {
            FlattenError::MalformedNodeId { id, edge } => {
                assert_eq!(id, "PR");
                assert_eq!(edge, 0);
            }
        }
    }

    #[test]
    fn evidence_passes_through_non_string_values() {
        let graph = graph(vec![EdgeV1 {
            node1: NodeRefV1 {
                id: "PR:123".to_string(),
            },
            node2: NodeRefV1 {
                id: "CHEBI:456".to_string(),
            },
            evidence: json!({"pmcid": "PMC1", "sentence": 4}),
        }]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");
        let record = entities.get("PR:123").expect("record");
        assert_eq!(
            record.associated_with[0].evidence,
            json!({"pmcid": "PMC1", "sentence": 4})
        );
    }

    #[test]
    fn iter_is_restartable_and_ordered() {
        let graph = graph(vec![
            edge("PR:2", "CHEBI:1", "PMC1"),
            edge("PR:1", "CHEBI:1", "PMC1"),
        ]);
        let entities = build_entities(&graph, "Protein", "PR", &no_overlay()).expect("flatten");

        let first: Vec<&str> = entities.iter().map(|r| r.local_id.as_str()).collect();
        let second: Vec<&str> = entities.iter().map(|r| r.local_id.as_str()).collect();
        assert_eq!(first, vec!["PR:2", "PR:1"]);
        assert_eq!(first, second);
    }
}
