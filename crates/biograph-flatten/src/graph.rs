//! Wire types and JSON loaders for the knowledge-graph export.
//!
//! The export is two documents: the graph itself (an `edges` array) and
//! a flat term-type overlay (full node id → semantic type label). Both
//! are parsed as-is; graph consistency is not validated here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Conventional graph filename inside a data folder.
pub const KG_FILE: &str = "kg.json";

/// Conventional term-type overlay filename inside a data folder.
pub const TERM_TYPES_FILE: &str = "go_mapping.json";

/// One endpoint of an edge. `id` is a CURIE (`PREFIX:LOCAL`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRefV1 {
    pub id: String,
}

/// One edge of the export. `evidence` is opaque provenance (typically a
/// document reference) and is passed through to output unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeV1 {
    pub node1: NodeRefV1,
    pub node2: NodeRefV1,
    pub evidence: Value,
}

/// Top-level graph document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFileV1 {
    pub edges: Vec<EdgeV1>,
}

/// Load the graph document from disk.
pub fn load_graph(path: &Path) -> Result<GraphFileV1> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading graph file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing graph file {}", path.display()))
}

/// Load the term-type overlay (full node id → semantic type label).
pub fn load_term_types(path: &Path) -> Result<HashMap<String, String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading term-type overlay {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing term-type overlay {}", path.display()))
}

/// Flatten the conventional `kg.json` + `go_mapping.json` pair found in
/// `data_dir` and return the finalized entity documents in
/// first-creation order.
pub fn flatten_dir(data_dir: &Path, semantic_type: &str, prefix: &str) -> Result<Vec<Value>> {
    let graph = load_graph(&data_dir.join(KG_FILE))?;
    let term_types = load_term_types(&data_dir.join(TERM_TYPES_FILE))?;
    let entities = crate::flatten::build_entities(&graph, semantic_type, prefix, &term_types)?;
    Ok(entities.into_documents().collect())
}
