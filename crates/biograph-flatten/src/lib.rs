//! Knowledge-graph flattening for Biograph
//!
//! Takes a knowledge-graph export (edges between CURIE-identified nodes,
//! each carrying a provenance value) and flattens it into per-entity
//! annotation documents, one namespace prefix at a time:
//!
//! - Every endpoint whose prefix matches the target prefix gets an
//!   entity record (first edge creates it, later edges append).
//! - The opposite endpoint of each such edge is classified by semantic
//!   type (built-in prefix table, then a per-call overlay) and recorded
//!   as an association on the entity.
//! - Records are finalized with a `_id` field and emitted in
//!   first-creation order, ready for a downstream document indexer.
//!
//! The pass is a single linear scan over the edge list; there is no I/O
//! inside the core logic. `graph` holds the wire types plus the JSON
//! loaders for callers that start from files on disk.

pub mod flatten;
pub mod graph;
pub mod resolver;

pub use flatten::{build_entities, Association, EntityMap, EntityRecord, FlattenError};
pub use graph::{
    flatten_dir, load_graph, load_term_types, EdgeV1, GraphFileV1, NodeRefV1, KG_FILE,
    TERM_TYPES_FILE,
};
pub use resolver::{builtin_type, TypeResolver, GENE_PREFIX, GENE_TYPE};
