//! # atomic-graph
//!
//! Batched keyed-tensor graphs of atomic structures.
//!
//! An [`AtomicGraph`] is a flat mapping from field name to array. Every
//! field is classified by the [`FieldRegistry`] as a graph field (one row per
//! frame), a node field (one row per atom) or an edge field (one row per
//! edge). That classification is all the structural operations need:
//!
//! - [`batch`] fuses many graphs into one, offsetting node indices
//! - [`frame`] extracts one frame back out of a batch
//! - [`without_nodes`] takes the induced subgraph over the kept nodes
//! - [`with_edge_vectors`] computes displacement vectors under periodic
//!   boundaries
//! - [`compute_neighborlist`] builds edges per frame with a pluggable
//!   [`NeighborListBuilder`]
//!
//! ## Architecture
//!
//! ```text
//! StructureBuilder → compute_neighborlist → batch → with_edge_vectors → model
//!                                              ↓
//!                                  frame / without_nodes / GraphArchive
//! ```
//!
//! ## Invariants
//!
//! - Graph fields have `F` rows, node fields `N`, edge fields `E`
//! - `edge_index` is `(2, E)` with entries in `[0, N)`
//! - `sum(num_nodes) == N` and no edge crosses frames
//! - Fields iterate in sorted name order, so every traversal is deterministic

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod batch;
pub mod canonical;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod neighbors;
pub mod prune;
pub mod registry;
pub mod types;

// Re-exports
pub use archive::GraphArchive;
pub use batch::{batch, with_batch};
pub use canonical::{canonical_hash, canonical_hash_hex, graph_fingerprint, to_canonical_bytes};
pub use config::NeighborListConfig;
pub use error::{GraphError, Result};
pub use frame::{frame, frames};
pub use geometry::{
    edge_lengths, edge_vectors, edge_vectors_for, with_edge_vectors, with_edge_vectors_for,
    EdgeFields,
};
pub use neighbors::{compute_neighborlist, NeighborList, NeighborListBuilder, PeriodicImageSearch};
pub use prune::{without_nodes, NodeSelection};
pub use registry::{keys, FieldKind, FieldLayout, FieldRegistry, FieldSpec};
pub use types::{AtomicGraph, DType, Pbc, StructureBuilder, Tensor};

/// Layout version of [`GraphArchive`].
/// Increment on breaking changes to the persisted form.
pub const GRAPH_SCHEMA_VERSION: u32 = 1;
