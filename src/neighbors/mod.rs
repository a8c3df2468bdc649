//! Neighbor list construction.
//!
//! A [`NeighborListBuilder`] sees one frame at a time and has no
//! cross-frame awareness. [`compute_neighborlist`] drives it over every
//! frame of a graph and re-batches the results.

mod periodic;

pub use periodic::PeriodicImageSearch;

use ndarray::{Array2, ArrayView2, Axis};

use crate::batch::batch;
use crate::config::NeighborListConfig;
use crate::error::{GraphError, Result};
use crate::frame::frames;
use crate::registry::{keys, FieldKind, FieldRegistry};
use crate::types::AtomicGraph;

/// Edges of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    /// `(2, E)` source and target node indices.
    pub edge_index: Array2<i64>,
    /// `(E, 3)` integer-valued lattice coefficients of the target image.
    /// Present whenever a cell was supplied.
    pub edge_cell_shift: Option<Array2<f64>>,
}

impl NeighborList {
    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edge_index.ncols()
    }
}

/// Builds the edges of a single frame.
///
/// Contract: every pair within `config.r_max` in some periodic image appears
/// at least once, and no `(i, j, shift)` triple appears twice.
pub trait NeighborListBuilder {
    /// Build edges for `positions` (`(n, 3)`), an optional `(3, 3)` cell of
    /// row vectors and per-axis periodic flags.
    fn build(
        &self,
        positions: ArrayView2<'_, f64>,
        cell: Option<ArrayView2<'_, f64>>,
        pbc: [bool; 3],
        config: &NeighborListConfig,
    ) -> Result<NeighborList>;
}

/// Recompute the edges of every frame in `graph`.
///
/// Existing edge fields are discarded. `edge_index` is attached, plus
/// `edge_cell_shift` when the graph carries a cell. A batched input comes
/// back as a batch of the same frames in the same order; an unbatched input
/// stays unbatched.
pub fn compute_neighborlist(
    registry: &FieldRegistry,
    graph: &AtomicGraph,
    builder: &impl NeighborListBuilder,
    config: &NeighborListConfig,
) -> Result<AtomicGraph> {
    config.validate()?;

    let edge_fields: Vec<String> = graph
        .keys()
        .filter(|name| registry.classify(name) == Some(FieldKind::Edge))
        .map(str::to_string)
        .collect();

    let mut rebuilt = Vec::with_capacity(graph.num_frames());
    for (index, mut single) in frames(registry, graph)?.into_iter().enumerate() {
        for name in &edge_fields {
            single.remove(name);
        }

        let cell = single.cell()?;
        let cell = cell.as_ref().map(|c| c.index_axis(Axis(0), 0));
        let pbc = frame_pbc(&single, cell.is_some())?;
        let neighbors = builder.build(single.positions()?, cell, pbc, config)?;
        tracing::debug!(frame = index, edges = neighbors.num_edges(), "built neighbor list");

        single.insert(keys::EDGE_INDEX, neighbors.edge_index);
        if let Some(shifts) = neighbors.edge_cell_shift {
            single.insert(keys::EDGE_CELL_SHIFT, shifts);
        }
        rebuilt.push(single);
    }

    if graph.contains(keys::NUM_NODES) {
        batch(registry, &rebuilt)
    } else {
        rebuilt.pop().ok_or(GraphError::EmptyBatch)
    }
}

/// Per-axis periodic flags of a single frame.
///
/// `pbc` may be stored as `(1, 3)`, `(3,)` or a single flag. A frame with a
/// cell must carry `pbc`; a frame without one is open on every axis.
fn frame_pbc(single: &AtomicGraph, has_cell: bool) -> Result<[bool; 3]> {
    let Some(tensor) = single.get(keys::PBC) else {
        if has_cell {
            return Err(GraphError::missing(keys::PBC));
        }
        return Ok([false; 3]);
    };
    let flags: Vec<bool> = tensor.as_bool(keys::PBC)?.iter().copied().collect();
    match flags.as_slice() {
        &[uniform] => Ok([uniform; 3]),
        &[x, y, z] => Ok([x, y, z]),
        _ => Err(GraphError::shape(keys::PBC, "(1, 3)", tensor.shape())),
    }
}
