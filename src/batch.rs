//! Batching engine: fuse independent graphs into one contiguous graph.
//!
//! ## Algorithm
//!
//! 1. Normalize every input with [`with_batch`] so `batch` and `num_nodes`
//!    are present (a single frame becomes a trivial batch of one)
//! 2. Require identical field names across inputs
//! 3. Offset every index-pair field by the running node count and `batch`
//!    by the running frame count
//! 4. Concatenate all remaining fields along their item axis, in input order
//!
//! Frame `k` of the output is the `k`-th frame across the inputs in order.

use ndarray::{Array1, Axis};
use std::collections::BTreeSet;

use crate::error::{GraphError, Result};
use crate::registry::{keys, FieldLayout, FieldRegistry};
use crate::types::{AtomicGraph, Tensor};

/// Normalize a graph so it carries batch bookkeeping.
///
/// A graph without `batch` and `num_nodes` is promoted to a one-frame batch:
/// `batch` is all zeros and `num_nodes = [N]`. A graph that already has both
/// is returned as is. Having only one of the two is a precondition error.
pub fn with_batch(mut graph: AtomicGraph) -> Result<AtomicGraph> {
    match (graph.contains(keys::BATCH), graph.contains(keys::NUM_NODES)) {
        (true, true) => Ok(graph),
        (false, false) => {
            let n = graph.num_nodes()?;
            graph.insert(keys::BATCH, Array1::<i64>::zeros(n));
            graph.insert(keys::NUM_NODES, Array1::from(vec![n as i64]));
            Ok(graph)
        }
        (true, false) => Err(GraphError::missing(keys::NUM_NODES)),
        (false, true) => Err(GraphError::missing(keys::BATCH)),
    }
}

/// Batch a list of graphs into one.
///
/// Inputs may themselves be batches. The list must be non-empty and every
/// input must expose the same field names after normalization. Every field
/// must be registered, and every input must already satisfy the row-count
/// and index-range invariants: a field with the wrong number of rows is a
/// [`ShapeMismatch`](GraphError::ShapeMismatch), never a silent shift.
///
/// Postconditions: `F_out = ΣF_i`, `N_out = ΣN_i`, `E_out = ΣE_i`.
pub fn batch(registry: &FieldRegistry, graphs: &[AtomicGraph]) -> Result<AtomicGraph> {
    if graphs.is_empty() {
        return Err(GraphError::EmptyBatch);
    }

    let normalized = graphs
        .iter()
        .map(|g| with_batch(g.clone()))
        .collect::<Result<Vec<_>>>()?;

    // row counts and index ranges are checked per input, before any offset
    // can move a misplaced row into a neighboring frame
    for graph in &normalized {
        registry.check_structure(graph)?;
    }
    let field_names: Vec<String> = normalized[0].keys().map(str::to_string).collect();

    if normalized.len() == 1 {
        let mut single = normalized;
        return Ok(single.remove(0));
    }

    let expected: BTreeSet<&str> = field_names.iter().map(String::as_str).collect();
    for (index, graph) in normalized.iter().enumerate().skip(1) {
        let found: BTreeSet<&str> = graph.keys().collect();
        if found != expected {
            return Err(GraphError::InconsistentFields {
                index,
                expected: field_names.clone(),
                found: graph.keys().map(str::to_string).collect(),
            });
        }
    }

    // Running offsets: nodes for index-pair fields, frames for `batch`.
    let mut node_offsets = Vec::with_capacity(normalized.len());
    let mut frame_offsets = Vec::with_capacity(normalized.len());
    let (mut cum_nodes, mut cum_frames) = (0_i64, 0_i64);
    for graph in &normalized {
        node_offsets.push(cum_nodes);
        frame_offsets.push(cum_frames);
        cum_nodes += graph.num_nodes()? as i64;
        cum_frames += graph.num_frames() as i64;
    }

    let mut out = AtomicGraph::new();
    for name in &field_names {
        let spec = registry.spec(name)?;
        let offsets = if spec.layout == FieldLayout::IndexPairs {
            Some(&node_offsets)
        } else if name == keys::BATCH {
            Some(&frame_offsets)
        } else {
            None
        };

        let merged = match offsets {
            Some(offsets) => {
                let shifted = normalized
                    .iter()
                    .zip(offsets)
                    .map(|(g, &offset)| {
                        let values = g.field(name)?.as_int(name)?;
                        Ok(Tensor::Int((values + offset).into_shared()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let parts: Vec<&Tensor> = shifted.iter().collect();
                Tensor::concatenate(name, Axis(spec.item_axis()), &parts)?
            }
            None => {
                let parts = normalized
                    .iter()
                    .map(|g| g.field(name))
                    .collect::<Result<Vec<_>>>()?;
                Tensor::concatenate(name, Axis(spec.item_axis()), &parts)?
            }
        };
        tracing::trace!(field = %name, shape = ?merged.shape(), "concatenated field");
        out.insert(name.clone(), merged);
    }

    tracing::debug!(
        inputs = normalized.len(),
        frames = cum_frames,
        nodes = cum_nodes,
        "batched graphs"
    );
    Ok(out)
}
