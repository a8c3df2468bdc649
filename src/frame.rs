//! Frame splitter: extract one frame back out of a batch.

use ndarray::{Array1, Axis};

use crate::error::{GraphError, Result};
use crate::registry::{keys, FieldKind, FieldLayout, FieldRegistry};
use crate::types::{AtomicGraph, Tensor};

/// Extract frame `index` from a batched graph.
///
/// - node fields keep the rows with `batch == index`
/// - graph fields keep row `index`, with a leading dimension of 1
/// - edge fields keep the edges whose source node is in the frame, and
///   index-pair fields are shifted back to frame-local numbering
/// - `batch` is reset to all zeros
///
/// A graph without `num_nodes` is already a single frame: `index` must be 0
/// and the input is returned unchanged.
///
/// Row counts, `batch` and every index-pair field are checked against the
/// graph's counts first, so malformed input is an error, not a panic.
pub fn frame(registry: &FieldRegistry, graph: &AtomicGraph, index: usize) -> Result<AtomicGraph> {
    let num_frames = graph.num_frames();
    if index >= num_frames {
        return Err(GraphError::FrameOutOfRange { index, num_frames });
    }
    registry.check_structure(graph)?;
    if !graph.contains(keys::NUM_NODES) {
        return Ok(graph.clone());
    }

    let frame_sizes = graph.frame_sizes()?;
    let node_offset: usize = frame_sizes[..index].iter().sum();
    let frame_id = index as i64;

    let batch = graph.int1(keys::BATCH)?;
    let node_rows: Vec<usize> = batch
        .iter()
        .enumerate()
        .filter_map(|(node, &f)| (f == frame_id).then_some(node))
        .collect();

    let edge_rows: Option<Vec<usize>> = match graph.get(keys::EDGE_INDEX) {
        Some(_) => {
            let sources = graph.edge_index()?.row(0).to_owned();
            Some(
                sources
                    .iter()
                    .enumerate()
                    .filter_map(|(edge, &src)| (batch[src as usize] == frame_id).then_some(edge))
                    .collect(),
            )
        }
        None => None,
    };

    let mut out = AtomicGraph::new();
    for (name, value) in graph.iter() {
        let spec = registry.spec(name)?;
        let selected = match spec.kind {
            FieldKind::Graph => value.select(Axis(0), &[index]),
            FieldKind::Node if name == keys::BATCH => {
                Tensor::from(Array1::<i64>::zeros(node_rows.len()))
            }
            FieldKind::Node => value.select(Axis(0), &node_rows),
            FieldKind::Edge => {
                let rows = edge_rows
                    .as_deref()
                    .ok_or_else(|| GraphError::missing(keys::EDGE_INDEX))?;
                let picked = value.select(Axis(spec.item_axis()), rows);
                if spec.layout == FieldLayout::IndexPairs {
                    let local = picked.as_int(name)? - node_offset as i64;
                    Tensor::Int(local.into_shared())
                } else {
                    picked
                }
            }
        };
        out.insert(name, selected);
    }

    tracing::debug!(
        frame = index,
        nodes = node_rows.len(),
        edges = edge_rows.as_ref().map_or(0, Vec::len),
        "extracted frame"
    );
    Ok(out)
}

/// Split a batch into all of its frames, in order.
pub fn frames(registry: &FieldRegistry, graph: &AtomicGraph) -> Result<Vec<AtomicGraph>> {
    (0..graph.num_frames())
        .map(|index| frame(registry, graph, index))
        .collect()
}
