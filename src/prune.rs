//! Node pruning: the induced subgraph over the nodes that are kept.

use ndarray::{Array1, Axis};

use crate::error::{GraphError, Result};
use crate::registry::{keys, FieldKind, FieldLayout, FieldRegistry};
use crate::types::{AtomicGraph, Tensor};

/// Nodes to remove, as an index list or a boolean mask over all nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSelection {
    /// Node indices to remove. Duplicates are allowed.
    Indices(Vec<usize>),
    /// `true` marks a node for removal. Length must equal the node count.
    Mask(Vec<bool>),
}

impl NodeSelection {
    /// Selection that removes nothing.
    pub fn none() -> Self {
        Self::Indices(Vec::new())
    }

    /// Resolve to a keep-mask over `n_nodes`.
    fn keep_mask(&self, n_nodes: usize) -> Result<Vec<bool>> {
        match self {
            Self::Mask(remove) => {
                if remove.len() != n_nodes {
                    return Err(GraphError::shape(
                        "remove mask",
                        format!("({},)", n_nodes),
                        &[remove.len()],
                    ));
                }
                Ok(remove.iter().map(|&r| !r).collect())
            }
            Self::Indices(remove) => {
                let mut keep = vec![true; n_nodes];
                for &node in remove {
                    let slot = keep.get_mut(node).ok_or(GraphError::IndexOutOfRange {
                        name: "remove indices".to_string(),
                        index: node as i64,
                        bound: n_nodes,
                    })?;
                    *slot = false;
                }
                Ok(keep)
            }
        }
    }
}

impl From<Vec<usize>> for NodeSelection {
    fn from(indices: Vec<usize>) -> Self {
        Self::Indices(indices)
    }
}

impl From<Vec<bool>> for NodeSelection {
    fn from(mask: Vec<bool>) -> Self {
        Self::Mask(mask)
    }
}

/// Return `graph` with the selected nodes removed.
///
/// Edges with either endpoint removed are dropped, never reconnected.
/// Surviving edge endpoints are renumbered densely in the original order.
/// Node fields are row-selected by the keep mask and edge fields by the
/// edge keep mask. Graph fields pass through sharing storage, except
/// `num_nodes`, which is recounted so it keeps summing to the node count.
/// The frame count never changes.
///
/// Malformed input (out-of-range `edge_index` or `batch` entries, fields
/// with the wrong row count) is rejected before any row is selected.
pub fn without_nodes(
    registry: &FieldRegistry,
    graph: &AtomicGraph,
    remove: &NodeSelection,
) -> Result<AtomicGraph> {
    registry.check_structure(graph)?;
    let n_nodes = graph.num_nodes()?;
    let keep = remove.keep_mask(n_nodes)?;

    // new dense index for each kept node
    let mut new_index = vec![-1_i64; n_nodes];
    let mut kept_rows = Vec::with_capacity(n_nodes);
    for (node, &kept) in keep.iter().enumerate() {
        if kept {
            new_index[node] = kept_rows.len() as i64;
            kept_rows.push(node);
        }
    }

    let edge_rows: Option<Vec<usize>> = match graph.get(keys::EDGE_INDEX) {
        Some(_) => Some(
            graph
                .edge_index()?
                .columns()
                .into_iter()
                .enumerate()
                .filter(|(_, pair)| keep[pair[0] as usize] && keep[pair[1] as usize])
                .map(|(edge, _)| edge)
                .collect(),
        ),
        None => None,
    };

    let recounted_num_nodes = match graph.get(keys::NUM_NODES) {
        Some(_) => {
            let mut counts = vec![0_i64; graph.num_frames()];
            let batch = graph.int1(keys::BATCH)?;
            for &node in &kept_rows {
                counts[batch[node] as usize] += 1;
            }
            Some(Tensor::from(Array1::from(counts)))
        }
        None => None,
    };

    let mut out = AtomicGraph::new();
    for (name, value) in graph.iter() {
        let spec = registry.spec(name)?;
        let pruned = match spec.kind {
            FieldKind::Graph if name == keys::NUM_NODES => recounted_num_nodes
                .clone()
                .ok_or_else(|| GraphError::missing(keys::NUM_NODES))?,
            FieldKind::Graph => value.clone(),
            FieldKind::Node => value.select(Axis(0), &kept_rows),
            FieldKind::Edge => {
                let rows = edge_rows
                    .as_deref()
                    .ok_or_else(|| GraphError::missing(keys::EDGE_INDEX))?;
                let picked = value.select(Axis(spec.item_axis()), rows);
                if spec.layout == FieldLayout::IndexPairs {
                    let remapped = picked.as_int(name)?.mapv(|i| new_index[i as usize]);
                    Tensor::Int(remapped.into_shared())
                } else {
                    picked
                }
            }
        };
        out.insert(name, pruned);
    }

    tracing::debug!(
        removed = n_nodes - kept_rows.len(),
        kept = kept_rows.len(),
        edges_kept = edge_rows.as_ref().map_or(0, Vec::len),
        "pruned nodes"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::batch;
    use ndarray::array;

    fn square() -> AtomicGraph {
        // 0 - 1
        // |   |
        // 3 - 2
        AtomicGraph::new()
            .with(
                keys::POSITIONS,
                array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            )
            .with(keys::EDGE_INDEX, array![[0_i64, 1, 2, 3], [1, 2, 3, 0]])
            .with(keys::EDGE_LENGTH, array![1.0, 2.0, 3.0, 4.0])
            .with(keys::TOTAL_ENERGY, array![[-4.0]])
    }

    #[test]
    fn test_noop_removal_is_identity() {
        let registry = FieldRegistry::standard();
        let g = square();
        assert_eq!(without_nodes(&registry, &g, &NodeSelection::none()).unwrap(), g);
        let mask = NodeSelection::Mask(vec![false; 4]);
        assert_eq!(without_nodes(&registry, &g, &mask).unwrap(), g);
    }

    #[test]
    fn test_induced_subgraph() {
        let registry = FieldRegistry::standard();
        let out = without_nodes(&registry, &square(), &vec![1].into()).unwrap();
        assert_eq!(out.num_nodes().unwrap(), 3);
        // edges 0->1 and 1->2 dropped; 2->3 and 3->0 renumbered
        assert_eq!(out.edge_index().unwrap(), array![[1_i64, 2], [2, 0]]);
        assert_eq!(out.float1(keys::EDGE_LENGTH).unwrap().to_vec(), vec![3.0, 4.0]);
        assert_eq!(out.positions().unwrap().row(1).to_vec(), vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_graph_fields_share_storage() {
        let registry = FieldRegistry::standard();
        let g = square();
        let out = without_nodes(&registry, &g, &vec![0, 2].into()).unwrap();
        let (Tensor::Float(before), Tensor::Float(after)) = (
            g.field(keys::TOTAL_ENERGY).unwrap(),
            out.field(keys::TOTAL_ENERGY).unwrap(),
        ) else {
            panic!("expected float tensors");
        };
        assert_eq!(before.as_ptr(), after.as_ptr());
        assert_eq!(out.num_edges().unwrap(), 0);
    }

    #[test]
    fn test_num_nodes_recounted() {
        let registry = FieldRegistry::standard();
        let b = batch(&registry, &[square(), square()]).unwrap();
        let out = without_nodes(&registry, &b, &vec![0, 1, 2, 3].into()).unwrap();
        assert_eq!(out.num_frames(), 2);
        assert_eq!(out.int1(keys::NUM_NODES).unwrap().to_vec(), vec![0, 4]);
        assert_eq!(out.int1(keys::BATCH).unwrap().to_vec(), vec![1, 1, 1, 1]);
        assert_eq!(out.edge_index().unwrap(), array![[0_i64, 1, 2, 3], [1, 2, 3, 0]]);
        registry.validate(&out).unwrap();
    }

    #[test]
    fn test_out_of_range_edge_rejected() {
        let registry = FieldRegistry::standard();
        let b = batch(&registry, &[square(), square()]).unwrap().with(
            keys::EDGE_INDEX,
            array![[0_i64, 1, 2, 3, 4, 5, 6, 7], [1, 2, 3, 0, 5, 6, 7, 10]],
        );
        assert!(matches!(
            without_nodes(&registry, &b, &NodeSelection::none()),
            Err(GraphError::IndexOutOfRange { index: 10, bound: 8, .. })
        ));
    }

    #[test]
    fn test_batch_entry_out_of_range_rejected() {
        let registry = FieldRegistry::standard();
        let b = batch(&registry, &[square(), square()])
            .unwrap()
            .with(keys::BATCH, array![0_i64, 0, 0, 0, 1, 1, 1, 2]);
        assert!(matches!(
            without_nodes(&registry, &b, &vec![0].into()),
            Err(GraphError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bad_selection() {
        let registry = FieldRegistry::standard();
        assert!(matches!(
            without_nodes(&registry, &square(), &vec![4].into()),
            Err(GraphError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            without_nodes(&registry, &square(), &vec![true].into()),
            Err(GraphError::ShapeMismatch { .. })
        ));
    }
}
