//! Structural validation of a graph against the registry.

use crate::error::{GraphError, Result};
use crate::types::AtomicGraph;
use super::{keys, FieldKind, FieldLayout, FieldRegistry};

impl FieldRegistry {
    /// Check every structural invariant of `graph`, returning the first
    /// violation found.
    ///
    /// - every field is registered and has its registered dtype and row shape
    /// - graph fields have `F` rows, node fields `N`, edge fields `E`
    /// - `batch` and `num_nodes` are present together, `sum(num_nodes) == N`
    ///   and each frame owns exactly `num_nodes[f]` nodes
    /// - every index-pair entry lies in `[0, N)` and no edge crosses frames
    pub fn validate(&self, graph: &AtomicGraph) -> Result<()> {
        for (name, tensor) in graph.iter() {
            let spec = self.spec(name)?;
            if tensor.dtype() != spec.dtype {
                return Err(GraphError::DtypeMismatch {
                    name: name.to_string(),
                    expected: spec.dtype,
                    found: tensor.dtype(),
                });
            }
            if let (FieldLayout::Rows, Some(item_shape)) = (spec.layout, &spec.item_shape) {
                if tensor.item_shape() != item_shape.as_slice() {
                    return Err(GraphError::shape(
                        name,
                        format!("rows of shape {:?}", item_shape),
                        tensor.shape(),
                    ));
                }
            }
        }
        self.check_structure(graph)
    }

    /// Row counts, batch bookkeeping and index ranges.
    ///
    /// Everything the structural operations index by. Run at entry to
    /// `batch`, `frame` and `without_nodes` so malformed input is an error
    /// rather than a misplaced row or an out-of-bounds gather.
    pub(crate) fn check_structure(&self, graph: &AtomicGraph) -> Result<()> {
        let n_nodes = graph.num_nodes()?;
        let n_frames = graph.num_frames();
        let n_edges = match graph.get(keys::EDGE_INDEX) {
            Some(_) => Some(graph.num_edges()?),
            None => None,
        };

        for (name, tensor) in graph.iter() {
            let spec = self.spec(name)?;
            let shape = tensor.shape();
            match spec.layout {
                FieldLayout::IndexPairs => {
                    let expected_edges = n_edges.unwrap_or(shape.get(1).copied().unwrap_or(0));
                    if shape.len() != 2 || shape[0] != 2 || shape[1] != expected_edges {
                        return Err(GraphError::shape(
                            name,
                            format!("(2, {})", expected_edges),
                            shape,
                        ));
                    }
                }
                FieldLayout::Rows => {
                    let expected_rows = match spec.kind {
                        FieldKind::Graph => n_frames,
                        FieldKind::Node => n_nodes,
                        FieldKind::Edge => {
                            n_edges.ok_or_else(|| GraphError::missing(keys::EDGE_INDEX))?
                        }
                    };
                    if shape.first() != Some(&expected_rows) {
                        return Err(GraphError::shape(
                            name,
                            format!("{} leading dimension {}", spec.kind, expected_rows),
                            shape,
                        ));
                    }
                }
            }
        }

        self.validate_batch_bookkeeping(graph, n_nodes, n_frames)?;
        for name in graph.keys() {
            if self.spec(name)?.layout == FieldLayout::IndexPairs {
                validate_index_pairs(graph, name, n_nodes)?;
            }
        }
        Ok(())
    }

    fn validate_batch_bookkeeping(
        &self,
        graph: &AtomicGraph,
        n_nodes: usize,
        n_frames: usize,
    ) -> Result<()> {
        match (graph.contains(keys::BATCH), graph.contains(keys::NUM_NODES)) {
            (false, false) => return Ok(()),
            (true, false) => return Err(GraphError::missing(keys::NUM_NODES)),
            (false, true) => return Err(GraphError::missing(keys::BATCH)),
            (true, true) => {}
        }

        let num_nodes = graph.int1(keys::NUM_NODES)?;
        let total: i64 = num_nodes.iter().sum();
        if total != n_nodes as i64 || num_nodes.iter().any(|&c| c < 0) {
            return Err(GraphError::shape(
                keys::NUM_NODES,
                format!("non-negative counts summing to {}", n_nodes),
                &[num_nodes.len()],
            ));
        }

        let mut owned = vec![0_i64; n_frames];
        for &frame in graph.int1(keys::BATCH)?.iter() {
            if frame < 0 || frame as usize >= n_frames {
                return Err(GraphError::IndexOutOfRange {
                    name: keys::BATCH.to_string(),
                    index: frame,
                    bound: n_frames,
                });
            }
            owned[frame as usize] += 1;
        }
        if let Some((frame, _)) = owned
            .iter()
            .zip(num_nodes.iter())
            .enumerate()
            .find(|(_, (have, want))| have != want)
        {
            return Err(GraphError::shape(
                keys::BATCH,
                format!("{} nodes in frame {}", num_nodes[frame], frame),
                &[owned[frame] as usize],
            ));
        }
        Ok(())
    }
}

/// Every entry of an index-pair field lies in `[0, N)` and, in a batch,
/// both endpoints of each pair belong to the same frame.
fn validate_index_pairs(graph: &AtomicGraph, name: &str, n_nodes: usize) -> Result<()> {
    let pairs = graph.int2(name)?;
    if let Some(&bad) = pairs.iter().find(|&&i| i < 0 || i as usize >= n_nodes) {
        return Err(GraphError::IndexOutOfRange {
            name: name.to_string(),
            index: bad,
            bound: n_nodes,
        });
    }

    if graph.contains(keys::BATCH) {
        let batch = graph.int1(keys::BATCH)?;
        for (edge, pair) in pairs.columns().into_iter().enumerate() {
            let source_frame = batch[pair[0] as usize];
            let target_frame = batch[pair[1] as usize];
            if source_frame != target_frame {
                return Err(GraphError::CrossFrameEdge {
                    edge,
                    source_frame,
                    target_frame,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldSpec;
    use ndarray::{array, Array2};

    fn batched_pair() -> AtomicGraph {
        AtomicGraph::new()
            .with(keys::POSITIONS, Array2::<f64>::zeros((4, 3)))
            .with(keys::BATCH, array![0_i64, 0, 1, 1])
            .with(keys::NUM_NODES, array![2_i64, 2])
            .with(keys::EDGE_INDEX, array![[0_i64, 2], [1, 3]])
    }

    #[test]
    fn test_valid_batch() {
        FieldRegistry::standard().validate(&batched_pair()).unwrap();
    }

    #[test]
    fn test_unregistered_field_rejected() {
        let g = batched_pair().with("mystery", array![1.0, 2.0]);
        assert!(matches!(
            FieldRegistry::standard().validate(&g),
            Err(GraphError::UnregisteredField { .. })
        ));
    }

    #[test]
    fn test_cross_frame_edge_rejected() {
        let g = batched_pair().with(keys::EDGE_INDEX, array![[0_i64, 1], [2, 0]]);
        match FieldRegistry::standard().validate(&g) {
            Err(GraphError::CrossFrameEdge { edge, .. }) => assert_eq!(edge, 0),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_edge_index_out_of_range() {
        let g = batched_pair().with(keys::EDGE_INDEX, array![[0_i64], [4]]);
        assert!(matches!(
            FieldRegistry::standard().validate(&g),
            Err(GraphError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_num_nodes_sum_checked() {
        let g = batched_pair().with(keys::NUM_NODES, array![3_i64, 2]);
        assert!(FieldRegistry::standard().validate(&g).is_err());
    }

    #[test]
    fn test_batch_without_num_nodes() {
        let mut g = batched_pair();
        g.remove(keys::NUM_NODES);
        assert!(matches!(
            FieldRegistry::standard().validate(&g),
            Err(GraphError::MissingField { .. })
        ));
    }

    #[test]
    fn test_item_shape_checked() {
        let g = batched_pair().with(keys::FORCES, Array2::<f64>::zeros((4, 2)));
        assert!(matches!(
            FieldRegistry::standard().validate(&g),
            Err(GraphError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_every_index_pair_field_checked() {
        let registry = FieldRegistry::standard()
            .with_field("bond_index", FieldSpec::index_pairs())
            .unwrap();
        let g = batched_pair().with("bond_index", array![[0_i64, 2], [1, 7]]);
        match registry.check_structure(&g) {
            Err(GraphError::IndexOutOfRange { name, index, bound }) => {
                assert_eq!(name, "bond_index");
                assert_eq!(index, 7);
                assert_eq!(bound, 4);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_negative_frame_size_rejected() {
        let g = batched_pair().with(keys::NUM_NODES, array![-1_i64, 5]);
        assert!(matches!(
            FieldRegistry::standard().check_structure(&g),
            Err(GraphError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_graph_field_rows_checked() {
        let g = batched_pair().with(keys::TOTAL_ENERGY, Array2::<f64>::zeros((1, 1)));
        assert!(FieldRegistry::standard().validate(&g).is_err());
    }
}
