//! Edge geometry: displacement vectors and lengths under periodic boundaries.
//!
//! For an edge `(i, j)` with cell shift `s`:
//!
//! ```text
//! vec = pos[j] - pos[i] + s · cell[batch[i]]
//! ```
//!
//! Cells are row vectors, so `s · cell` is `Σ_k s_k * cell[k, :]`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{GraphError, Result};
use crate::registry::keys;
use crate::types::AtomicGraph;

/// Names of the fields one edge family is read from and written to.
///
/// The default is the standard family (`edge_index`, `edge_cell_shift`,
/// `edge_vectors`, `edge_lengths`). Positions, `cell` and `batch` are
/// shared by every family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFields {
    /// `(2, E)` index-pair field.
    pub index: String,
    /// `(E, 3)` lattice coefficients of the target image.
    pub cell_shift: String,
    /// `(E, 3)` displacement vectors written by [`with_edge_vectors_for`].
    pub vectors: String,
    /// `(E,)` lengths written by [`with_edge_vectors_for`].
    pub lengths: String,
}

impl Default for EdgeFields {
    fn default() -> Self {
        Self {
            index: keys::EDGE_INDEX.to_string(),
            cell_shift: keys::EDGE_CELL_SHIFT.to_string(),
            vectors: keys::EDGE_VECTORS.to_string(),
            lengths: keys::EDGE_LENGTH.to_string(),
        }
    }
}

/// Compute the `(E, 3)` edge displacement vectors of `graph`.
///
/// Works on single frames and batches alike. Without a cell no periodic
/// correction is applied, and any `edge_cell_shift` must be all zero.
pub fn edge_vectors(graph: &AtomicGraph) -> Result<Array2<f64>> {
    edge_vectors_for(graph, &EdgeFields::default())
}

/// [`edge_vectors`] over the edge family named by `fields`.
pub fn edge_vectors_for(graph: &AtomicGraph, fields: &EdgeFields) -> Result<Array2<f64>> {
    let pos = graph.positions()?;
    let edge_index = graph.int2(&fields.index)?;
    let n_nodes = pos.nrows();
    let n_edges = edge_index.ncols();

    if edge_index.nrows() != 2 {
        return Err(GraphError::shape(&fields.index, "(2, E)", edge_index.shape()));
    }
    if let Some(&bad) = edge_index.iter().find(|&&i| i < 0 || i as usize >= n_nodes) {
        return Err(GraphError::IndexOutOfRange {
            name: fields.index.clone(),
            index: bad,
            bound: n_nodes,
        });
    }

    let mut vectors = Array2::<f64>::zeros((n_edges, 3));
    for (e, mut row) in vectors.axis_iter_mut(Axis(0)).enumerate() {
        let (i, j) = (edge_index[[0, e]] as usize, edge_index[[1, e]] as usize);
        for k in 0..3 {
            row[k] = pos[[j, k]] - pos[[i, k]];
        }
    }

    let shifts = match graph.get(&fields.cell_shift) {
        Some(_) => Some(graph.float2(&fields.cell_shift)?),
        None => None,
    };
    if let Some(shifts) = &shifts {
        if shifts.dim() != (n_edges, 3) {
            return Err(GraphError::shape(
                &fields.cell_shift,
                format!("({}, 3)", n_edges),
                shifts.shape(),
            ));
        }
    }

    let Some(cell) = graph.cell()? else {
        if shifts.map_or(false, |s| s.iter().any(|&x| x != 0.0)) {
            return Err(GraphError::missing(keys::CELL));
        }
        return Ok(vectors);
    };
    let shifts = shifts.ok_or_else(|| GraphError::missing(&fields.cell_shift))?;

    if cell.len_of(Axis(0)) == 1 {
        // one cell for every edge: no per-edge gather
        let shared = cell.index_axis(Axis(0), 0);
        for (e, row) in vectors.axis_iter_mut(Axis(0)).enumerate() {
            add_shift(row, shifts.row(e), shared);
        }
    } else {
        let batch = graph.int1(keys::BATCH)?;
        if batch.len() != n_nodes {
            return Err(GraphError::shape(
                keys::BATCH,
                format!("({},)", n_nodes),
                batch.shape(),
            ));
        }
        let n_frames = cell.len_of(Axis(0));
        for (e, row) in vectors.axis_iter_mut(Axis(0)).enumerate() {
            let frame = batch[edge_index[[0, e]] as usize];
            if frame < 0 || frame as usize >= n_frames {
                return Err(GraphError::IndexOutOfRange {
                    name: keys::BATCH.to_string(),
                    index: frame,
                    bound: n_frames,
                });
            }
            add_shift(row, shifts.row(e), cell.index_axis(Axis(0), frame as usize));
        }
    }

    Ok(vectors)
}

/// Euclidean norm of each row of an `(E, 3)` array.
pub fn edge_lengths(vectors: ArrayView2<'_, f64>) -> Array1<f64> {
    vectors
        .rows()
        .into_iter()
        .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
        .collect()
}

/// Return `graph` with `edge_vectors` (and, if requested, `edge_lengths`)
/// attached.
///
/// Idempotent: existing edge vectors are never recomputed; only missing
/// lengths are filled in. The input is consumed and returned, so the
/// caller decides whether to keep a copy.
pub fn with_edge_vectors(graph: AtomicGraph, with_lengths: bool) -> Result<AtomicGraph> {
    with_edge_vectors_for(graph, &EdgeFields::default(), with_lengths)
}

/// [`with_edge_vectors`] over the edge family named by `fields`.
pub fn with_edge_vectors_for(
    mut graph: AtomicGraph,
    fields: &EdgeFields,
    with_lengths: bool,
) -> Result<AtomicGraph> {
    if !graph.contains(&fields.vectors) {
        let vectors = edge_vectors_for(&graph, fields)?;
        tracing::trace!(family = %fields.index, edges = vectors.nrows(), "computed edge vectors");
        graph.insert(fields.vectors.as_str(), vectors);
    }
    if with_lengths && !graph.contains(&fields.lengths) {
        let lengths = edge_lengths(graph.float2(&fields.vectors)?);
        graph.insert(fields.lengths.as_str(), lengths);
    }
    Ok(graph)
}

fn add_shift(
    mut row: ndarray::ArrayViewMut1<'_, f64>,
    shift: ArrayView1<'_, f64>,
    cell: ArrayView2<'_, f64>,
) {
    for k in 0..3 {
        row[k] += shift[0] * cell[[0, k]] + shift[1] * cell[[1, k]] + shift[2] * cell[[2, k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::batch;
    use crate::registry::{FieldRegistry, FieldSpec};
    use crate::types::DType;
    use ndarray::{array, Array3};

    fn periodic_pair(cell_size: f64) -> AtomicGraph {
        AtomicGraph::new()
            .with(keys::POSITIONS, array![[0.5, 0.0, 0.0], [3.5, 0.0, 0.0]])
            .with(keys::EDGE_INDEX, array![[0_i64, 1], [1, 0]])
            .with(keys::EDGE_CELL_SHIFT, array![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
            .with(
                keys::CELL,
                Array3::from_shape_vec(
                    (1, 3, 3),
                    vec![cell_size, 0.0, 0.0, 0.0, cell_size, 0.0, 0.0, 0.0, cell_size],
                )
                .unwrap(),
            )
            .with(keys::PBC, array![[true, true, true]])
    }

    #[test]
    fn test_minimum_image_vector() {
        let g = with_edge_vectors(periodic_pair(4.0), true).unwrap();
        let v = g.float2(keys::EDGE_VECTORS).unwrap();
        assert_eq!(v.row(0).to_vec(), vec![-1.0, 0.0, 0.0]);
        assert_eq!(v.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(g.float1(keys::EDGE_LENGTH).unwrap().to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_batched_cells_match_per_frame() {
        let registry = FieldRegistry::standard();
        let a = periodic_pair(4.0);
        let b = periodic_pair(5.0);
        let batched = batch(&registry, &[a.clone(), b.clone()]).unwrap();
        let v = edge_vectors(&batched).unwrap();
        let va = edge_vectors(&a).unwrap();
        let vb = edge_vectors(&b).unwrap();
        assert_eq!(v.slice(ndarray::s![0..2, ..]), va);
        assert_eq!(v.slice(ndarray::s![2..4, ..]), vb);
        assert_eq!(vb.row(0).to_vec(), vec![-2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_idempotent() {
        let preset = periodic_pair(4.0)
            .with(keys::EDGE_VECTORS, array![[9.0, 0.0, 0.0], [0.0, 3.0, 4.0]]);
        let g = with_edge_vectors(preset, true).unwrap();
        // existing vectors are kept, lengths filled in from them
        assert_eq!(
            g.float2(keys::EDGE_VECTORS).unwrap().row(0).to_vec(),
            vec![9.0, 0.0, 0.0]
        );
        assert_eq!(g.float1(keys::EDGE_LENGTH).unwrap().to_vec(), vec![9.0, 5.0]);
        let again = with_edge_vectors(g.clone(), true).unwrap();
        assert_eq!(again, g);
    }

    #[test]
    fn test_no_cell() {
        let g = AtomicGraph::new()
            .with(keys::POSITIONS, array![[0.0, 0.0, 0.0], [0.0, 3.0, 4.0]])
            .with(keys::EDGE_INDEX, array![[0_i64], [1]]);
        let g = with_edge_vectors(g, true).unwrap();
        assert_eq!(g.float1(keys::EDGE_LENGTH).unwrap().to_vec(), vec![5.0]);

        let shifted = AtomicGraph::new()
            .with(keys::POSITIONS, array![[0.0, 0.0, 0.0], [0.0, 3.0, 4.0]])
            .with(keys::EDGE_INDEX, array![[0_i64], [1]])
            .with(keys::EDGE_CELL_SHIFT, array![[1.0, 0.0, 0.0]]);
        assert!(matches!(
            edge_vectors(&shifted),
            Err(GraphError::MissingField { .. })
        ));
    }

    #[test]
    fn test_custom_edge_family() {
        let registry = FieldRegistry::standard()
            .with_field("bond_index", FieldSpec::index_pairs())
            .and_then(|r| r.with_field("bond_shift", FieldSpec::edge(DType::Float, &[3])))
            .and_then(|r| r.with_field("bond_vectors", FieldSpec::edge(DType::Float, &[3])))
            .and_then(|r| r.with_field("bond_lengths", FieldSpec::edge(DType::Float, &[])))
            .unwrap();
        let bonds = EdgeFields {
            index: "bond_index".to_string(),
            cell_shift: "bond_shift".to_string(),
            vectors: "bond_vectors".to_string(),
            lengths: "bond_lengths".to_string(),
        };

        let pair = periodic_pair(4.0);
        let g = pair
            .clone()
            .with("bond_index", pair.field(keys::EDGE_INDEX).unwrap().clone())
            .with("bond_shift", pair.field(keys::EDGE_CELL_SHIFT).unwrap().clone());
        let g = with_edge_vectors_for(g, &bonds, true).unwrap();

        assert!(!g.contains(keys::EDGE_VECTORS));
        assert_eq!(g.float2("bond_vectors").unwrap(), edge_vectors(&pair).unwrap());
        assert_eq!(g.float1("bond_lengths").unwrap().to_vec(), vec![1.0, 1.0]);
        registry.validate(&g).unwrap();
    }

    #[test]
    fn test_zero_edges() {
        let g = AtomicGraph::new()
            .with(keys::POSITIONS, array![[0.0, 0.0, 0.0]])
            .with(keys::EDGE_INDEX, Array2::<i64>::zeros((2, 0)));
        let g = with_edge_vectors(g, true).unwrap();
        assert_eq!(g.field(keys::EDGE_VECTORS).unwrap().shape(), &[0, 3]);
        assert_eq!(g.field(keys::EDGE_LENGTH).unwrap().shape(), &[0]);
    }
}
