//! Brute-force periodic image search.
//!
//! ## Algorithm
//!
//! 1. Wrap every atom into the cell along periodic axes, remembering the
//!    integer offset `o_i` that was removed
//! 2. For each periodic axis `k`, search images `-n_k..=n_k` with
//!    `n_k = ceil(r / w_k)`, where `w_k` is the cell width perpendicular to
//!    the other two lattice vectors
//! 3. Emit `(i, j, s')` whenever `|wpos[j] - wpos[i] + s'·cell| < r`
//! 4. Report the shift against the unwrapped input: `s = s' - o_j + o_i`
//!
//! Loops run over `i`, then `j`, then shift components in ascending order,
//! so the output is sorted by `(i, j, s)` without a separate sort.

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, ArrayView2};

use crate::config::NeighborListConfig;
use crate::error::{GraphError, Result};
use crate::registry::keys;
use super::{NeighborList, NeighborListBuilder};

/// Exhaustive search over all atom pairs and all periodic images in range.
///
/// Cost is `O(n² · images)`; intended for the small frames typical of
/// training data and as a reference for faster builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicImageSearch;

/// Lattice of one frame, columns are the lattice vectors.
struct Lattice {
    matrix: Matrix3<f64>,
    inverse: Option<Matrix3<f64>>,
    widths: Vector3<f64>,
}

impl Lattice {
    fn from_rows(cell: ArrayView2<'_, f64>, pbc: [bool; 3]) -> Result<Self> {
        if cell.dim() != (3, 3) {
            return Err(GraphError::shape(keys::CELL, "(3, 3)", cell.shape()));
        }
        let row = |k: usize| Vector3::new(cell[[k, 0]], cell[[k, 1]], cell[[k, 2]]);
        let matrix = Matrix3::from_columns(&[row(0), row(1), row(2)]);
        let volume = matrix.determinant().abs();

        let inverse = if volume > 0.0 { matrix.try_inverse() } else { None };
        if inverse.is_none() && pbc.iter().any(|&p| p) {
            return Err(GraphError::DegenerateCell);
        }

        let a = [row(0), row(1), row(2)];
        let widths = Vector3::from_fn(|k, _| {
            let cross = a[(k + 1) % 3].cross(&a[(k + 2) % 3]).norm();
            if cross > 0.0 {
                volume / cross
            } else {
                0.0
            }
        });
        Ok(Self {
            matrix,
            inverse,
            widths,
        })
    }
}

impl NeighborListBuilder for PeriodicImageSearch {
    fn build(
        &self,
        positions: ArrayView2<'_, f64>,
        cell: Option<ArrayView2<'_, f64>>,
        pbc: [bool; 3],
        config: &NeighborListConfig,
    ) -> Result<NeighborList> {
        config.validate()?;
        if positions.ncols() != 3 {
            return Err(GraphError::shape(keys::POSITIONS, "(N, 3)", positions.shape()));
        }
        let r = config.r_max;
        let points: Vec<Vector3<f64>> = positions
            .rows()
            .into_iter()
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();

        let Some(cell) = cell else {
            if pbc.iter().any(|&p| p) {
                return Err(GraphError::missing(keys::CELL));
            }
            let pairs = search(&points, &[], r, config, |_| [0; 3], None);
            return Ok(NeighborList::from_pairs(pairs, false));
        };

        let lattice = Lattice::from_rows(cell, pbc)?;

        // integer offsets removed by wrapping, per atom
        let offsets: Vec<[i64; 3]> = match &lattice.inverse {
            Some(inverse) => points
                .iter()
                .map(|p| {
                    let frac = inverse * p;
                    std::array::from_fn(|k| if pbc[k] { frac[k].floor() as i64 } else { 0 })
                })
                .collect(),
            None => vec![[0; 3]; points.len()],
        };
        let wrapped: Vec<Vector3<f64>> = points
            .iter()
            .zip(&offsets)
            .map(|(p, o)| p - lattice.matrix * to_vector(*o))
            .collect();

        let reach: [i64; 3] = std::array::from_fn(|k| {
            if pbc[k] {
                (r / lattice.widths[k]).ceil() as i64
            } else {
                0
            }
        });
        let min_width = (0..3)
            .filter(|&k| pbc[k])
            .map(|k| lattice.widths[k])
            .fold(f64::INFINITY, f64::min);
        if r > min_width / 2.0 {
            tracing::warn!(
                r_max = r,
                min_width,
                "cutoff exceeds half the cell width; atoms see their own periodic images"
            );
        }

        let mut images = Vec::new();
        for sx in -reach[0]..=reach[0] {
            for sy in -reach[1]..=reach[1] {
                for sz in -reach[2]..=reach[2] {
                    images.push([sx, sy, sz]);
                }
            }
        }
        let image_vectors: Vec<Vector3<f64>> =
            images.iter().map(|s| lattice.matrix * to_vector(*s)).collect();

        let pairs = search(
            &wrapped,
            &image_vectors,
            r,
            config,
            |image| images[image],
            Some(offsets.as_slice()),
        );
        Ok(NeighborList::from_pairs(pairs, true))
    }
}

fn to_vector(s: [i64; 3]) -> Vector3<f64> {
    Vector3::new(s[0] as f64, s[1] as f64, s[2] as f64)
}

/// Enumerate `(i, j, shift)` triples within `r`.
///
/// With no images the only candidate is the zero shift.
fn search(
    points: &[Vector3<f64>],
    image_vectors: &[Vector3<f64>],
    r: f64,
    config: &NeighborListConfig,
    image_shift: impl Fn(usize) -> [i64; 3],
    offsets: Option<&[[i64; 3]]>,
) -> Vec<(usize, usize, [i64; 3])> {
    let zero = [Vector3::zeros()];
    let image_vectors = if image_vectors.is_empty() { &zero[..] } else { image_vectors };
    let r2 = r * r;

    let mut pairs = Vec::new();
    for (i, pi) in points.iter().enumerate() {
        for (j, pj) in points.iter().enumerate() {
            let base = pj - pi;
            for (image, shift_vector) in image_vectors.iter().enumerate() {
                if (base + shift_vector).norm_squared() >= r2 {
                    continue;
                }
                let shift = match offsets {
                    Some(offsets) => {
                        let s = image_shift(image);
                        std::array::from_fn(|k| s[k] - offsets[j][k] + offsets[i][k])
                    }
                    None => [0; 3],
                };
                if i == j && !config.keeps_self_edge(shift == [0; 3]) {
                    continue;
                }
                pairs.push((i, j, shift));
            }
        }
    }
    pairs
}

impl NeighborList {
    fn from_pairs(pairs: Vec<(usize, usize, [i64; 3])>, with_shifts: bool) -> Self {
        let n_edges = pairs.len();
        let mut edge_index = Array2::<i64>::zeros((2, n_edges));
        let mut shifts = Array2::<f64>::zeros((n_edges, 3));
        for (e, (i, j, s)) in pairs.into_iter().enumerate() {
            edge_index[[0, e]] = i as i64;
            edge_index[[1, e]] = j as i64;
            for k in 0..3 {
                shifts[[e, k]] = s[k] as f64;
            }
        }
        Self {
            edge_index,
            edge_cell_shift: with_shifts.then_some(shifts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cubic(a: f64) -> Array2<f64> {
        array![[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]
    }

    #[test]
    fn test_open_boundary_chain() {
        let pos = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let nl = PeriodicImageSearch
            .build(pos.view(), None, [false; 3], &NeighborListConfig::new(1.5))
            .unwrap();
        assert_eq!(nl.edge_index, array![[0_i64, 1, 1, 2], [1, 0, 2, 1]]);
        assert!(nl.edge_cell_shift.is_none());
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        let pos = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let nl = PeriodicImageSearch
            .build(pos.view(), None, [false; 3], &NeighborListConfig::new(1.0))
            .unwrap();
        assert_eq!(nl.num_edges(), 0);
    }

    #[test]
    fn test_self_images() {
        let pos = array![[0.5, 0.5, 0.5]];
        let cell = cubic(2.0);
        let config = NeighborListConfig::new(2.1);
        let nl = PeriodicImageSearch
            .build(pos.view(), Some(cell.view()), [true; 3], &config)
            .unwrap();
        // the six face neighbors of a simple cubic lattice
        assert_eq!(nl.num_edges(), 6);
        let shifts = nl.edge_cell_shift.unwrap();
        assert!(shifts.rows().into_iter().all(|s| s.iter().map(|x| x.abs()).sum::<f64>() == 1.0));

        let loose = config.with_strict_self_interaction(false);
        let nl = PeriodicImageSearch
            .build(pos.view(), Some(cell.view()), [true; 3], &loose)
            .unwrap();
        assert_eq!(nl.num_edges(), 0);
    }

    #[test]
    fn test_shift_accounts_for_wrapping() {
        // atom 1 sits one cell outside along x
        let pos = array![[0.5, 0.0, 0.0], [5.5, 0.0, 0.0]];
        let cell = cubic(4.0);
        let config = NeighborListConfig::new(1.5);
        let nl = PeriodicImageSearch
            .build(pos.view(), Some(cell.view()), [true, false, false], &config)
            .unwrap();
        assert_eq!(nl.edge_index, array![[0_i64, 1], [1, 0]]);
        let shifts = nl.edge_cell_shift.unwrap();
        // 5.5 - 0.5 - 4 = 1
        assert_eq!(shifts.row(0).to_vec(), vec![-1.0, 0.0, 0.0]);
        assert_eq!(shifts.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_partial_periodicity() {
        // neighbors across the non-periodic axis are not wrapped
        let pos = array![[0.0, 0.5, 0.0], [0.0, 3.5, 0.0]];
        let cell = cubic(4.0);
        let config = NeighborListConfig::new(1.5);
        let nl = PeriodicImageSearch
            .build(pos.view(), Some(cell.view()), [true, false, true], &config)
            .unwrap();
        assert_eq!(nl.num_edges(), 0);
    }

    #[test]
    fn test_degenerate_cell() {
        let pos = array![[0.0, 0.0, 0.0]];
        let flat = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let config = NeighborListConfig::new(0.5);
        assert!(matches!(
            PeriodicImageSearch.build(pos.view(), Some(flat.view()), [true; 3], &config),
            Err(GraphError::DegenerateCell)
        ));
        // no periodic axis: the cell is never inverted
        let nl = PeriodicImageSearch
            .build(pos.view(), Some(flat.view()), [false; 3], &config)
            .unwrap();
        assert_eq!(nl.num_edges(), 0);
        assert_eq!(nl.edge_cell_shift.unwrap().dim(), (0, 3));
    }

    #[test]
    fn test_periodic_without_cell() {
        let pos = array![[0.0, 0.0, 0.0]];
        assert!(matches!(
            PeriodicImageSearch.build(pos.view(), None, [true; 3], &NeighborListConfig::new(0.5)),
            Err(GraphError::MissingField { .. })
        ));
    }
}
