//! Single-frame ingestion from raw structure arrays.

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::registry::keys;
use super::graph::AtomicGraph;
use super::tensor::Tensor;

/// Periodic boundary flags: one value for all axes, or one per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pbc {
    /// Same flag on every axis.
    Uniform(bool),
    /// Per-axis flags.
    PerAxis([bool; 3]),
}

impl Pbc {
    /// Expand to per-axis flags.
    pub fn axes(self) -> [bool; 3] {
        match self {
            Self::Uniform(b) => [b; 3],
            Self::PerAxis(axes) => axes,
        }
    }

    /// Whether any axis is periodic.
    pub fn any(self) -> bool {
        self.axes().iter().any(|&b| b)
    }
}

impl Default for Pbc {
    fn default() -> Self {
        Self::Uniform(false)
    }
}

impl From<bool> for Pbc {
    fn from(b: bool) -> Self {
        Self::Uniform(b)
    }
}

impl From<[bool; 3]> for Pbc {
    fn from(axes: [bool; 3]) -> Self {
        Self::PerAxis(axes)
    }
}

/// Builder for a single-frame [`AtomicGraph`].
///
/// Graph fields are stored with a leading frame dimension of 1, so a single
/// structure has exactly the layout of a one-frame batch minus the `batch`
/// and `num_nodes` bookkeeping.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    positions: Vec<[f64; 3]>,
    cell: Option<[[f64; 3]; 3]>,
    pbc: Option<Pbc>,
    atom_types: Option<Vec<i64>>,
    atomic_numbers: Option<Vec<i64>>,
    extra: Vec<(String, Tensor)>,
}

impl StructureBuilder {
    /// Create a builder from node positions.
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    /// Set the periodic cell (row vectors).
    pub fn cell(mut self, cell: [[f64; 3]; 3]) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Set periodic boundary flags.
    pub fn pbc(mut self, pbc: impl Into<Pbc>) -> Self {
        self.pbc = Some(pbc.into());
        self
    }

    /// Set per-atom species indices.
    pub fn atom_types(mut self, types: Vec<i64>) -> Self {
        self.atom_types = Some(types);
        self
    }

    /// Set per-atom atomic numbers.
    pub fn atomic_numbers(mut self, numbers: Vec<i64>) -> Self {
        self.atomic_numbers = Some(numbers);
        self
    }

    /// Attach an arbitrary field, stored as given.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Build the graph.
    ///
    /// A cell without pbc flags, or periodic flags without a cell, is rejected.
    /// Per-atom arrays must have one entry per position.
    pub fn build(self) -> Result<AtomicGraph> {
        let n = self.positions.len();
        let mut graph = AtomicGraph::new();

        let flat: Vec<f64> = self.positions.iter().flatten().copied().collect();
        graph.insert(keys::POSITIONS, Array2::from_shape_vec((n, 3), flat)?);

        match (self.cell, self.pbc) {
            (Some(cell), Some(pbc)) => {
                let flat: Vec<f64> = cell.iter().flatten().copied().collect();
                graph.insert(keys::CELL, Array3::from_shape_vec((1, 3, 3), flat)?);
                graph.insert(keys::PBC, Array2::from_shape_vec((1, 3), pbc.axes().to_vec())?);
            }
            (Some(_), None) => return Err(GraphError::missing(keys::PBC)),
            (None, Some(pbc)) if pbc.any() => return Err(GraphError::missing(keys::CELL)),
            (None, _) => {}
        }

        for (name, values) in [
            (keys::ATOM_TYPES, self.atom_types),
            (keys::ATOMIC_NUMBERS, self.atomic_numbers),
        ] {
            if let Some(values) = values {
                if values.len() != n {
                    return Err(GraphError::shape(name, format!("({},)", n), &[values.len()]));
                }
                graph.insert(name, Array1::from(values));
            }
        }

        for (name, value) in self.extra {
            graph.insert(name, value);
        }

        Ok(graph)
    }
}
