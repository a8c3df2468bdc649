//! Field registry: the closed classification of field names.
//!
//! Every structural operation asks the registry how to treat a field before
//! touching it. Graph fields are indexed by frame, node fields by node and
//! edge fields by edge. A name with no entry is an error, never a guess.
//!
//! The registry is a plain value. Custom fields are added to a registry the
//! caller owns; there is no process-wide table.

pub mod keys;
mod validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GraphError, Result};
use crate::types::tensor::DType;

/// Which leading dimension a field is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Leading dimension is the frame count `F`.
    Graph,
    /// Leading dimension is the total node count `N`.
    Node,
    /// Leading dimension is the total edge count `E`.
    Edge,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph => write!(f, "graph"),
            Self::Node => write!(f, "node"),
            Self::Edge => write!(f, "edge"),
        }
    }
}

/// Memory layout of a field relative to its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FieldLayout {
    /// One row per item along axis 0.
    #[default]
    Rows,
    /// `(2, E)` node indices: concatenated along axis 1 and offset by the
    /// running node count when batching.
    IndexPairs,
}

/// Registered rule for one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Graph, node or edge field.
    pub kind: FieldKind,
    /// Required element type.
    pub dtype: DType,
    /// Shape of one row; `None` accepts any trailing shape.
    pub item_shape: Option<Vec<usize>>,
    /// Row layout.
    #[serde(default)]
    pub layout: FieldLayout,
}

impl FieldSpec {
    /// Per-frame field with a fixed row shape.
    pub fn graph(dtype: DType, item_shape: &[usize]) -> Self {
        Self::rows(FieldKind::Graph, dtype, Some(item_shape))
    }

    /// Per-node field with a fixed row shape.
    pub fn node(dtype: DType, item_shape: &[usize]) -> Self {
        Self::rows(FieldKind::Node, dtype, Some(item_shape))
    }

    /// Per-edge field with a fixed row shape.
    pub fn edge(dtype: DType, item_shape: &[usize]) -> Self {
        Self::rows(FieldKind::Edge, dtype, Some(item_shape))
    }

    /// Field of the given kind accepting any trailing shape.
    pub fn any_shape(kind: FieldKind, dtype: DType) -> Self {
        Self::rows(kind, dtype, None)
    }

    /// `(2, E)` edge field holding node indices.
    pub fn index_pairs() -> Self {
        Self {
            kind: FieldKind::Edge,
            dtype: DType::Int,
            item_shape: None,
            layout: FieldLayout::IndexPairs,
        }
    }

    fn rows(kind: FieldKind, dtype: DType, item_shape: Option<&[usize]>) -> Self {
        Self {
            kind,
            dtype,
            item_shape: item_shape.map(<[usize]>::to_vec),
            layout: FieldLayout::Rows,
        }
    }

    /// Axis along which this field is concatenated or selected.
    pub fn item_axis(&self) -> usize {
        match self.layout {
            FieldLayout::Rows => 0,
            FieldLayout::IndexPairs => 1,
        }
    }
}

/// Closed table from field name to [`FieldSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: BTreeMap<String, FieldSpec>,
}

impl FieldRegistry {
    /// Registry holding only the standard fields.
    pub fn standard() -> Self {
        use keys::*;
        use DType::{Bool, Float, Int};
        use FieldKind::{Edge, Node};

        let entries = [
            // graph
            (CELL, FieldSpec::graph(Float, &[3, 3])),
            (PBC, FieldSpec::graph(Bool, &[3])),
            (NUM_NODES, FieldSpec::graph(Int, &[])),
            (TOTAL_ENERGY, FieldSpec::graph(Float, &[1])),
            (STRESS, FieldSpec::graph(Float, &[3, 3])),
            (VIRIAL, FieldSpec::graph(Float, &[3, 3])),
            // node
            (POSITIONS, FieldSpec::node(Float, &[3])),
            (BATCH, FieldSpec::node(Int, &[])),
            (ATOMIC_NUMBERS, FieldSpec::node(Int, &[])),
            (ATOM_TYPES, FieldSpec::node(Int, &[])),
            (FORCES, FieldSpec::node(Float, &[3])),
            (ATOMIC_ENERGY, FieldSpec::node(Float, &[1])),
            (NODE_FEATURES, FieldSpec::any_shape(Node, Float)),
            (NODE_ATTRS, FieldSpec::any_shape(Node, Float)),
            // edge
            (EDGE_INDEX, FieldSpec::index_pairs()),
            (EDGE_CELL_SHIFT, FieldSpec::edge(Float, &[3])),
            (EDGE_VECTORS, FieldSpec::edge(Float, &[3])),
            (EDGE_LENGTH, FieldSpec::edge(Float, &[])),
            (EDGE_ATTRS, FieldSpec::any_shape(Edge, Float)),
            (EDGE_EMBEDDING, FieldSpec::any_shape(Edge, Float)),
            (EDGE_FEATURES, FieldSpec::any_shape(Edge, Float)),
            (EDGE_CUTOFF, FieldSpec::any_shape(Edge, Float)),
        ];

        Self {
            fields: entries
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        }
    }

    /// Classify a field name. `None` means unregistered.
    pub fn classify(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).map(|spec| spec.kind)
    }

    /// Look up a field's spec, failing on unregistered names.
    pub fn spec(&self, name: &str) -> Result<&FieldSpec> {
        self.fields
            .get(name)
            .ok_or_else(|| GraphError::unregistered(name))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Register a field.
    ///
    /// Registering an existing name with an identical spec is a no-op;
    /// a different spec is a [`RegistryConflict`](GraphError::RegistryConflict).
    pub fn register(&mut self, name: impl Into<String>, spec: FieldSpec) -> Result<()> {
        let name = name.into();
        match self.fields.get(&name) {
            Some(existing) if *existing == spec => Ok(()),
            Some(_) => Err(GraphError::RegistryConflict { name }),
            None => {
                tracing::debug!(field = %name, kind = %spec.kind, "registered field");
                self.fields.insert(name, spec);
                Ok(())
            }
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Result<Self> {
        self.register(name, spec)?;
        Ok(self)
    }

    /// Remove a field. Structural keys cannot be removed.
    pub fn deregister(&mut self, name: &str) -> Result<FieldSpec> {
        if keys::STRUCTURAL_KEYS.contains(&name) {
            return Err(GraphError::RegistryConflict {
                name: name.to_string(),
            });
        }
        self.fields
            .remove(name)
            .ok_or_else(|| GraphError::unregistered(name))
    }

    /// All registered fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
