//! The keyed-tensor atomic graph.

use ndarray::{ArrayView1, ArrayView2, ArrayView3, Ix1, Ix2, Ix3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GraphError, Result};
use crate::registry::keys;
use super::tensor::Tensor;

/// One or more atomic structures fused into a single graph.
///
/// A flat mapping from field name to [`Tensor`]. There are no per-frame
/// objects: frames are recovered from the `batch` and `num_nodes` fields.
/// Keys iterate in sorted order so every traversal is deterministic.
///
/// Cloning is cheap; tensors share storage until written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomicGraph {
    fields: BTreeMap<String, Tensor>,
}

impl AtomicGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.fields.get(name)
    }

    /// Get a field that must be present.
    pub fn field(&self, name: &str) -> Result<&Tensor> {
        self.fields.get(name).ok_or_else(|| GraphError::missing(name))
    }

    /// Whether a field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Option<Tensor> {
        self.fields.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.fields.remove(name)
    }

    /// Field names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the graph has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume into the underlying map.
    pub fn into_fields(self) -> BTreeMap<String, Tensor> {
        self.fields
    }

    /// Whether batch bookkeeping (`batch` and `num_nodes`) is present.
    pub fn is_batched(&self) -> bool {
        self.contains(keys::BATCH) && self.contains(keys::NUM_NODES)
    }

    /// Number of frames: `len(num_nodes)`, or 1 when `num_nodes` is absent.
    pub fn num_frames(&self) -> usize {
        self.get(keys::NUM_NODES)
            .and_then(|t| t.len_of(0))
            .unwrap_or(1)
    }

    /// Total node count `len(pos)`.
    pub fn num_nodes(&self) -> Result<usize> {
        let pos = self.field(keys::POSITIONS)?;
        pos.len_of(0)
            .ok_or_else(|| GraphError::shape(keys::POSITIONS, "(N, 3)", pos.shape()))
    }

    /// Total edge count `edge_index.shape[1]`.
    pub fn num_edges(&self) -> Result<usize> {
        Ok(self.edge_index()?.ncols())
    }

    /// Per-frame node counts. A graph without `num_nodes` is one frame.
    ///
    /// A negative count is a [`ShapeMismatch`](GraphError::ShapeMismatch).
    pub fn frame_sizes(&self) -> Result<Vec<usize>> {
        if !self.contains(keys::NUM_NODES) {
            return Ok(vec![self.num_nodes()?]);
        }
        let counts = self.int1(keys::NUM_NODES)?;
        counts
            .iter()
            .map(|&n| {
                usize::try_from(n).map_err(|_| {
                    GraphError::shape(keys::NUM_NODES, "non-negative counts", &[counts.len()])
                })
            })
            .collect()
    }

    /// Node positions as `(N, 3)`.
    pub fn positions(&self) -> Result<ArrayView2<'_, f64>> {
        self.float2(keys::POSITIONS)
    }

    /// Edge index as `(2, E)`.
    pub fn edge_index(&self) -> Result<ArrayView2<'_, i64>> {
        self.int2(keys::EDGE_INDEX)
    }

    /// Cell as `(F, 3, 3)`, if present.
    pub fn cell(&self) -> Result<Option<ArrayView3<'_, f64>>> {
        if !self.contains(keys::CELL) {
            return Ok(None);
        }
        let t = self.field(keys::CELL)?;
        t.as_float(keys::CELL)?
            .view()
            .into_dimensionality::<Ix3>()
            .map(Some)
            .map_err(|_| GraphError::shape(keys::CELL, "(F, 3, 3)", t.shape()))
    }

    /// 1-D float field.
    pub fn float1(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let t = self.field(name)?;
        t.as_float(name)?
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| GraphError::shape(name, "1-D", t.shape()))
    }

    /// 2-D float field.
    pub fn float2(&self, name: &str) -> Result<ArrayView2<'_, f64>> {
        let t = self.field(name)?;
        t.as_float(name)?
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| GraphError::shape(name, "2-D", t.shape()))
    }

    /// 1-D integer field.
    pub fn int1(&self, name: &str) -> Result<ArrayView1<'_, i64>> {
        let t = self.field(name)?;
        t.as_int(name)?
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| GraphError::shape(name, "1-D", t.shape()))
    }

    /// 2-D integer field.
    pub fn int2(&self, name: &str) -> Result<ArrayView2<'_, i64>> {
        let t = self.field(name)?;
        t.as_int(name)?
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| GraphError::shape(name, "2-D", t.shape()))
    }

    /// Apply a fallible map to every field.
    ///
    /// This is the hook for moving a graph between storage locations: the
    /// map is applied uniformly and independently per field.
    pub fn map_fields<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str, Tensor) -> Result<Tensor>,
    {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, value)| {
                let mapped = f(&name, value)?;
                Ok((name, mapped))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { fields })
    }

    /// Copy every field into fresh, uniquely-owned, standard-layout storage.
    ///
    /// The result shares nothing with `self`. Idempotent.
    pub fn detached(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_standard_layout()))
                .collect(),
        }
    }
}

impl FromIterator<(String, Tensor)> for AtomicGraph {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Tensor>> for AtomicGraph {
    fn from(fields: BTreeMap<String, Tensor>) -> Self {
        Self { fields }
    }
}
