//! Keyed field values.
//!
//! A [`Tensor`] is a dynamically-shaped array of `f64`, `i64` or `bool`.
//! Storage is reference-counted (`ArcArray`), so cloning a tensor or passing
//! it through an operation unchanged shares the backing buffer. Writes go
//! through copy-on-write and are never visible to other holders.

use ndarray::{ArcArray, Array, ArrayView, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GraphError, Result};

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 64-bit float, the data precision for all real-valued fields.
    Float,
    /// 64-bit signed integer, used for every index-valued field.
    Int,
    /// Boolean.
    Bool,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "f64"),
            Self::Int => write!(f, "i64"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// A field value: an n-dimensional array with shared storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    /// Real-valued array.
    Float(ArcArray<f64, IxDyn>),
    /// Integer array.
    Int(ArcArray<i64, IxDyn>),
    /// Boolean array.
    Bool(ArcArray<bool, IxDyn>),
}

// Apply the same array expression to whichever variant is present.
macro_rules! map_variant {
    ($tensor:expr, $a:ident => $body:expr) => {
        match $tensor {
            Tensor::Float($a) => Tensor::Float($body),
            Tensor::Int($a) => Tensor::Int($body),
            Tensor::Bool($a) => Tensor::Bool($body),
        }
    };
}

impl<D: Dimension> From<Array<f64, D>> for Tensor {
    fn from(array: Array<f64, D>) -> Self {
        Self::Float(array.into_dyn().into_shared())
    }
}

impl<D: Dimension> From<Array<i64, D>> for Tensor {
    fn from(array: Array<i64, D>) -> Self {
        Self::Int(array.into_dyn().into_shared())
    }
}

impl<D: Dimension> From<Array<bool, D>> for Tensor {
    fn from(array: Array<bool, D>) -> Self {
        Self::Bool(array.into_dyn().into_shared())
    }
}

impl Tensor {
    /// Element type.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Float(_) => DType::Float,
            Self::Int(_) => DType::Int,
            Self::Bool(_) => DType::Bool,
        }
    }

    /// Full shape.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(a) => a.shape(),
            Self::Int(a) => a.shape(),
            Self::Bool(a) => a.shape(),
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Length along `axis`, or `None` if the tensor has fewer dimensions.
    pub fn len_of(&self, axis: usize) -> Option<usize> {
        self.shape().get(axis).copied()
    }

    /// Shape after the leading dimension.
    pub fn item_shape(&self) -> &[usize] {
        let shape = self.shape();
        if shape.is_empty() {
            shape
        } else {
            &shape[1..]
        }
    }

    /// Borrow as a float array, failing with a dtype error naming `name`.
    pub fn as_float(&self, name: &str) -> Result<&ArcArray<f64, IxDyn>> {
        match self {
            Self::Float(a) => Ok(a),
            other => Err(dtype_error(name, DType::Float, other.dtype())),
        }
    }

    /// Borrow as an integer array, failing with a dtype error naming `name`.
    pub fn as_int(&self, name: &str) -> Result<&ArcArray<i64, IxDyn>> {
        match self {
            Self::Int(a) => Ok(a),
            other => Err(dtype_error(name, DType::Int, other.dtype())),
        }
    }

    /// Borrow as a boolean array, failing with a dtype error naming `name`.
    pub fn as_bool(&self, name: &str) -> Result<&ArcArray<bool, IxDyn>> {
        match self {
            Self::Bool(a) => Ok(a),
            other => Err(dtype_error(name, DType::Bool, other.dtype())),
        }
    }

    /// Gather `indices` along `axis` into a new tensor.
    ///
    /// Indices must be in bounds; callers derive them from the tensor's own
    /// length.
    pub fn select(&self, axis: Axis, indices: &[usize]) -> Tensor {
        map_variant!(self, a => a.select(axis, indices).into_shared())
    }

    /// Concatenate same-typed tensors along `axis`.
    ///
    /// `name` is only used to label errors.
    pub fn concatenate(name: &str, axis: Axis, parts: &[&Tensor]) -> Result<Tensor> {
        let first = parts.first().ok_or(GraphError::EmptyBatch)?;
        let dtype = first.dtype();
        if let Some(bad) = parts.iter().find(|t| t.dtype() != dtype) {
            return Err(dtype_error(name, dtype, bad.dtype()));
        }
        let out = match dtype {
            DType::Float => {
                let views = parts
                    .iter()
                    .map(|t| t.as_float(name).map(|a| a.view()))
                    .collect::<Result<Vec<_>>>()?;
                Tensor::Float(concat_views(views, axis)?)
            }
            DType::Int => {
                let views = parts
                    .iter()
                    .map(|t| t.as_int(name).map(|a| a.view()))
                    .collect::<Result<Vec<_>>>()?;
                Tensor::Int(concat_views(views, axis)?)
            }
            DType::Bool => {
                let views = parts
                    .iter()
                    .map(|t| t.as_bool(name).map(|a| a.view()))
                    .collect::<Result<Vec<_>>>()?;
                Tensor::Bool(concat_views(views, axis)?)
            }
        };
        Ok(out)
    }

    /// Deep copy into uniquely-owned, standard-layout storage.
    pub fn to_standard_layout(&self) -> Tensor {
        map_variant!(self, a => a.as_standard_layout().into_owned().into_shared())
    }

    /// Little-endian element bytes in logical (row-major) order.
    pub(crate) fn write_le_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Float(a) => a
                .iter()
                .for_each(|x| out.extend_from_slice(&x.to_bits().to_le_bytes())),
            Self::Int(a) => a.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            Self::Bool(a) => a.iter().for_each(|x| out.push(u8::from(*x))),
        }
    }
}

fn concat_views<A: Clone>(
    views: Vec<ArrayView<'_, A, IxDyn>>,
    axis: Axis,
) -> Result<ArcArray<A, IxDyn>> {
    Ok(ndarray::concatenate(axis, &views)?.into_shared())
}

fn dtype_error(name: &str, expected: DType, found: DType) -> GraphError {
    GraphError::DtypeMismatch {
        name: name.to_string(),
        expected,
        found,
    }
}
