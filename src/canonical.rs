//! Canonical hashing for configurations and graphs.
//!
//! ## Determinism Guarantees
//!
//! - Fields are visited in sorted name order (graphs are `BTreeMap`-backed)
//! - Array elements are hashed in logical row-major order, so two graphs
//!   with equal contents hash equally whatever their memory layout or
//!   storage sharing
//! - Floats are hashed by bit pattern, little-endian

use serde::Serialize;
use xxhash_rust::xxh64::{xxh64, Xxh64};

use crate::error::Result;
use crate::types::AtomicGraph;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

/// Content fingerprint of a graph as a 16-digit hex string.
///
/// Covers every field name, dtype, shape and element value.
pub fn graph_fingerprint(graph: &AtomicGraph) -> String {
    let mut hasher = Xxh64::new(0);
    let mut buf = Vec::new();
    for (name, tensor) in graph.iter() {
        buf.clear();
        buf.extend_from_slice(&(name.len() as u64).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(tensor.dtype().to_string().as_bytes());
        buf.extend_from_slice(&(tensor.ndim() as u64).to_le_bytes());
        for &dim in tensor.shape() {
            buf.extend_from_slice(&(dim as u64).to_le_bytes());
        }
        tensor.write_le_bytes(&mut buf);
        hasher.update(&buf);
    }
    format!("{:016x}", hasher.digest())
}
