//! Core types: tensors, the keyed graph, and structure ingestion.

pub mod graph;
pub mod structure;
pub mod tensor;

pub use graph::AtomicGraph;
pub use structure::{Pbc, StructureBuilder};
pub use tensor::{DType, Tensor};
