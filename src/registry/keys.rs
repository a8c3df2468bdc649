//! Standard field names.

/// Node positions, `(N, 3)`.
pub const POSITIONS: &str = "pos";
/// Owning frame of each node, `(N,)`.
pub const BATCH: &str = "batch";
/// Per-frame node counts, `(F,)`.
pub const NUM_NODES: &str = "num_nodes";
/// Periodic cell as row vectors, `(F, 3, 3)`.
pub const CELL: &str = "cell";
/// Per-axis periodic flags, `(F, 3)`.
pub const PBC: &str = "pbc";

/// Source and target node of each edge, `(2, E)`.
pub const EDGE_INDEX: &str = "edge_index";
/// Lattice-vector coefficients of the target image, `(E, 3)`.
pub const EDGE_CELL_SHIFT: &str = "edge_cell_shift";
/// Edge displacement vectors, `(E, 3)`.
pub const EDGE_VECTORS: &str = "edge_vectors";
/// Edge lengths, `(E,)`.
pub const EDGE_LENGTH: &str = "edge_lengths";
/// Edge attributes.
pub const EDGE_ATTRS: &str = "edge_attrs";
/// Edge radial embedding.
pub const EDGE_EMBEDDING: &str = "edge_embedding";
/// Edge features.
pub const EDGE_FEATURES: &str = "edge_features";
/// Edge cutoff envelope values.
pub const EDGE_CUTOFF: &str = "edge_cutoff";

/// Atomic numbers, `(N,)`.
pub const ATOMIC_NUMBERS: &str = "atomic_numbers";
/// Model species index, `(N,)`.
pub const ATOM_TYPES: &str = "atom_types";
/// Node input features.
pub const NODE_FEATURES: &str = "node_features";
/// Node attributes.
pub const NODE_ATTRS: &str = "node_attrs";
/// Per-atom forces, `(N, 3)`.
pub const FORCES: &str = "forces";
/// Per-atom energies, `(N, 1)`.
pub const ATOMIC_ENERGY: &str = "atomic_energy";

/// Total energy per frame, `(F, 1)`.
pub const TOTAL_ENERGY: &str = "total_energy";
/// Stress tensor per frame, `(F, 3, 3)`.
pub const STRESS: &str = "stress";
/// Virial tensor per frame, `(F, 3, 3)`.
pub const VIRIAL: &str = "virial";

/// Keys that carry batch structure and can never be deregistered.
pub const STRUCTURAL_KEYS: [&str; 5] = [EDGE_INDEX, BATCH, NUM_NODES, CELL, PBC];
