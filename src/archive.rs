//! Persisted form of a graph.
//!
//! An archive is the flat name-to-array mapping plus the classification of
//! every field, so a reader can rebuild structural fields without sharing
//! the writer's registry. Serialized as JSON.
//!
//! Non-finite floats do not survive JSON; archive only finite data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::graph_fingerprint;
use crate::error::{GraphError, Result};
use crate::registry::{FieldRegistry, FieldSpec};
use crate::types::{AtomicGraph, Tensor};
use crate::GRAPH_SCHEMA_VERSION;

/// Serializable snapshot of an [`AtomicGraph`] and its field rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphArchive {
    /// Archive layout version.
    pub schema_version: u32,
    /// Field values by name.
    pub fields: BTreeMap<String, Tensor>,
    /// Registered spec of every archived field.
    pub kinds: BTreeMap<String, FieldSpec>,
    /// [`graph_fingerprint`] of the archived graph.
    pub fingerprint: String,
}

impl GraphArchive {
    /// Snapshot `graph`. Every field must be registered.
    pub fn new(registry: &FieldRegistry, graph: &AtomicGraph) -> Result<Self> {
        let kinds = graph
            .keys()
            .map(|name| Ok((name.to_string(), registry.spec(name)?.clone())))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            schema_version: GRAPH_SCHEMA_VERSION,
            fields: graph.clone().into_fields(),
            kinds,
            fingerprint: graph_fingerprint(graph),
        })
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the graph.
    ///
    /// Archived specs are registered into a copy of `registry`; a spec that
    /// conflicts with an existing entry is an error. The content must match
    /// the stored fingerprint and pass [`FieldRegistry::validate`].
    pub fn restore(&self, registry: &FieldRegistry) -> Result<(AtomicGraph, FieldRegistry)> {
        if self.schema_version != GRAPH_SCHEMA_VERSION {
            return Err(GraphError::InvalidConfig(format!(
                "unsupported archive schema version {} (expected {})",
                self.schema_version, GRAPH_SCHEMA_VERSION
            )));
        }

        let mut restored_registry = registry.clone();
        for (name, spec) in &self.kinds {
            restored_registry.register(name.clone(), spec.clone())?;
        }

        let graph = AtomicGraph::from(self.fields.clone());
        let found = graph_fingerprint(&graph);
        if found != self.fingerprint {
            return Err(GraphError::FingerprintMismatch {
                expected: self.fingerprint.clone(),
                found,
            });
        }
        restored_registry.validate(&graph)?;

        tracing::debug!(fields = graph.len(), fingerprint = %found, "restored graph archive");
        Ok((graph, restored_registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{keys, FieldKind};
    use crate::types::DType;
    use ndarray::array;

    fn sample() -> AtomicGraph {
        AtomicGraph::new()
            .with(keys::POSITIONS, array![[0.1, 0.2, 0.3], [1.0 / 3.0, 0.0, -2.5]])
            .with(keys::EDGE_INDEX, array![[0_i64, 1], [1, 0]])
            .with(keys::BATCH, array![0_i64, 0])
            .with(keys::NUM_NODES, array![2_i64])
    }

    #[test]
    fn test_json_round_trip() {
        let registry = FieldRegistry::standard();
        let archive = GraphArchive::new(&registry, &sample()).unwrap();
        let json = archive.to_json().unwrap();
        let parsed = GraphArchive::from_json(&json).unwrap();
        assert_eq!(parsed, archive);

        let (graph, _) = parsed.restore(&registry).unwrap();
        assert_eq!(graph, sample());
    }

    #[test]
    fn test_custom_field_travels_with_archive() {
        let spec = FieldSpec::node(DType::Float, &[2]);
        let writer = FieldRegistry::standard().with_field("charges", spec.clone()).unwrap();
        let g = sample().with("charges", array![[0.5, -0.5], [1.0, 0.0]]);
        let archive = GraphArchive::new(&writer, &g).unwrap();

        let (graph, registry) = archive.restore(&FieldRegistry::standard()).unwrap();
        assert_eq!(graph, g);
        assert_eq!(registry.classify("charges"), Some(FieldKind::Node));
    }

    #[test]
    fn test_conflicting_spec_rejected() {
        let registry = FieldRegistry::standard();
        let mut archive = GraphArchive::new(&registry, &sample()).unwrap();
        archive
            .kinds
            .insert(keys::POSITIONS.to_string(), FieldSpec::graph(DType::Float, &[3]));
        assert!(matches!(
            archive.restore(&registry),
            Err(GraphError::RegistryConflict { .. })
        ));
    }

    #[test]
    fn test_tampered_content_rejected() {
        let registry = FieldRegistry::standard();
        let mut archive = GraphArchive::new(&registry, &sample()).unwrap();
        archive
            .fields
            .insert(keys::NUM_NODES.to_string(), Tensor::from(array![3_i64]));
        assert!(matches!(
            archive.restore(&registry),
            Err(GraphError::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn test_unregistered_field_not_archived() {
        let registry = FieldRegistry::standard();
        let g = sample().with("mystery", array![1.0, 2.0]);
        assert!(matches!(
            GraphArchive::new(&registry, &g),
            Err(GraphError::UnregisteredField { .. })
        ));
    }
}
