//! Neighbor list configuration.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! `r_max` is quantized before hashing: multiplied by 1e6 and rounded to
//! i64. Two configurations that differ below that resolution share a
//! `params_hash`.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::error::{GraphError, Result};

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Parameters for building a neighbor list.
///
/// ## Parameters
///
/// - `r_max`: Cutoff radius; pairs at distance `< r_max` become edges
/// - `self_interaction`: Keep `(i, i)` edges with a zero shift
/// - `strict_self_interaction`: Only zero-shift self-edges are affected by
///   `self_interaction`. When `false` (and `self_interaction` is `false`),
///   every `i == j` edge is dropped, periodic images included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborListConfig {
    /// Cutoff radius, in the units of the positions.
    pub r_max: f64,
    /// Whether an atom is its own neighbor at zero shift.
    pub self_interaction: bool,
    /// Restrict `self_interaction` to zero-shift self-edges.
    pub strict_self_interaction: bool,
}

impl NeighborListConfig {
    /// Config with cutoff `r_max` and default self-interaction handling.
    pub fn new(r_max: f64) -> Self {
        Self {
            r_max,
            ..Self::default()
        }
    }

    /// Builder-style setter for `self_interaction`.
    pub fn with_self_interaction(mut self, enabled: bool) -> Self {
        self.self_interaction = enabled;
        self
    }

    /// Builder-style setter for `strict_self_interaction`.
    pub fn with_strict_self_interaction(mut self, strict: bool) -> Self {
        self.strict_self_interaction = strict;
        self
    }

    /// Reject a cutoff that is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !self.r_max.is_finite() || self.r_max <= 0.0 {
            return Err(GraphError::InvalidConfig(format!(
                "r_max must be positive and finite, got {}",
                self.r_max
            )));
        }
        Ok(())
    }

    /// Whether a self-edge `(i, i)` with the given shift is emitted.
    pub fn keeps_self_edge(&self, zero_shift: bool) -> bool {
        if self.self_interaction {
            return true;
        }
        self.strict_self_interaction && !zero_shift
    }

    /// Stable hex fingerprint of the quantized parameters.
    pub fn params_hash(&self) -> Result<String> {
        canonical_hash_hex(&QuantizedNeighborListConfig {
            r_max: quantize_float(self.r_max),
            self_interaction: self.self_interaction,
            strict_self_interaction: self.strict_self_interaction,
        })
    }
}

impl Default for NeighborListConfig {
    fn default() -> Self {
        Self {
            r_max: 5.0,
            self_interaction: false,
            strict_self_interaction: true,
        }
    }
}

fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

#[derive(Serialize)]
struct QuantizedNeighborListConfig {
    r_max: i64,
    self_interaction: bool,
    strict_self_interaction: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NeighborListConfig::default();
        assert!(!config.self_interaction);
        assert!(config.strict_self_interaction);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_cutoff() {
        for r in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                NeighborListConfig::new(r).validate(),
                Err(GraphError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_params_hash_deterministic() {
        let a = NeighborListConfig::new(4.0);
        let b = NeighborListConfig::new(4.0);
        let hash = a.params_hash().unwrap();
        assert_eq!(hash, b.params_hash().unwrap());
        assert_eq!(hash.len(), 16);

        let c = NeighborListConfig::new(4.5);
        assert_ne!(hash, c.params_hash().unwrap());

        // below quantization resolution
        let d = NeighborListConfig::new(4.0 + 1e-9);
        assert_eq!(hash, d.params_hash().unwrap());
    }

    #[test]
    fn test_self_edge_policy() {
        let strict = NeighborListConfig::default();
        assert!(!strict.keeps_self_edge(true));
        assert!(strict.keeps_self_edge(false));

        let loose = NeighborListConfig::default().with_strict_self_interaction(false);
        assert!(!loose.keeps_self_edge(true));
        assert!(!loose.keeps_self_edge(false));

        let all = NeighborListConfig::default().with_self_interaction(true);
        assert!(all.keeps_self_edge(true));
    }

    #[test]
    fn test_serde_defaults() {
        let config: NeighborListConfig = serde_json::from_str(r#"{"r_max": 3.5}"#).unwrap();
        assert_eq!(config, NeighborListConfig::new(3.5));
    }
}
