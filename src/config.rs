//! Configuration of operators and statistics.
//!
//! All configurations implement [Default], `with_*` builder methods, and serde
//! (de)serialization with defaults for missing fields, so a host can read
//! them from its own settings file.
//!
//! # Example
//! ```
//! use speciesnetwork::config::NodeSliderConfig;
//!
//! let config = NodeSliderConfig::default().with_window_size(0.05);
//! assert_eq!(config.window_size, 0.05);
//! assert_eq!(config.origin_upper_bound, f64::INFINITY);
//! ```

use serde::{Deserialize, Serialize};

/// Settings of the [NodeSlider](crate::operators::NodeSlider).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSliderConfig {
    /// Width of the sliding window around the current height
    pub window_size: f64,
    /// Upper bound of the origin height
    #[serde(with = "infinite_as_none")]
    pub origin_upper_bound: f64,
}

impl Default for NodeSliderConfig {
    fn default() -> Self {
        Self { window_size: 0.01, origin_upper_bound: f64::INFINITY }
    }
}

impl NodeSliderConfig {
    pub fn with_window_size(mut self, window_size: f64) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_origin_upper_bound(mut self, origin_upper_bound: f64) -> Self {
        self.origin_upper_bound = origin_upper_bound;
        self
    }
}

/// Settings of the reversible-jump pair
/// [AddReticulation](crate::operators::AddReticulation) /
/// [DeleteReticulation](crate::operators::DeleteReticulation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReticulationJumpConfig {
    /// Rate λ of the exponential offset of cut points on the root branch
    pub root_branch_rate: f64,
}

impl Default for ReticulationJumpConfig {
    fn default() -> Self {
        Self { root_branch_rate: 1.0 }
    }
}

impl ReticulationJumpConfig {
    pub fn with_root_branch_rate(mut self, root_branch_rate: f64) -> Self {
        self.root_branch_rate = root_branch_rate;
        self
    }
}

/// Settings of [GeneTreeStatistics](crate::coalescent::GeneTreeStatistics).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Copy number of the locus
    pub ploidy: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self { ploidy: 2.0 }
    }
}

impl StatisticsConfig {
    pub fn with_ploidy(mut self, ploidy: f64) -> Self {
        self.ploidy = ploidy;
        self
    }
}

/// JSON has no infinity; an unbounded value is written as `null`.
mod infinite_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
