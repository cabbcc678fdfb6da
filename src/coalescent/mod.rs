//! Coalescent statistics derived from an embedding.
//!
//! - [compute]: occupancy times, lineage counts, coalescent times and the log
//!   probability of the directions taken at reticulations
//! - [GeneTreeStatistics]: lazy per-gene-tree cache with store/restore

mod cache;
mod statistics;

pub use cache::GeneTreeStatistics;
pub use statistics::{Statistics, compute};
