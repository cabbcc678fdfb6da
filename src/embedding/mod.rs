//! Embeddings of gene trees in the network.
//!
//! - [matrix]: the [EmbeddingMatrix] of traversal directions
//! - [heirs]: heir sets of gene and network nodes
//! - [rebuild]: rebuilding an embedding and counting its free choices

pub mod heirs;
pub mod matrix;
pub mod rebuild;

pub use heirs::{HeirSet, HeirSets};
pub use matrix::{EmbeddingMatrix, NOT_TRAVERSED};
pub use rebuild::{RebuildOutcome, choice_delta, count_choices, rebuild, reembed};
