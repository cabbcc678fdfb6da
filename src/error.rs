//! Error types outside of parsing.
//!
//! - [StructuralFault]: a violated network invariant, i.e. a bug in surgery code.
//! - [EmbeddingError]: an embedding that cannot be read against its network and gene tree.
//! - [SetupError]: inconsistent inputs when assembling a [State](crate::state::State).
//!
//! Rejected proposals are not errors; they are signalled by a log Hastings
//! ratio of negative infinity.

use crate::model::gene_tree::GeneIndex;
use crate::model::network_node::{BranchNumber, NodeIndex, NodeKind};
use thiserror::Error;

/// Violation of a structural network invariant, reported by
/// [Network::check_sanity](crate::model::network::Network::check_sanity).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralFault {
    #[error("network has no origin")]
    MissingOrigin,
    #[error("network has {0} origins")]
    MultipleOrigins(usize),
    #[error("node at position {position} claims index {stored}")]
    IndexMismatch { position: NodeIndex, stored: NodeIndex },
    #[error("leaf {0} is not among the first leaf indices")]
    LeavesNotFirst(NodeIndex),
    #[error("node {node} ({kind:?}) has {found} parent branches, expected {expected}")]
    ParentDegree { node: NodeIndex, kind: NodeKind, found: usize, expected: usize },
    #[error("node {node} ({kind:?}) has {found} child branches, expected {expected}")]
    ChildDegree { node: NodeIndex, kind: NodeKind, found: usize, expected: usize },
    #[error("node {node} references branch {branch}, which does not exist")]
    DanglingBranch { node: NodeIndex, branch: BranchNumber },
    #[error("branch {branch} is shared by nodes {first} and {second}")]
    SharedBranch { branch: BranchNumber, first: NodeIndex, second: NodeIndex },
    #[error("branch {branch} does not link node {node} as recorded")]
    LinkMismatch { branch: BranchNumber, node: NodeIndex },
    #[error("branch {0} is not referenced by both of its endpoints")]
    OrphanBranch(BranchNumber),
    #[error("network has {found} branches, node kinds imply {expected}")]
    BranchCount { found: usize, expected: usize },
    #[error("height inversion on branch {branch}: parent at {parent_height}, child at {child_height}")]
    HeightInversion { branch: BranchNumber, parent_height: f64, child_height: f64 },
    #[error("reticulation {0} has no valid inheritance probability")]
    InvalidGamma(NodeIndex),
    #[error("node {0} cannot be reached from the origin")]
    Unreachable(NodeIndex),
}

/// Embedding that does not describe a traversal of its network,
/// e.g. because it was not rebuilt after a topology change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("embedding is {found_rows}x{found_cols}, expected {rows}x{cols}")]
    Dimensions { rows: usize, cols: usize, found_rows: usize, found_cols: usize },
    #[error("gene node {gene} has no recorded direction at network node {node}")]
    Untraversed { node: NodeIndex, gene: GeneIndex },
    #[error("gene node {gene} takes direction {direction} at network node {node}, which has no such child")]
    MissingChild { node: NodeIndex, gene: GeneIndex, direction: i8 },
    #[error("got {found} inheritance probabilities for {expected} reticulations")]
    GammaCount { found: usize, expected: usize },
}

/// Inconsistent inputs when setting up the embedded state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("leaf {0} of gene tree has no label")]
    UnlabelledLeaf(GeneIndex),
    #[error("no species recorded for gene leaf '{0}'")]
    UnknownTaxon(String),
    #[error("species '{0}' is not a leaf of the network")]
    UnknownSpecies(String),
    #[error("invalid gene tree: {0}")]
    InvalidGeneTree(String),
    #[error("network is malformed: {0}")]
    Network(#[from] StructuralFault),
}
