//! Rebuilding embeddings and counting their free choices.
//!
//! Both passes walk a gene tree down the network from the root. At every
//! network node a gene lineage passes, the child branches whose heir sets
//! cover the lineage's heirs qualify: one qualifying child is forced, two are
//! a free choice. A rebuild draws free choices uniformly, a replay reads them
//! from the matrix. The number of free choices enters the Hastings ratio as
//! `(new - old) * ln 2`.

use crate::embedding::heirs::HeirSets;
use crate::embedding::matrix::EmbeddingMatrix;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::NodeIndex;
use crate::model::taxon_map::SpeciesAssignment;
use log::debug;
use rand::{Rng, RngCore};
use std::f64::consts::LN_2;

/// How free choices are resolved during a walk.
enum Mode<'r> {
    /// Draw free choices and write every visited cell.
    Resample { rng: &'r mut dyn RngCore, embedding: &'r mut EmbeddingMatrix },
    /// Follow the recorded cells without writing.
    Replay { embedding: &'r EmbeddingMatrix },
}

struct Walk<'a, 'r> {
    network: &'a Network,
    gene_tree: &'a GeneTree,
    heirs: HeirSets,
    mode: Mode<'r>,
    choices: usize,
}

impl Walk<'_, '_> {
    /// Embeds the lineage of `gene` from network node `node` downwards.
    fn embed(&mut self, gene: GeneIndex, node: NodeIndex) -> bool {
        let gene_height = self.gene_tree[gene].height();
        let gene_children = self.gene_tree[gene].children();
        let network_node = self.network.node(node);

        if gene_height < network_node.height() && !network_node.is_leaf() {
            let row = node - self.network.num_leaves();
            let qualifies = |direction: usize| {
                self.network.child(node, direction).is_some_and(|child| self.heirs.covers(child, gene))
            };
            let direction = match (qualifies(0), qualifies(1)) {
                (true, true) => {
                    self.choices += 1;
                    match &mut self.mode {
                        Mode::Resample { rng, .. } => Some(usize::from(rng.gen_bool(0.5))),
                        Mode::Replay { embedding } => embedding.direction(row, gene),
                    }
                }
                (true, false) => self.forced(row, gene, 0),
                (false, true) => self.forced(row, gene, 1),
                (false, false) => None,
            };
            let Some(direction) = direction else {
                return false;
            };
            if let Mode::Resample { embedding, .. } = &mut self.mode {
                embedding.set(row, gene, direction as i8);
            }
            match self.network.child(node, direction) {
                Some(child) => self.embed(gene, child),
                None => false,
            }
        } else {
            match gene_children {
                None => true,
                Some((left, right)) => self.embed(left, node) && self.embed(right, node),
            }
        }
    }

    /// A forced direction; on replay, the recorded cell has to agree.
    fn forced(&self, row: usize, gene: GeneIndex, direction: usize) -> Option<usize> {
        match &self.mode {
            Mode::Resample { .. } => Some(direction),
            Mode::Replay { embedding } => embedding.direction(row, gene).filter(|&d| d == direction),
        }
    }
}

/// Clears and rebuilds `embedding`, drawing every free choice uniformly.
///
/// # Returns
/// The number of free choices, or `None` if some gene lineage cannot be
/// embedded (the matrix is then partially written).
pub fn rebuild(
    network: &Network,
    gene_tree: &GeneTree,
    assignment: &SpeciesAssignment,
    embedding: &mut EmbeddingMatrix,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    embedding.reset(network.num_traversal_nodes(), gene_tree.num_nodes());
    let mut walk = Walk {
        network,
        gene_tree,
        heirs: HeirSets::compute(network, gene_tree, assignment),
        mode: Mode::Resample { rng, embedding },
        choices: 0,
    };
    if walk.embed(gene_tree.root_index(), network.root()) {
        Some(walk.choices)
    } else {
        debug!("gene tree {:?} cannot be embedded in the network", gene_tree.name());
        None
    }
}

/// Counts the free choices of the embedding as recorded, without writing.
///
/// # Returns
/// `None` if a recorded cell is unset or contradicts the heir sets, i.e. the
/// matrix is not a valid embedding of `gene_tree` in `network`.
pub fn count_choices(
    network: &Network,
    gene_tree: &GeneTree,
    assignment: &SpeciesAssignment,
    embedding: &EmbeddingMatrix,
) -> Option<usize> {
    if embedding.check_dimensions(network, gene_tree).is_err() {
        return None;
    }
    let mut walk = Walk {
        network,
        gene_tree,
        heirs: HeirSets::compute(network, gene_tree, assignment),
        mode: Mode::Replay { embedding },
        choices: 0,
    };
    if walk.embed(gene_tree.root_index(), network.root()) {
        Some(walk.choices)
    } else {
        debug!("recorded embedding of gene tree {:?} is not valid", gene_tree.name());
        None
    }
}

/// Result of re-embedding one gene tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebuildOutcome {
    pub success: bool,
    /// `(new - old) * ln 2`, negative infinity on failure.
    pub log_choice_delta: f64,
}

impl RebuildOutcome {
    pub fn failure() -> Self {
        Self { success: false, log_choice_delta: f64::NEG_INFINITY }
    }
}

/// Rebuilds `embedding` and relates its free choices to `old_choices`,
/// counted before the topology changed.
pub fn reembed(
    old_choices: Option<usize>,
    network: &Network,
    gene_tree: &GeneTree,
    assignment: &SpeciesAssignment,
    embedding: &mut EmbeddingMatrix,
    rng: &mut dyn RngCore,
) -> RebuildOutcome {
    let Some(old) = old_choices else {
        return RebuildOutcome::failure();
    };
    match rebuild(network, gene_tree, assignment, embedding, rng) {
        Some(new) => RebuildOutcome { success: true, log_choice_delta: choice_delta(old, new) },
        None => RebuildOutcome::failure(),
    }
}

/// Log ratio `(new - old) * ln 2` of the number of equally likely embeddings.
pub fn choice_delta(old: usize, new: usize) -> f64 {
    (new as f64 - old as f64) * LN_2
}
