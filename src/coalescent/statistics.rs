//! Coalescent statistics of one embedded gene tree.

use crate::embedding::matrix::EmbeddingMatrix;
use crate::error::EmbeddingError;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::{BranchNumber, NodeIndex};
use std::collections::BTreeMap;

/// Sufficient statistics of a gene tree embedded in a network.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Time each gene lineage spends in each branch, `[gene][branch]`.
    ///
    /// The root lineage extends to infinity above the network root, so its
    /// entry on the root branch is infinite.
    pub occupancy: Vec<Vec<f64>>,
    /// Heights of coalescent events per branch, increasing.
    pub coalescent_times: BTreeMap<BranchNumber, Vec<f64>>,
    /// Number of lineages at the tipward end of each branch, by branch number.
    pub lineage_counts: Vec<usize>,
    /// Log probability of the directions taken at reticulations.
    pub log_gamma_sum: f64,
}

impl Statistics {
    fn new(num_genes: usize, num_branches: usize) -> Self {
        Self {
            occupancy: vec![vec![0.0; num_branches]; num_genes],
            coalescent_times: BTreeMap::new(),
            lineage_counts: vec![0; num_branches],
            log_gamma_sum: 0.0,
        }
    }

    /// Returns the coalescent times in `branch`, empty if there are none.
    pub fn coalescent_times_in(&self, branch: BranchNumber) -> &[f64] {
        self.coalescent_times.get(&branch).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the summed occupancy of one gene lineage over all branches.
    pub fn total_occupancy(&self, gene: GeneIndex) -> f64 {
        self.occupancy[gene].iter().sum()
    }
}

struct Recursion<'a> {
    network: &'a Network,
    gene_tree: &'a GeneTree,
    embedding: &'a EmbeddingMatrix,
    gammas: &'a [f64],
    /// Reticulation number of each node, if any
    reticulation_numbers: Vec<Option<usize>>,
    stats: Statistics,
}

impl Recursion<'_> {
    /// Follows `gene` from `node`, having entered it through `branch` from
    /// `upper` (the height where the lineage entered `branch`).
    fn descend(&mut self, gene: GeneIndex, node: NodeIndex, branch: BranchNumber, upper: f64) -> Result<(), EmbeddingError> {
        let gene_node = &self.gene_tree[gene];
        let (gene_height, gene_children) = (gene_node.height(), gene_node.children());
        let network_node = self.network.node(node);
        let node_height = network_node.height();

        if gene_height < node_height && !network_node.is_leaf() {
            // The lineage passes the node
            self.stats.occupancy[gene][branch] += upper - node_height;
            self.stats.lineage_counts[branch] += 1;

            if let Some(number) = self.reticulation_numbers[node] {
                let gamma = self.gammas[number];
                let arrived_by_gamma_branch = network_node.parent_branches()[0] == branch;
                self.stats.log_gamma_sum += if arrived_by_gamma_branch { gamma.ln() } else { (1.0 - gamma).ln() };
            }

            let row = node - self.network.num_leaves();
            let direction = self.embedding.get(row, gene);
            if direction < 0 {
                return Err(EmbeddingError::Untraversed { node, gene });
            }
            let next_branch = network_node
                .child_branch(direction as usize)
                .ok_or(EmbeddingError::MissingChild { node, gene, direction })?;
            let next_node = self.network.node_for_branch(next_branch);
            self.descend(gene, next_node, next_branch, node_height)
        } else {
            match gene_children {
                None => {
                    self.stats.occupancy[gene][branch] += upper - gene_height;
                    self.stats.lineage_counts[branch] += 1;
                    Ok(())
                }
                Some((left, right)) => {
                    self.stats.occupancy[gene][branch] += upper - gene_height;
                    self.stats.coalescent_times.entry(branch).or_default().push(gene_height);
                    self.descend(left, node, branch, gene_height)?;
                    self.descend(right, node, branch, gene_height)
                }
            }
        }
    }
}

/// Computes the coalescent statistics of `gene_tree` as embedded by `embedding`.
///
/// `gammas` holds the inheritance probability of each reticulation by
/// reticulation number. A γ of `0` or `1` yields a log gamma sum of negative
/// infinity if a lineage takes the impossible direction.
///
/// # Errors
/// * [EmbeddingError::Dimensions] if the matrix does not fit the node counts
/// * [EmbeddingError::GammaCount] if `gammas` does not fit the reticulations
/// * [EmbeddingError::Untraversed] / [EmbeddingError::MissingChild] if the
///   embedding does not describe a traversal of the network
pub fn compute(
    network: &Network,
    gene_tree: &GeneTree,
    embedding: &EmbeddingMatrix,
    gammas: &[f64],
) -> Result<Statistics, EmbeddingError> {
    embedding.check_dimensions(network, gene_tree)?;
    let num_reticulations = network.num_reticulations();
    if gammas.len() != num_reticulations {
        return Err(EmbeddingError::GammaCount { found: gammas.len(), expected: num_reticulations });
    }

    let mut reticulation_numbers = vec![None; network.num_nodes()];
    for (number, node) in network.reticulation_nodes().into_iter().enumerate() {
        reticulation_numbers[node] = Some(number);
    }

    let mut recursion = Recursion {
        network,
        gene_tree,
        embedding,
        gammas,
        reticulation_numbers,
        stats: Statistics::new(gene_tree.num_nodes(), network.branches().len()),
    };
    recursion.descend(gene_tree.root_index(), network.root(), network.root_branch(), f64::INFINITY)?;

    let mut stats = recursion.stats;
    for times in stats.coalescent_times.values_mut() {
        times.sort_by(f64::total_cmp);
    }
    Ok(stats)
}
