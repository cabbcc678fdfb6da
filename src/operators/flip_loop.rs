//! Rerouting of gene lineages through the loop above a reticulation.

use crate::embedding::matrix::{EmbeddingMatrix, NOT_TRAVERSED};
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::{BranchNumber, NodeIndex};
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Branches from the top of a loop down to its reticulation.
type LoopPath = Vec<BranchNumber>;

/// Moves one gene lineage to another path through a network loop.
///
/// A reticulation is picked uniformly; the *loop top* is the lowest node
/// ancestral to both of its parents. Among the gene nodes below the
/// reticulation whose lineage runs from the top to the reticulation along
/// the recorded directions, one is picked uniformly and rerouted along a
/// uniformly picked other top-to-reticulation path. Its descendants lie
/// entirely below the reticulation and keep their cells.
///
/// Only the embedding changes. The move is symmetric (log Hastings ratio
/// `0`); it rejects if no lineage or no alternative path exists.
#[derive(Debug, Clone, Default)]
pub struct FlipNetworkLoop {
    gene_tree: Option<usize>,
}

impl FlipNetworkLoop {
    /// Creates an operator that picks a gene tree uniformly per proposal.
    pub fn new() -> Self {
        Self { gene_tree: None }
    }

    /// Creates an operator acting on gene tree `gene_tree` only.
    pub fn for_gene_tree(gene_tree: usize) -> Self {
        Self { gene_tree: Some(gene_tree) }
    }

    /// Reroutes a lineage of gene tree `i` through the loop above `reticulation`.
    pub fn flip(&self, state: &mut State, i: usize, reticulation: NodeIndex, rng: &mut dyn RngCore) -> f64 {
        let (network, gene_tree, _, embedding) = state.embedding_parts_mut(i);
        if embedding.check_dimensions(network, gene_tree).is_err() {
            debug!("{}: embedding of gene tree {i} is stale", self.name());
            return f64::NEG_INFINITY;
        }
        if reticulation >= network.num_nodes() || !network.node(reticulation).is_reticulation() {
            return f64::NEG_INFINITY;
        }
        let Some((top, in_loop)) = loop_top(network, reticulation) else {
            return f64::NEG_INFINITY;
        };
        let paths = loop_paths(network, top, reticulation, &in_loop);
        if paths.len() < 2 {
            debug!("{}: single path from {top} to {reticulation}", self.name());
            return f64::NEG_INFINITY;
        }

        let bottom_height = network.node(reticulation).height();
        let candidates: Vec<(GeneIndex, LoopPath)> = (0..gene_tree.num_nodes())
            .filter(|&gene| gene_tree[gene].height() < bottom_height)
            .filter_map(|gene| recorded_path(network, gene_tree, embedding, gene, top, reticulation).map(|p| (gene, p)))
            .collect();
        let Some((gene, old_path)) = candidates.choose(rng) else {
            debug!("{}: no lineage runs from {top} to {reticulation}", self.name());
            return f64::NEG_INFINITY;
        };
        let alternatives: Vec<&LoopPath> = paths.iter().filter(|p| *p != old_path).collect();
        let Some(&new_path) = alternatives.choose(rng) else {
            return f64::NEG_INFINITY;
        };

        let Some(new_cells) = path_cells(network, new_path) else {
            return f64::NEG_INFINITY;
        };
        trace!("{}: gene node {gene} from {old_path:?} to {new_path:?}", self.name());

        embedding.start_editing(self.name());
        for &branch in old_path {
            if let Some(row) = network.traversal_index(network.branch_parent(branch)) {
                embedding.set(row, *gene, NOT_TRAVERSED);
            }
        }
        for (row, direction) in new_cells {
            embedding.set(row, *gene, direction);
        }
        0.0
    }
}

impl Operator for FlipNetworkLoop {
    fn name(&self) -> &str {
        "FlipNetworkLoop"
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let num_gene_trees = state.num_gene_trees();
        if num_gene_trees == 0 {
            return f64::NEG_INFINITY;
        }
        let i = self.gene_tree.unwrap_or_else(|| rng.gen_range(0..num_gene_trees));
        let Some(&reticulation) = state.network().reticulation_nodes().choose(rng) else {
            debug!("{}: network has no reticulation", self.name());
            return f64::NEG_INFINITY;
        };
        self.flip(state, i, reticulation, rng)
    }
}

/// Marks all nodes reachable rootward from `start`, including itself.
fn tag_ancestors(network: &Network, start: NodeIndex) -> Vec<bool> {
    let mut tagged = vec![false; network.num_nodes()];
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if !std::mem::replace(&mut tagged[node], true) {
            stack.extend(network.parents(node));
        }
    }
    tagged
}

/// Finds the loop top of `reticulation`, along with the nodes ancestral to
/// either of its parents.
fn loop_top(network: &Network, reticulation: NodeIndex) -> Option<(NodeIndex, Vec<bool>)> {
    let a = tag_ancestors(network, network.parent(reticulation, 0)?);
    let b = tag_ancestors(network, network.parent(reticulation, 1)?);

    let top = (0..network.num_nodes())
        .filter(|&n| a[n] && b[n])
        .min_by(|&x, &y| network.node(x).height().total_cmp(&network.node(y).height()))?;
    let in_loop = a.iter().zip(&b).map(|(&a, &b)| a || b).collect();
    Some((top, in_loop))
}

/// Enumerates all paths from `top` down to `bottom` through nodes in `in_loop`.
fn loop_paths(network: &Network, top: NodeIndex, bottom: NodeIndex, in_loop: &[bool]) -> Vec<LoopPath> {
    fn extend(
        network: &Network,
        node: NodeIndex,
        bottom: NodeIndex,
        in_loop: &[bool],
        current: &mut LoopPath,
        paths: &mut Vec<LoopPath>,
    ) {
        if node == bottom {
            paths.push(current.clone());
            return;
        }
        for &branch in network.node(node).child_branches() {
            let child = network.node_for_branch(branch);
            if child == bottom || in_loop[child] {
                current.push(branch);
                extend(network, child, bottom, in_loop, current, paths);
                current.pop();
            }
        }
    }

    let mut paths = Vec::new();
    extend(network, top, bottom, in_loop, &mut Vec::new(), &mut paths);
    paths
}

/// Follows the recorded directions of `gene` from `top`, returning the path
/// taken if it ends at `bottom`.
fn recorded_path(
    network: &Network,
    gene_tree: &GeneTree,
    embedding: &EmbeddingMatrix,
    gene: GeneIndex,
    top: NodeIndex,
    bottom: NodeIndex,
) -> Option<LoopPath> {
    let height = gene_tree[gene].height();
    let mut path = Vec::new();
    let mut node = top;
    while node != bottom {
        let network_node = network.node(node);
        if network_node.is_leaf() || height >= network_node.height() {
            return None;
        }
        let row = network.traversal_index(node)?;
        let branch = network_node.child_branch(embedding.direction(row, gene)?)?;
        path.push(branch);
        node = network.node_for_branch(branch);
    }
    Some(path)
}

/// Embedding cells `(row, direction)` that route a lineage along `path`.
fn path_cells(network: &Network, path: &LoopPath) -> Option<Vec<(usize, i8)>> {
    path.iter()
        .map(|&branch| {
            let parent = network.branch_parent(branch);
            let direction = network.node(parent).direction_of(branch)?;
            Some((network.traversal_index(parent)?, direction as i8))
        })
        .collect()
}
