//! Narrow exchange on the network with coordinated gene-tree surgery.

use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::NodeIndex;
use crate::model::taxon_map::SpeciesAssignment;
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::RngCore;
use rand::seq::SliceRandom;

const NAME: &str = "CoordinatedExchange";

/// Exchanges a *brother* node `b` with its *uncle* `c` and moves the gene
/// tree coalescences that the exchange would otherwise invalidate.
///
/// With `y` the parent and `z` the grandparent of `b` (both speciation
/// nodes) and `c` the other child of `z`, the branches above `b` and `c`
/// swap their upper ends, so that `c` hangs below `y` and `b` below `z`.
///
/// A gene node `m` in `[y.height, z.height)` with exactly one child made of
/// brother species only can no longer coalesce there. That child is pruned
/// onto the former parent of `m`, and `m` is regrafted onto a random lineage
/// of uncle species only that crosses its height. The log Hastings ratio is
/// the sum over all moved nodes of `ln(forward) - ln(reverse)`, counting the
/// uncle-only lineages before and the brother-only lineages after each move.
#[derive(Debug, Clone, Default)]
pub struct CoordinatedExchange;

impl CoordinatedExchange {
    pub fn new() -> Self {
        Self
    }

    /// Returns all nodes that qualify as brother: non-reticulations whose
    /// parent and grandparent are speciation nodes.
    pub fn brothers(network: &Network) -> Vec<NodeIndex> {
        network
            .all_nodes()
            .iter()
            .filter(|n| n.is_leaf() || n.is_speciation())
            .map(|n| n.index())
            .filter(|&b| {
                network.parent(b, 0).is_some_and(|y| {
                    network.node(y).is_speciation()
                        && network.parent(y, 0).is_some_and(|z| network.node(z).is_speciation())
                })
            })
            .collect()
    }

    /// Performs the exchange around `brother` and rearranges all gene trees.
    ///
    /// # Returns
    /// The log Hastings ratio of the gene-tree rearrangement, or negative
    /// infinity if `brother` does not qualify, the uncle is not below the
    /// parent of `brother`, or a moved node finds no lineage to graft onto.
    pub fn exchange(&self, state: &mut State, brother: NodeIndex, rng: &mut dyn RngCore) -> f64 {
        let (network, gene_trees, assignments) = state.topology_parts_mut();
        let Some(y) = network.parent(brother, 0) else {
            return f64::NEG_INFINITY;
        };
        let Some(z) = network.parent(y, 0) else {
            return f64::NEG_INFINITY;
        };
        if network.node(brother).is_reticulation() || !network.node(y).is_speciation() || !network.node(z).is_speciation() {
            debug!("{NAME}: node {brother} does not qualify as brother");
            return f64::NEG_INFINITY;
        }

        let brother_branch = network.node(brother).parent_branches()[0];
        let y_branch = network.node(y).parent_branches()[0];
        let Some(&uncle_branch) = network.node(z).child_branches().iter().find(|&&b| b != y_branch) else {
            return f64::NEG_INFINITY;
        };
        let uncle = network.node_for_branch(uncle_branch);
        let (lower, upper) = (network.node(y).height(), network.node(z).height());
        if network.node(uncle).height() >= lower {
            debug!("{NAME}: uncle {uncle} is not below {y}");
            return f64::NEG_INFINITY;
        }

        let brother_species = leaves_below(network, brother);
        let uncle_species = leaves_below(network, uncle);
        trace!("{NAME}: exchanging brother {brother} and uncle {uncle} between {lower} and {upper}");

        network.start_editing(NAME);
        network.exchange_branch_tops(brother_branch, uncle_branch);
        network.assert_sane();

        let mut log_hr = 0.0;
        for (gene_tree, assignment) in gene_trees.iter_mut().zip(assignments) {
            let moves = moved_nodes(gene_tree, assignment, &brother_species, lower, upper);
            if moves.is_empty() {
                continue;
            }
            gene_tree.start_editing(NAME);
            for (moved, disowned) in moves {
                let height = gene_tree[moved].height();
                let grafts = crossing_lineages(gene_tree, assignment, &uncle_species, height);
                let Some(&graft) = grafts.choose(rng) else {
                    debug!("{NAME}: no uncle lineage crosses gene node {moved} at {height}");
                    return f64::NEG_INFINITY;
                };
                gene_tree.prune_and_regraft(moved, disowned, graft);
                let reverse = crossing_lineages(gene_tree, assignment, &brother_species, height).len();
                log_hr += (grafts.len() as f64).ln() - (reverse as f64).ln();
                trace!("{NAME}: gene node {moved} onto {graft}, {} forward, {reverse} reverse", grafts.len());
            }
        }
        log_hr
    }
}

impl Operator for CoordinatedExchange {
    fn name(&self) -> &str {
        NAME
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let Some(&brother) = Self::brothers(state.network()).choose(rng) else {
            debug!("{NAME}: no node qualifies as brother");
            return f64::NEG_INFINITY;
        };
        self.exchange(state, brother, rng)
    }
}

/// Marks the leaves reachable tipward from `node`.
fn leaves_below(network: &Network, node: NodeIndex) -> Vec<bool> {
    let mut species = vec![false; network.num_nodes()];
    let mut visited = vec![false; network.num_nodes()];
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if std::mem::replace(&mut visited[current], true) {
            continue;
        }
        if network.node(current).is_leaf() {
            species[current] = true;
        }
        stack.extend(network.children(current));
    }
    species
}

/// Returns whether all leaves below `gene` belong to the marked species.
fn is_exclusive(gene_tree: &GeneTree, assignment: &SpeciesAssignment, gene: GeneIndex, species: &[bool]) -> bool {
    gene_tree
        .subtree_leaves(gene)
        .into_iter()
        .all(|leaf| assignment.species_of(leaf).is_some_and(|s| species[s]))
}

/// Gene nodes in `[lower, upper)` with exactly one child exclusive to the
/// marked species, paired with that child, by decreasing height.
fn moved_nodes(
    gene_tree: &GeneTree,
    assignment: &SpeciesAssignment,
    species: &[bool],
    lower: f64,
    upper: f64,
) -> Vec<(GeneIndex, GeneIndex)> {
    let mut moves: Vec<(GeneIndex, GeneIndex)> = gene_tree
        .nodes()
        .iter()
        .filter(|n| n.height() >= lower && n.height() < upper)
        .filter_map(|n| {
            let (left, right) = n.children()?;
            match (is_exclusive(gene_tree, assignment, left, species), is_exclusive(gene_tree, assignment, right, species)) {
                (true, false) => Some((n.index(), left)),
                (false, true) => Some((n.index(), right)),
                _ => None,
            }
        })
        .collect();
    moves.sort_by(|a, b| gene_tree[b.0].height().total_cmp(&gene_tree[a.0].height()));
    moves
}

/// Gene lineages exclusive to the marked species that cross `height`, i.e.
/// start below and end above it. The children of a gene node at `height`
/// do not cross it.
fn crossing_lineages(gene_tree: &GeneTree, assignment: &SpeciesAssignment, species: &[bool], height: f64) -> Vec<GeneIndex> {
    gene_tree
        .nodes()
        .iter()
        .filter(|n| n.height() < height && n.parent().is_some_and(|p| gene_tree[p].height() > height))
        .map(|n| n.index())
        .filter(|&g| is_exclusive(gene_tree, assignment, g, species))
        .collect()
}
