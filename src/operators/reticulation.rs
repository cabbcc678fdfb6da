//! Reversible-jump pair adding and deleting reticulations.
//!
//! An addition cuts two branches (possibly the same one twice) and joins the
//! cut points by a new edge from the upper point, which becomes a speciation
//! node, to the lower point, which becomes a reticulation. A deletion removes
//! one reticulation edge and suppresses both of its ends.
//!
//! With `k` the number of branches before an addition and `m` the number of
//! reticulation edges after it, the log Hastings ratio of an addition is
//!
//! `2 ln k - ln m + ln l1 + ln l2 - ln f1 - ln f2`
//!
//! where `l` is the length of a cut branch and `f` the density of its cut
//! point. Cut points on ordinary branches are uniform (`f = 1`); on the root
//! branch, whose length is unbounded in the reverse move, the offset above
//! the root is exponential with rate λ (`l = 1`, `f = λ exp(-λ x)`).
//! A deletion returns the negated ratio of the addition that reverses it.

use crate::config::ReticulationJumpConfig;
use crate::model::network::Network;
use crate::model::network_node::{BranchNumber, NodeIndex, NodeKind};
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// A point on a branch where a new node is inserted, with its terms of the
/// Hastings ratio.
#[derive(Debug, Clone, Copy)]
struct CutPoint {
    branch: BranchNumber,
    height: f64,
    /// `ln l - ln f`
    log_weight: f64,
}

/// Draws a cut point on `branch`, `None` if an exponential offset on the
/// root branch passes the origin.
fn draw_cut_point(network: &Network, branch: BranchNumber, rate: f64, rng: &mut dyn RngCore) -> Option<CutPoint> {
    let child_height = network.node(network.node_for_branch(branch)).height();
    if branch == network.root_branch() {
        let offset = -(1.0 - rng.r#gen::<f64>()).ln() / rate;
        let height = child_height + offset;
        if height >= network.node(network.origin()).height() {
            return None;
        }
        Some(CutPoint { branch, height, log_weight: -log_exponential_density(rate, offset) })
    } else {
        let length = network.branch_length(branch);
        let height = child_height + length * rng.r#gen::<f64>();
        Some(CutPoint { branch, height, log_weight: length.ln() })
    }
}

fn log_exponential_density(rate: f64, offset: f64) -> f64 {
    rate.ln() - rate * offset
}

// =#========================================================================#=
// ADD RETICULATION
// =#========================================================================#=
/// Adds a reticulation edge between two random branches.
///
/// The new reticulation keeps the cut lineage in its gamma slot and gets a
/// fresh γ drawn uniformly from `[0, 1)`.
#[derive(Debug, Clone, Default)]
pub struct AddReticulation {
    config: ReticulationJumpConfig,
}

impl AddReticulation {
    pub fn new(config: ReticulationJumpConfig) -> Self {
        Self { config }
    }
}

impl Operator for AddReticulation {
    fn name(&self) -> &str {
        "AddReticulation"
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let rate = self.config.root_branch_rate;
        let network = state.network_mut();
        let num_branches = network.branches().len();

        // With replacement: both ends may lie on one branch
        let first = rng.gen_range(0..num_branches);
        let second = rng.gen_range(0..num_branches);
        let (Some(first), Some(second)) =
            (draw_cut_point(network, first, rate, rng), draw_cut_point(network, second, rate, rng))
        else {
            debug!("{}: cut point on the root branch passes the origin", self.name());
            return f64::NEG_INFINITY;
        };
        let (upper, lower) = if first.height >= second.height { (first, second) } else { (second, first) };
        trace!(
            "{}: edge from branch {} at {} to branch {} at {}",
            self.name(),
            upper.branch,
            upper.height,
            lower.branch,
            lower.height
        );

        network.start_editing(self.name());
        let speciation = network.split_branch(upper.branch, NodeKind::Speciation, upper.height);
        // If both ends share a branch, its number now denotes the part below the speciation
        let reticulation = network.split_branch(lower.branch, NodeKind::Reticulation, lower.height);
        network.add_branch(speciation, reticulation);
        network.node_mut(reticulation).set_gamma(rng.r#gen::<f64>());
        network.assert_sane();

        let num_reticulation_branches = 2 * network.num_reticulations();
        let log_hr = 2.0 * (num_branches as f64).ln() - (num_reticulation_branches as f64).ln()
            + upper.log_weight
            + lower.log_weight;
        trace!("{}: log Hastings ratio {log_hr}", self.name());
        log_hr
    }
}

// =#========================================================================#=
// DELETE RETICULATION
// =#========================================================================#=
/// Deletes a random reticulation edge whose upper end is a speciation node.
///
/// Rejects if the network has no reticulation.
#[derive(Debug, Clone, Default)]
pub struct DeleteReticulation {
    config: ReticulationJumpConfig,
}

impl DeleteReticulation {
    pub fn new(config: ReticulationJumpConfig) -> Self {
        Self { config }
    }

    /// `ln l - ln f` of the cut at `height` on the branch from `top` down to
    /// a node at `base`, as the reverse addition would draw it.
    fn reverse_log_weight(&self, network: &Network, top: NodeIndex, base: f64, height: f64) -> f64 {
        if network.node(top).is_origin() {
            -log_exponential_density(self.config.root_branch_rate, height - base)
        } else {
            (network.node(top).height() - base).ln()
        }
    }
}

impl Operator for DeleteReticulation {
    fn name(&self) -> &str {
        "DeleteReticulation"
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let network = state.network_mut();
        let reticulation_branches: Vec<BranchNumber> = network
            .reticulation_nodes()
            .into_iter()
            .flat_map(|r| network.node(r).parent_branches().to_vec())
            .collect();
        let Some(&removed) = reticulation_branches.choose(rng) else {
            debug!("{}: network has no reticulation", self.name());
            return f64::NEG_INFINITY;
        };

        let reticulation = network.node_for_branch(removed);
        let speciation = network.branch_parent(removed);
        if !network.node(speciation).is_speciation() {
            debug!("{}: edge {removed} does not start at a speciation node", self.name());
            return f64::NEG_INFINITY;
        }

        // Branches left after suppressing both ends, as seen by the reverse addition
        let height = |n: NodeIndex| network.node(n).height();
        let Some(&kept_above) = network.node(reticulation).parent_branches().iter().find(|&&b| b != removed) else {
            return f64::NEG_INFINITY;
        };
        let reticulation_parent = network.branch_parent(kept_above);
        let reticulation_child = network.child(reticulation, 0).unwrap_or(reticulation);
        let speciation_parent = network.parent(speciation, 0).unwrap_or(speciation);
        let log_weights = if reticulation_parent == speciation {
            // Both ends on one branch
            let base = height(reticulation_child);
            self.reverse_log_weight(network, speciation_parent, base, height(speciation))
                + self.reverse_log_weight(network, speciation_parent, base, height(reticulation))
        } else {
            let Some(&kept_below) = network.node(speciation).child_branches().iter().find(|&&b| b != removed) else {
                return f64::NEG_INFINITY;
            };
            let speciation_child = network.node_for_branch(kept_below);
            self.reverse_log_weight(network, speciation_parent, height(speciation_child), height(speciation))
                + self.reverse_log_weight(network, reticulation_parent, height(reticulation_child), height(reticulation))
        };
        let num_reduced_branches = network.branches().len() - 3;
        let num_reticulation_branches = reticulation_branches.len();
        trace!("{}: edge {removed} from {speciation} to {reticulation}", self.name());

        network.start_editing(self.name());
        network.remove_branch(removed);
        let last = network.num_nodes() - 1;
        network.suppress_node(reticulation);
        let speciation = if speciation == last { reticulation } else { speciation };
        network.suppress_node(speciation);
        network.assert_sane();

        let log_hr = -(2.0 * (num_reduced_branches as f64).ln() - (num_reticulation_branches as f64).ln()
            + log_weights);
        trace!("{}: log Hastings ratio {log_hr}", self.name());
        log_hr
    }
}

// =#========================================================================#=
// RETICULATION JUMP
// =#========================================================================#=
/// Chooses between [AddReticulation] and [DeleteReticulation] with equal
/// probability.
#[derive(Debug, Clone, Default)]
pub struct ReticulationJump {
    add: AddReticulation,
    delete: DeleteReticulation,
}

impl ReticulationJump {
    pub fn new(config: ReticulationJumpConfig) -> Self {
        Self { add: AddReticulation::new(config), delete: DeleteReticulation::new(config) }
    }
}

impl Operator for ReticulationJump {
    fn name(&self) -> &str {
        "ReticulationJump"
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        if rng.gen_bool(0.5) {
            self.add.propose(state, rng)
        } else {
            self.delete.propose(state, rng)
        }
    }
}
