//! Relocation of a network node together with one of its edges.

use crate::model::network::Network;
use crate::model::network_node::{BranchNumber, NodeIndex};
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

const NAME: &str = "RelocateBranch";

/// Moves a random internal node, keeping one of its edges, onto another branch.
///
/// A reticulation keeps one of its parent edges and moves its lower end; a
/// speciation keeps one of its child edges and moves its upper end. The
/// node's other two edges are joined into one branch, and the new position
/// is drawn uniformly on a random branch other than the two kept edges.
///
/// If the drawn height lies beyond the far end of the kept edge, the node
/// at that end (a speciation above a reticulation, a reticulation below a
/// speciation) swaps roles with the picked node; otherwise the proposal is
/// rejected.
///
/// The log Hastings ratio is `ln(attach span) - ln(joined span)`.
#[derive(Debug, Clone, Default)]
pub struct RelocateBranch;

impl RelocateBranch {
    pub fn new() -> Self {
        Self
    }

    /// Relocates `node` keeping its edge in `slot` (a parent slot of a
    /// reticulation, a child slot of a speciation) onto branch `attach`, at
    /// `fraction` of the attach span above its lower end.
    ///
    /// Branch numbers refer to the network before the move. Returns the log
    /// Hastings ratio, or negative infinity if the move is impossible.
    pub fn relocate(&self, state: &mut State, node: NodeIndex, slot: usize, attach: BranchNumber, fraction: f64) -> f64 {
        let network = state.network_mut();
        if node >= network.num_nodes() || attach >= network.branches().len() || slot > 1 {
            return f64::NEG_INFINITY;
        }
        let relocation = if network.node(node).is_reticulation() {
            Relocation::reticulation(network, node, slot)
        } else if network.node(node).is_speciation() {
            Relocation::speciation(network, node, slot)
        } else {
            debug!("{NAME}: node {node} is neither a speciation nor a reticulation");
            return f64::NEG_INFINITY;
        };
        if attach == relocation.kept || attach == relocation.joined_away {
            debug!("{NAME}: branch {attach} is one of the edges at {node}");
            return f64::NEG_INFINITY;
        }
        relocation.apply(network, attach, fraction)
    }
}

impl Operator for RelocateBranch {
    fn name(&self) -> &str {
        NAME
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let network = state.network();
        let Some(&node) = network.internal_nodes().choose(rng) else {
            debug!("{NAME}: network has no internal node");
            return f64::NEG_INFINITY;
        };
        let slot = usize::from(rng.gen_bool(0.5));
        let relocation = if network.node(node).is_reticulation() {
            Relocation::reticulation(network, node, slot)
        } else {
            Relocation::speciation(network, node, slot)
        };

        let candidates: Vec<BranchNumber> = (0..network.branches().len())
            .filter(|&b| b != relocation.kept && b != relocation.joined_away)
            .collect();
        let Some(&attach) = candidates.choose(rng) else {
            debug!("{NAME}: no branch to attach to");
            return f64::NEG_INFINITY;
        };
        let fraction = rng.r#gen::<f64>();
        relocation.apply(state.network_mut(), attach, fraction)
    }
}

/// The edges at a node about to be relocated.
///
/// `kept` moves along with `node`; `joined_away` and `joined` are its two
/// other edges, which are joined into `joined` when `node` leaves.
struct Relocation {
    node: NodeIndex,
    is_reticulation: bool,
    kept: BranchNumber,
    joined_away: BranchNumber,
    joined: BranchNumber,
    joined_span: (f64, f64),
}

impl Relocation {
    fn reticulation(network: &Network, node: NodeIndex, slot: usize) -> Self {
        let kept = network.node(node).parent_branches()[slot];
        let joined_away = network.node(node).parent_branches()[1 - slot];
        let joined = network.node(node).child_branches()[0];
        let lower = network.node(network.node_for_branch(joined)).height();
        let upper = network.node(network.branch_parent(joined_away)).height();
        Self { node, is_reticulation: true, kept, joined_away, joined, joined_span: (lower, upper) }
    }

    fn speciation(network: &Network, node: NodeIndex, slot: usize) -> Self {
        let kept = network.node(node).child_branches()[slot];
        let joined = network.node(node).child_branches()[1 - slot];
        let joined_away = network.node(node).parent_branches()[0];
        let lower = network.node(network.node_for_branch(joined)).height();
        let upper = network.node(network.branch_parent(joined_away)).height();
        Self { node, is_reticulation: false, kept, joined_away, joined, joined_span: (lower, upper) }
    }

    /// Span `(lower, upper)` of `attach` once the edges at the node are joined.
    fn attach_span(&self, network: &Network, attach: BranchNumber) -> (f64, f64) {
        if attach == self.joined {
            self.joined_span
        } else {
            let branch = network.branch(attach);
            (network.node(branch.child()).height(), network.node(branch.parent()).height())
        }
    }

    fn apply(&self, network: &mut Network, attach: BranchNumber, fraction: f64) -> f64 {
        let (lower, upper) = self.attach_span(network, attach);
        let new_height = lower + fraction * (upper - lower);
        let moved = if self.is_reticulation {
            relocate_reticulation(network, self, attach, new_height)
        } else {
            relocate_speciation(network, self, attach, new_height)
        };
        if !moved {
            return f64::NEG_INFINITY;
        }

        network.assert_sane();
        let log_hr = (upper - lower).ln() - (self.joined_span.1 - self.joined_span.0).ln();
        trace!("{NAME}: log Hastings ratio {log_hr}");
        log_hr
    }
}

fn relocate_reticulation(network: &mut Network, relocation: &Relocation, attach: BranchNumber, new_height: f64) -> bool {
    let Relocation { node: pn, kept: picked, joined_away: other, joined: below, .. } = *relocation;
    let pp = network.branch_parent(picked);
    let pnp = network.branch_parent(other);
    let pp_height = network.node(pp).height();
    trace!("{NAME}: reticulation {pn} to branch {attach} at {new_height} (picked parent at {pp_height})");

    if new_height < pp_height {
        network.start_editing(NAME);
        // pNP -> pC
        network.move_branch_top(below, pnp, Some(other));
        // aP -> pN -> aC
        let attach_parent = network.branch_parent(attach);
        network.move_branch_top(other, attach_parent, Some(attach));
        network.move_branch_top(attach, pn, None);
        network.node_mut(pn).set_height(new_height);
        return true;
    }

    if !network.node(pp).is_speciation() {
        debug!("{NAME}: parent {pp} of reticulation {pn} is not a speciation node");
        return false;
    }
    let above_pp = network.node(pp).parent_branches()[0];
    let ppp = network.branch_parent(above_pp);
    let Some(&beside) = network.node(pp).child_branches().iter().find(|&&b| b != picked) else {
        return false;
    };
    // Once pNP -> pC is joined, a second edge pP -> pN is that branch
    let beside = if beside == other { below } else { beside };
    if attach == beside {
        debug!("{NAME}: attaching below {pp} would close a cycle");
        return false;
    }

    network.start_editing(NAME);
    network.move_branch_top(below, pnp, Some(other));
    // pN takes the place of pP: pPP -> pN -> pPC
    network.move_branch_top(other, ppp, Some(above_pp));
    network.move_branch_top(beside, pn, None);
    // aP -> pP -> aC, where the lineage above pP is now the one above pN
    let target = if attach == above_pp { other } else { attach };
    let target_parent = network.branch_parent(target);
    network.move_branch_top(above_pp, target_parent, Some(target));
    network.move_branch_top(target, pp, None);
    network.node_mut(pn).set_height(pp_height);
    network.node_mut(pp).set_height(new_height);
    true
}

fn relocate_speciation(network: &mut Network, relocation: &Relocation, attach: BranchNumber, new_height: f64) -> bool {
    let Relocation { node: pn, kept: picked, joined_away: above, joined: sibling, .. } = *relocation;
    let pp = network.branch_parent(above);
    let pc = network.node_for_branch(picked);
    let pc_height = network.node(pc).height();
    trace!("{NAME}: speciation {pn} to branch {attach} at {new_height} (picked child at {pc_height})");

    if new_height > pc_height {
        network.start_editing(NAME);
        // pP -> pNC
        network.move_branch_top(sibling, pp, Some(above));
        // aP -> pN -> aC
        let attach_parent = network.branch_parent(attach);
        network.move_branch_top(above, attach_parent, Some(attach));
        network.move_branch_top(attach, pn, None);
        network.node_mut(pn).set_height(new_height);
        return true;
    }

    if !network.node(pc).is_reticulation() {
        debug!("{NAME}: child {pc} of speciation {pn} is not a reticulation");
        return false;
    }
    let below_pc = network.node(pc).child_branches()[0];
    let Some(&beside) = network.node(pc).parent_branches().iter().find(|&&b| b != picked) else {
        return false;
    };
    if attach == beside {
        debug!("{NAME}: attaching above {pc} would close a cycle");
        return false;
    }

    network.start_editing(NAME);
    network.move_branch_top(sibling, pp, Some(above));
    // pN takes the place of pC: pCP -> pN -> pCC
    let pcp = network.branch_parent(beside);
    network.move_branch_top(above, pcp, Some(beside));
    network.move_branch_top(below_pc, pn, None);
    // aP -> pC -> aC
    let attach_parent = network.branch_parent(attach);
    network.move_branch_top(beside, attach_parent, Some(attach));
    network.move_branch_top(attach, pc, None);
    network.node_mut(pn).set_height(pc_height);
    network.node_mut(pc).set_height(new_height);
    true
}
