//! Reversible proposals on the embedded state.
//!
//! Every operator mutates a [State] in place and returns the log Hastings
//! ratio of its proposal; negative infinity means the proposal is rejected
//! and the host must [restore](State::restore) the state. Operators that
//! change the network topology leave the embeddings stale; wrap them in a
//! [JointReembedding] to rebuild the embeddings and correct the ratio.
//!
//! - [RelocateBranch]: moves a node together with one of its edges
//! - [AddReticulation] / [DeleteReticulation] / [ReticulationJump]:
//!   reversible-jump pair changing the number of reticulations
//! - [FlipNetworkLoop]: reroutes one gene subtree through a network loop
//! - [NodeSlider]: slides a node height within its bounds
//! - [CoordinatedExchange]: narrow exchange on the network with matching
//!   gene-tree surgery
//! - [JointReembedding]: composite that rebuilds embeddings after another
//!   operator

mod coordinated_exchange;
mod flip_loop;
mod joint_reembedding;
mod node_slider;
mod relocate_branch;
mod reticulation;

pub use coordinated_exchange::CoordinatedExchange;
pub use flip_loop::FlipNetworkLoop;
pub use joint_reembedding::JointReembedding;
pub use node_slider::NodeSlider;
pub use relocate_branch::RelocateBranch;
pub use reticulation::{AddReticulation, DeleteReticulation, ReticulationJump};

use crate::state::State;
use rand::RngCore;

/// A proposal on the embedded state.
///
/// Implementations call `start_editing` on every component before they write
/// to it, and check the network with
/// [assert_sane](crate::model::network::Network::assert_sane) after a
/// successful topology change.
pub trait Operator {
    /// Name used in logs and editing records.
    fn name(&self) -> &str;

    /// Proposes a new state and returns the log Hastings ratio, or negative
    /// infinity to reject.
    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64;
}

impl<O: Operator + ?Sized> Operator for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        (**self).propose(state, rng)
    }
}
