use crate::embedding::rebuild::{count_choices, reembed};
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::RngCore;

/// Runs another operator, then rebuilds the embeddings it invalidated.
///
/// The free choices of each embedding are counted before the inner proposal
/// and after the rebuild; the returned log Hastings ratio is the inner ratio
/// plus `(new - old) * ln 2` summed over the rebuilt gene trees. It is
/// negative infinity if the inner operator rejects, a recorded embedding is
/// not valid, or a gene tree cannot be embedded afterwards.
///
/// # Example
/// ```
/// use speciesnetwork::operators::{JointReembedding, NodeSlider, Operator};
///
/// let operator = JointReembedding::new(Box::new(NodeSlider::default()));
/// assert_eq!(operator.name(), "JointReembedding(NodeSlider)");
/// ```
pub struct JointReembedding {
    inner: Box<dyn Operator>,
    gene_trees: Option<Vec<usize>>,
    name: String,
}

impl JointReembedding {
    /// Wraps `inner`, rebuilding the embeddings of all gene trees.
    pub fn new(inner: Box<dyn Operator>) -> Self {
        let name = format!("JointReembedding({})", inner.name());
        Self { inner, gene_trees: None, name }
    }

    /// Restricts the rebuild to the given gene trees.
    pub fn with_gene_trees(mut self, gene_trees: Vec<usize>) -> Self {
        self.gene_trees = Some(gene_trees);
        self
    }

    pub fn inner(&self) -> &dyn Operator {
        self.inner.as_ref()
    }
}

impl Operator for JointReembedding {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let gene_trees = self.gene_trees.clone().unwrap_or_else(|| (0..state.num_gene_trees()).collect());

        let old_choices: Vec<Option<usize>> = gene_trees
            .iter()
            .map(|&i| count_choices(state.network(), state.gene_tree(i), state.assignment(i), state.embedding(i)))
            .collect();
        if let Some(position) = old_choices.iter().position(Option::is_none) {
            debug!("{}: embedding of gene tree {} is not valid", self.name, gene_trees[position]);
            return f64::NEG_INFINITY;
        }

        let inner_log_hr = self.inner.propose(state, rng);
        if inner_log_hr == f64::NEG_INFINITY {
            return inner_log_hr;
        }

        let mut log_hr = inner_log_hr;
        for (&i, old) in gene_trees.iter().zip(old_choices) {
            let (network, gene_tree, assignment, embedding) = state.embedding_parts_mut(i);
            embedding.start_editing(&self.name);
            let outcome = reembed(old, network, gene_tree, assignment, embedding, rng);
            if !outcome.success {
                debug!("{}: gene tree {i} cannot be embedded after the proposal", self.name);
                return f64::NEG_INFINITY;
            }
            log_hr += outcome.log_choice_delta;
        }
        trace!("{}: log Hastings ratio {log_hr} (inner {inner_log_hr})", self.name);
        log_hr
    }
}
