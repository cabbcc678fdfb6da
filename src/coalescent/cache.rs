//! Lazily recomputed statistics per gene tree.

use crate::coalescent::statistics::{Statistics, compute};
use crate::config::StatisticsConfig;
use crate::error::EmbeddingError;
use crate::state::State;
use std::mem;

/// Statistics of one gene tree of a [State], recomputed on demand.
///
/// The cache is dirty after [mark_dirty](Self::mark_dirty) or whenever the
/// network, the gene tree or its embedding has been edited since the last
/// store/accept. [store](Self::store) and [restore](Self::restore) keep a
/// second copy that the state's rollback can swap back in.
///
/// [State::accept] and [State::restore] clear the edit flags of the inputs.
/// A proposal accepted before the cache was read leaves no trace, so the
/// host must call [mark_dirty](Self::mark_dirty) after every accepted
/// proposal that touched the network, the gene tree or its embedding.
#[derive(Debug, Clone)]
pub struct GeneTreeStatistics {
    gene_tree: usize,
    ploidy: f64,
    current: Option<Statistics>,
    stored: Option<Statistics>,
    dirty: bool,
}

impl GeneTreeStatistics {
    /// Creates a cache for gene tree number `gene_tree` of a state.
    pub fn new(gene_tree: usize, config: &StatisticsConfig) -> Self {
        Self { gene_tree, ploidy: config.ploidy, current: None, stored: None, dirty: true }
    }

    pub fn gene_tree(&self) -> usize {
        self.gene_tree
    }

    /// Copy number of the locus.
    pub fn ploidy(&self) -> f64 {
        self.ploidy
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Checks the inputs for edits and marks the cache dirty if there are any.
    ///
    /// Edits already accepted or restored are not seen; see the type docs.
    pub fn requires_recalculation(&mut self, state: &State) -> bool {
        let i = self.gene_tree;
        if state.network().is_dirty() || state.gene_tree(i).is_dirty() || state.embedding(i).is_dirty() {
            self.dirty = true;
        }
        self.dirty
    }

    /// Returns the statistics, recomputing them if needed.
    pub fn statistics(&mut self, state: &State) -> Result<&Statistics, EmbeddingError> {
        let recalculate = self.requires_recalculation(state);
        let statistics = match self.current.take() {
            Some(statistics) if !recalculate => statistics,
            _ => {
                let i = self.gene_tree;
                let network = state.network();
                compute(network, state.gene_tree(i), state.embedding(i), &network.gammas())?
            }
        };
        self.dirty = false;
        Ok(self.current.insert(statistics))
    }

    /// Returns the occupancy table `[gene][branch]`, recomputing if needed.
    pub fn occupancy(&mut self, state: &State) -> Result<&[Vec<f64>], EmbeddingError> {
        Ok(&self.statistics(state)?.occupancy)
    }

    pub fn store(&mut self) {
        self.stored.clone_from(&self.current);
    }

    /// Swaps the stored statistics back in.
    pub fn restore(&mut self) {
        mem::swap(&mut self.current, &mut self.stored);
        self.dirty = self.current.is_none();
    }
}
