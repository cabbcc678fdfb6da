//! The embedded state: network, gene trees, and their embeddings.

use crate::coalescent::{Statistics, compute};
use crate::embedding::matrix::EmbeddingMatrix;
use crate::embedding::rebuild::rebuild;
use crate::error::{EmbeddingError, SetupError};
use crate::model::gene_tree::GeneTree;
use crate::model::network::Network;
use crate::model::taxon_map::{SpeciesAssignment, TaxonMap};
use log::info;
use rand::RngCore;

// =#========================================================================#=
// STATE
// =#========================================================================#=
/// A network with any number of gene trees (loci) embedded in it.
///
/// Operators mutate the state through the accessors; the host then either
/// keeps the proposal with [accept](Self::accept) or rolls it back with
/// [restore](Self::restore). Both act on every component symmetrically.
#[derive(Debug, Clone)]
pub struct State {
    network: Network,
    gene_trees: Vec<GeneTree>,
    embeddings: Vec<EmbeddingMatrix>,
    assignments: Vec<SpeciesAssignment>,
    taxa: TaxonMap,
}

impl State {
    /// Assembles a state, resolving every gene leaf to a network leaf.
    ///
    /// Embeddings start out empty; call [rebuild_embeddings](Self::rebuild_embeddings)
    /// before computing statistics.
    ///
    /// # Errors
    /// * [SetupError::Network] if the network is malformed
    /// * [SetupError::InvalidGeneTree] if a gene tree is malformed
    /// * [SetupError::UnknownTaxon] / [SetupError::UnknownSpecies] /
    ///   [SetupError::UnlabelledLeaf] if a gene leaf cannot be resolved
    pub fn new(network: Network, gene_trees: Vec<GeneTree>, taxa: TaxonMap) -> Result<Self, SetupError> {
        network.check_sanity()?;

        let mut assignments = Vec::with_capacity(gene_trees.len());
        let mut embeddings = Vec::with_capacity(gene_trees.len());
        for (i, gene_tree) in gene_trees.iter().enumerate() {
            if !gene_tree.is_valid() {
                let name = gene_tree.name().map_or_else(|| format!("#{i}"), str::to_string);
                return Err(SetupError::InvalidGeneTree(name));
            }
            assignments.push(taxa.assign(&network, gene_tree)?);
            embeddings.push(EmbeddingMatrix::for_network(&network, gene_tree));
        }

        info!(
            "state with {} loci in a network of {} species, {} reticulations, {} traversal nodes",
            gene_trees.len(),
            network.num_leaves(),
            network.num_reticulations(),
            network.num_traversal_nodes()
        );

        Ok(Self { network, gene_trees, embeddings, assignments, taxa })
    }

    /// Rebuilds all embeddings from scratch.
    ///
    /// # Returns
    /// The total number of free choices, or `None` if some gene tree cannot
    /// be embedded in the network.
    pub fn rebuild_embeddings(&mut self, rng: &mut dyn RngCore) -> Option<usize> {
        let mut total = 0;
        for i in 0..self.gene_trees.len() {
            total += rebuild(&self.network, &self.gene_trees[i], &self.assignments[i], &mut self.embeddings[i], rng)?;
        }
        Some(total)
    }

    /// Computes the statistics of gene tree `i` without caching.
    pub fn statistics(&self, i: usize) -> Result<Statistics, EmbeddingError> {
        compute(&self.network, &self.gene_trees[i], &self.embeddings[i], &self.network.gammas())
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl State {
    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Returns the number of gene trees (loci).
    pub fn num_gene_trees(&self) -> usize {
        self.gene_trees.len()
    }

    pub fn gene_tree(&self, i: usize) -> &GeneTree {
        &self.gene_trees[i]
    }

    pub fn gene_tree_mut(&mut self, i: usize) -> &mut GeneTree {
        &mut self.gene_trees[i]
    }

    pub fn gene_trees(&self) -> &[GeneTree] {
        &self.gene_trees
    }

    pub fn embedding(&self, i: usize) -> &EmbeddingMatrix {
        &self.embeddings[i]
    }

    pub fn embedding_mut(&mut self, i: usize) -> &mut EmbeddingMatrix {
        &mut self.embeddings[i]
    }

    pub fn assignment(&self, i: usize) -> &SpeciesAssignment {
        &self.assignments[i]
    }

    pub fn taxa(&self) -> &TaxonMap {
        &self.taxa
    }

    /// Splits off everything needed to rebuild the embedding of gene tree `i`.
    pub fn embedding_parts_mut(&mut self, i: usize) -> (&Network, &GeneTree, &SpeciesAssignment, &mut EmbeddingMatrix) {
        (&self.network, &self.gene_trees[i], &self.assignments[i], &mut self.embeddings[i])
    }

    /// Splits off the network and all gene trees for joint surgery.
    pub fn topology_parts_mut(&mut self) -> (&mut Network, &mut [GeneTree], &[SpeciesAssignment]) {
        (&mut self.network, &mut self.gene_trees, &self.assignments)
    }
}

// ============================================================================
// Lifecycle (pub)
// ============================================================================
impl State {
    /// Stores every component.
    pub fn store(&mut self) {
        self.network.store();
        self.gene_trees.iter_mut().for_each(GeneTree::store);
        self.embeddings.iter_mut().for_each(EmbeddingMatrix::store);
    }

    /// Rolls every component back to its last snapshot.
    pub fn restore(&mut self) {
        self.network.restore();
        self.gene_trees.iter_mut().for_each(GeneTree::restore);
        self.embeddings.iter_mut().for_each(EmbeddingMatrix::restore);
    }

    /// Keeps the current values of every component.
    pub fn accept(&mut self) {
        self.network.accept();
        self.gene_trees.iter_mut().for_each(GeneTree::accept);
        self.embeddings.iter_mut().for_each(EmbeddingMatrix::accept);
    }
}
