//! Taxon module, mapping gene-tree leaves to species.
//!
//! - [TaxonMap]: joined storage and lookup of gene leaf labels per species label.
//! - [SpeciesAssignment]: the resolved mapping of one gene tree onto a network.

use crate::error::SetupError;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::NodeIndex;
use std::collections::HashMap;
use std::fmt;

/// Index of a species label in a [TaxonMap].
pub type SpeciesIndex = usize;

// =#========================================================================#=
// TAXON MAP
// =#========================================================================#=
/// Maps gene leaf labels (e.g. individuals or alleles) to species labels.
///
/// Species labels are deduplicated and referenced by [SpeciesIndex];
/// inserting the same species twice returns the same index.
///
/// # Example
/// ```
/// use speciesnetwork::model::taxon_map::TaxonMap;
///
/// let mut taxa = TaxonMap::new();
/// taxa.insert("kiwi_north_1", "Apteryx mantelli");
/// taxa.insert("kiwi_north_2", "Apteryx mantelli");
/// taxa.insert("kiwi_rowi_1", "Apteryx rowi");
///
/// assert_eq!(taxa.num_species(), 2);
/// assert_eq!(taxa.species_of("kiwi_north_2"), Some("Apteryx mantelli"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaxonMap {
    /// List of unique species labels
    species: Vec<String>,
    /// Map from species label to its index
    species_index: HashMap<String, SpeciesIndex>,
    /// Map from gene leaf label to species index
    gene_to_species: HashMap<String, SpeciesIndex>,
}

impl TaxonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(gene label, species label)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = Self::new();
        for (gene, species) in pairs {
            map.insert(gene, species);
        }
        map
    }

    /// Records that gene leaf `gene` was sampled from species `species`,
    /// replacing any earlier record for `gene`.
    ///
    /// # Returns
    /// The index of the species label
    pub fn insert(&mut self, gene: &str, species: &str) -> SpeciesIndex {
        let index = self.get_or_insert_species(species);
        self.gene_to_species.insert(gene.to_string(), index);
        index
    }

    /// Gets the index of a species label, inserting it if it doesn't exist.
    pub fn get_or_insert_species(&mut self, species: &str) -> SpeciesIndex {
        if let Some(&index) = self.species_index.get(species) {
            index
        } else {
            let index = self.species.len();
            self.species.push(species.to_string());
            self.species_index.insert(species.to_string(), index);
            index
        }
    }

    /// Returns the species label recorded for a gene leaf label.
    pub fn species_of(&self, gene: &str) -> Option<&str> {
        self.gene_to_species.get(gene).map(|&i| self.species[i].as_str())
    }

    pub fn species_index(&self, species: &str) -> Option<SpeciesIndex> {
        self.species_index.get(species).copied()
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_genes(&self) -> usize {
        self.gene_to_species.len()
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Resolves all leaves of `gene_tree` to leaves of `network`.
    ///
    /// # Errors
    /// * [SetupError::UnlabelledLeaf] if a gene leaf has no label
    /// * [SetupError::UnknownTaxon] if a gene leaf label is not recorded
    /// * [SetupError::UnknownSpecies] if the species is not a network leaf
    pub fn assign(&self, network: &Network, gene_tree: &GeneTree) -> Result<SpeciesAssignment, SetupError> {
        let mut species = vec![None; gene_tree.num_nodes()];
        for leaf in gene_tree.leaves() {
            let label = gene_tree[leaf].label().ok_or(SetupError::UnlabelledLeaf(leaf))?;
            let species_label = self
                .species_of(label)
                .ok_or_else(|| SetupError::UnknownTaxon(label.to_string()))?;
            let node = network
                .leaf_by_label(species_label)
                .ok_or_else(|| SetupError::UnknownSpecies(species_label.to_string()))?;
            species[leaf] = Some(node);
        }
        Ok(SpeciesAssignment { species })
    }
}

impl fmt::Display for TaxonMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut genes: Vec<_> = self.gene_to_species.iter().collect();
        genes.sort();
        for (gene, &species) in genes {
            writeln!(f, "{gene}\t{}", self.species[species])?;
        }
        Ok(())
    }
}

// =#========================================================================#=
// SPECIES ASSIGNMENT
// =#========================================================================#=
/// Network leaf of every gene leaf of one gene tree, indexed by [GeneIndex].
///
/// Network leaves are never renumbered by surgery, so an assignment stays
/// valid for the lifetime of a chain; it must be recomputed only when gene
/// nodes are renumbered.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesAssignment {
    species: Vec<Option<NodeIndex>>,
}

impl SpeciesAssignment {
    /// Creates an assignment from per-gene-node entries (`None` for internal nodes).
    pub fn new(species: Vec<Option<NodeIndex>>) -> Self {
        Self { species }
    }

    /// Returns the network leaf of a gene leaf, `None` for internal gene nodes.
    pub fn species_of(&self, gene: GeneIndex) -> Option<NodeIndex> {
        self.species.get(gene).copied().flatten()
    }

    /// Returns all gene leaves assigned to the network leaf `species`.
    pub fn genes_of(&self, species: NodeIndex) -> impl Iterator<Item = GeneIndex> + '_ {
        self.species
            .iter()
            .enumerate()
            .filter(move |(_, s)| **s == Some(species))
            .map(|(g, _)| g)
    }
}
