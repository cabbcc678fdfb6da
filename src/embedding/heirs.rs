//! Heir sets: the gene leaves below network and gene nodes.

use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use crate::model::network_node::NodeIndex;
use crate::model::taxon_map::SpeciesAssignment;
use std::collections::BTreeSet;

/// A set of gene leaf indices.
pub type HeirSet = BTreeSet<GeneIndex>;

/// Heir sets of all gene nodes and all network nodes of one gene tree.
///
/// A gene leaf is its own heir; a network leaf inherits the gene leaves
/// assigned to it. Inner nodes of both take the union over their children,
/// so the heirs of a reticulation reach both of its parents.
#[derive(Debug, Clone)]
pub struct HeirSets {
    gene: Vec<HeirSet>,
    network: Vec<HeirSet>,
}

impl HeirSets {
    pub fn compute(network: &Network, gene_tree: &GeneTree, assignment: &SpeciesAssignment) -> Self {
        let mut gene = vec![HeirSet::new(); gene_tree.num_nodes()];
        for node in gene_tree.post_order_iter() {
            let heirs = match node.children() {
                None => HeirSet::from([node.index()]),
                Some((left, right)) => gene[left].union(&gene[right]).copied().collect(),
            };
            gene[node.index()] = heirs;
        }

        let mut network_heirs = vec![HeirSet::new(); network.num_nodes()];
        for leaf in gene_tree.leaves() {
            if let Some(species) = assignment.species_of(leaf) {
                network_heirs[species].insert(leaf);
            }
        }
        for node in network.post_order() {
            if network.node(node).is_leaf() {
                continue;
            }
            let heirs: HeirSet = network.children(node).flat_map(|c| network_heirs[c].iter().copied()).collect();
            network_heirs[node] = heirs;
        }

        Self { gene, network: network_heirs }
    }

    pub fn of_gene(&self, gene: GeneIndex) -> &HeirSet {
        &self.gene[gene]
    }

    pub fn of_node(&self, node: NodeIndex) -> &HeirSet {
        &self.network[node]
    }

    /// Whether every heir of `gene` is an heir of `node`.
    pub fn covers(&self, node: NodeIndex, gene: GeneIndex) -> bool {
        self.gene[gene].is_subset(&self.network[node])
    }
}
