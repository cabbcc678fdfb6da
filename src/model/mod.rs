//! Data model: the phylogenetic network, gene trees, and the taxon mapping
//! between them, plus the builders used by the Newick reader.

/// Node annotations of extended Newick strings
pub mod annotation;
/// Binary gene trees with node heights
pub mod gene_tree;
/// Gene tree builder for the Newick reader
pub mod gene_tree_builder;
/// Phylogenetic network with its branch table
pub mod network;
/// Network builder for the extended Newick reader
pub mod network_builder;
/// Network node types (leaf, speciation, reticulation, origin)
pub mod network_node;
/// Gene leaf to species mapping
pub mod taxon_map;
/// Builder trait driven by the parser
pub mod tree_builder;

pub use annotation::AnnotationValue;
pub use gene_tree::{GeneIndex, GeneNode, GeneTree};
pub use gene_tree_builder::GeneTreeBuilder;
pub use network::{Branch, Network};
pub use network_builder::NetworkBuilder;
pub use network_node::{BranchNumber, NetworkNode, NodeIndex, NodeKind};
pub use taxon_map::{SpeciesAssignment, SpeciesIndex, TaxonMap};
pub use tree_builder::TreeBuilder;
