//! Speciesnetwork embeds multi-locus gene trees in phylogenetic networks.
//!
//! A network is a rooted DAG of speciation and reticulation (hybridization)
//! nodes below an origin. Every gene tree is embedded in it: an embedding
//! records, for every network node a gene lineage passes, which child branch
//! the lineage follows. Core functionality provided:
//! - Model: the [Network] with its branch table, binary [GeneTree]s, and the
//!   [TaxonMap] resolving gene leaves to species. See [crate::model].
//! - Reader: extended Newick strings with `#H` hybrid labels and
//!   `[&gamma=...]` annotations. See [crate::newick].
//! - Embedding: the [EmbeddingMatrix], its rebuild from heir sets, and the
//!   count of free choices. See [crate::embedding].
//! - Statistics: branch occupancy, lineage counts, coalescent times and the
//!   log probability of reticulation directions. See [crate::coalescent].
//! - Operators: reversible proposals on the [State] returning log Hastings
//!   ratios. See [crate::operators].
//!
//! The outer Markov chain (accept/reject, priors, parameters) is left to the
//! host, which drives the [State] lifecycle: `store`, propose, then either
//! `accept` or `restore`.
//!
//! # Example
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use speciesnetwork::{State, TaxonMap, parse_gene_tree, parse_network};
//!
//! let network = parse_network("((A:1.0,(B:0.5)#H1[&gamma=0.4]:0.5):1.0,(#H1:1.0,C:1.5):0.5):0.5;").unwrap();
//! let gene_tree = parse_gene_tree("((a1:1.2,b1:1.2):1.5,c1:2.7);").unwrap();
//! let taxa = TaxonMap::from_pairs([("a1", "A"), ("b1", "B"), ("c1", "C")]);
//!
//! let mut state = State::new(network, vec![gene_tree], taxa).unwrap();
//! let mut rng = StdRng::seed_from_u64(7);
//! state.rebuild_embeddings(&mut rng).unwrap();
//!
//! let statistics = state.statistics(0).unwrap();
//! assert!(statistics.log_gamma_sum <= 0.0);
//! ```

pub mod coalescent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod model;
pub mod newick;
pub mod operators;
pub mod parser;
pub mod state;

pub use crate::embedding::EmbeddingMatrix;
pub use crate::model::{GeneTree, Network, TaxonMap};
pub use crate::newick::{parse_gene_tree, parse_network};
pub use crate::operators::Operator;
pub use crate::state::State;
