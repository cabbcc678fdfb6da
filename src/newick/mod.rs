//! Extended Newick reader for networks and gene trees.
//!
//! This module provides [`NewickParser`] to parse (extended) Newick strings.
//! The parser drives a [`TreeBuilder`](crate::model::TreeBuilder), which
//! assembles a [`Network`] or a [`GeneTree`].
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_network`] - parses an extended Newick string with annotations
//! * [`parse_gene_tree`] - parses a binary Newick string
//! * [`parse_gene_tree_file`] - parses all gene trees of a file
//!
//! # Format
//! The extended Newick format has the following grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex { ',' vertex } ')' [label] suffix`
//! * `leaf ::= label suffix`
//! * `suffix ::= [annotation] [':' number] [annotation]`
//! * `annotation ::= '[&' key '=' value { ',' key '=' value } ']'`
//!
//! Furthermore:
//! * Labels containing `#` are hybrid labels; the part from `#` on names
//!   the reticulation, e.g. `#H1` or `X#H1`
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch length
//! * Comments are square brackets not starting with `&`

mod defs;
mod parser;

pub use self::parser::NewickParser;

use crate::model::{GeneTree, GeneTreeBuilder, Network, NetworkBuilder};
use crate::parser::ParsingError;
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::InMemoryByteSource;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a single extended Newick string into a [Network].
///
/// Annotations are parsed, so `[&gamma=...]` sets inheritance probabilities.
///
/// # Example
/// ```
/// use speciesnetwork::newick::parse_network;
///
/// let network = parse_network("((A:1.0,B:1.0):0.5,C:1.5):0.1;").unwrap();
/// assert_eq!(network.num_leaves(), 3);
/// assert!((network.node(network.origin()).height() - 1.6).abs() < 1e-9);
/// ```
pub fn parse_network<S: AsRef<str>>(newick: S) -> Result<Network, ParsingError> {
    let mut byte_parser = ByteParser::from_str(newick.as_ref());
    NewickParser::new(NetworkBuilder::new()).with_annotations().parse_str(&mut byte_parser)
}

/// Parses a single binary Newick string into a [GeneTree].
///
/// # Example
/// ```
/// use speciesnetwork::newick::parse_gene_tree;
///
/// let tree = parse_gene_tree("((a:0.2,b:0.2):0.3,c:0.5);").unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert!((tree.height() - 0.5).abs() < 1e-9);
/// ```
pub fn parse_gene_tree<S: AsRef<str>>(newick: S) -> Result<GeneTree, ParsingError> {
    let mut byte_parser = ByteParser::from_str(newick.as_ref());
    NewickParser::new(GeneTreeBuilder::new()).parse_str(&mut byte_parser)
}

/// Parses a file containing a semicolon-separated list of gene trees.
///
/// Trees are named after the file stem and their 1-based position, e.g.
/// `loci_2` for the second tree of `loci.nwk`.
///
/// # Errors
/// Returns a [ParsingError] if reading the file fails or any tree is invalid.
pub fn parse_gene_tree_file<P: AsRef<Path>>(path: P) -> Result<Vec<GeneTree>, ParsingError> {
    let path = path.as_ref();
    let stem = path.file_stem().map_or_else(|| "locus".into(), |s| s.to_string_lossy());
    let source = InMemoryByteSource::from_file(path)?;
    let trees = NewickParser::new(GeneTreeBuilder::new()).parse_all(ByteParser::new(source))?;
    Ok(trees.into_iter().enumerate().map(|(i, tree)| tree.with_name(format!("{stem}_{}", i + 1))).collect())
}
