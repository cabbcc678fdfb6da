//! Constants for the Newick parser.

/// Newick label delimiters: parentheses, comma, colon, semicolon, whitespace, brackets
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Opening of an annotation block, e.g. `[&gamma=0.3]`
pub(crate) const ANNOTATION_START: &[u8] = b"[&";
