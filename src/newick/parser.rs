//! Structs and logic to parse (extended) Newick strings.
//!
//! This module provides the [NewickParser] struct, which parses single
//! strings or all trees of a source into any [TreeBuilder] output.

use crate::model::annotation::AnnotationValue;
use crate::model::tree_builder::{TreeBuilder, VertexIdx};
use crate::newick::defs::{ANNOTATION_START, NEWICK_LABEL_DELIMITERS};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser (configuration) for (extended) Newick strings.
///
/// Generic over [TreeBuilder] (construction). Vertices may have any number
/// of children and optional labels, so that hybrid occurrences such as
/// `(B:1)#H1:1` and `#H1:2` reach the builder unchanged.
///
/// # Configuration
/// * [`with_annotations()`](Self::with_annotations)
///     - Configures the parser to pass vertex annotations
///       (e.g. `[&gamma=0.3]`) to the builder instead of treating them as
///       comments. Annotations may stand before or after the branch length.
///
/// # Example
/// ```
/// use speciesnetwork::model::NetworkBuilder;
/// use speciesnetwork::newick::NewickParser;
/// use speciesnetwork::parser::byte_parser::ByteParser;
///
/// let input = "((A:2,(B:1)#H1[&gamma=0.3]:1):1,(#H1:1.5,C:2.5):0.5):0.25;";
/// let mut byte_parser = ByteParser::from_str(input);
/// let mut newick_parser = NewickParser::new(NetworkBuilder::new()).with_annotations();
///
/// let network = newick_parser.parse_str(&mut byte_parser).unwrap();
/// assert_eq!(network.num_reticulations(), 1);
/// assert_eq!(network.gammas(), vec![0.3]);
/// ```
pub struct NewickParser<T: TreeBuilder> {
    tree_builder: T,
    parse_annotations: bool,
}

// ============================================================================
// Construction & Configuration, Deconstruction (pub)
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Creates a new [NewickParser] with the given tree builder.
    pub fn new(tree_builder: T) -> Self {
        Self { tree_builder, parse_annotations: false }
    }

    /// Configures the parser to parse vertex annotations.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Consumes the parser and returns its [TreeBuilder].
    pub fn into_builder(self) -> T {
        self.tree_builder
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Parses all Newick trees from the byte source until EOF.
    ///
    /// # Returns
    /// * `Ok(Vec<T::Tree>)` - All parsed trees
    /// * `Err(ParsingError)` - If any tree fails to parse
    pub fn parse_all<B: ByteSource>(&mut self, mut byte_parser: ByteParser<B>) -> Result<Vec<T::Tree>, ParsingError> {
        let mut trees = Vec::new();
        loop {
            byte_parser.skip_comment_and_whitespace()?;
            if byte_parser.is_eof() {
                break;
            }
            trees.push(self.parse_str(&mut byte_parser)?);
        }
        Ok(trees)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Returns
    /// * `Ok(T::Tree)` - The tree assembled by the builder
    /// * `Err(ParsingError)` - If the Newick format is invalid or the builder
    ///   rejects the parsed structure
    pub fn parse_str<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<T::Tree, ParsingError> {
        self.tree_builder.init_next();
        let root = self.parse_root(parser)?;
        self.tree_builder.finish_tree(root)
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Parses root of tree and the terminating semicolon:
    /// - `vertex ;`
    fn parse_root<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<VertexIdx, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        let root = self.parse_vertex(parser)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }

        Ok(root)
    }

    /// Parses a vertex (either internal vertex or leaf) and returns its index:
    /// - Dispatches to `parse_internal_vertex` if starts with `(`, otherwise `parse_leaf`
    fn parse_vertex<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<VertexIdx, ParsingError> {
        self.skip(parser)?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser)
        } else {
            self.parse_leaf(parser)
        }
    }

    /// Parses internal vertex, adds it to tree, and returns its index:
    /// - `(children)[label][annotation][:branch_length][annotation]`
    fn parse_internal_vertex<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<VertexIdx, ParsingError> {
        let children = self.parse_children(parser)?;
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        let label = if label.is_empty() { None } else { Some(label) };
        let (branch_length, annotations) = self.parse_suffix(parser)?;

        let index = self.tree_builder.add_internal(children, label, branch_length);
        self.add_annotations(annotations, index);

        Ok(index)
    }

    /// Parses a child list `(vertex, ..., vertex)` and returns the child indices:
    /// - Expects parser at opening `(`
    fn parse_children<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<Vec<VertexIdx>, ParsingError> {
        if !parser.consume_if(b'(') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {:?}", next_char),
            ));
        }

        let mut children = vec![self.parse_vertex(parser)?];
        loop {
            self.skip(parser)?;
            if parser.consume_if(b',') {
                children.push(self.parse_vertex(parser)?);
            } else if parser.consume_if(b')') {
                break;
            } else if parser.is_eof() {
                return Err(ParsingError::unexpected_eof(parser));
            } else {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ',' or ')' after child but found {:?}", next_char),
                ));
            }
        }

        Ok(children)
    }

    /// Parses leaf vertex and adds it to tree:
    /// - `label[annotation][:branch_length][annotation]`
    fn parse_leaf<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<VertexIdx, ParsingError> {
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        if label.is_empty() {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected leaf label but found {:?}", next_char),
            ));
        }
        let (branch_length, annotations) = self.parse_suffix(parser)?;

        let index = self.tree_builder.add_leaf(label, branch_length);
        self.add_annotations(annotations, index);

        Ok(index)
    }

    /// Parses what may follow a label: annotations before and after an
    /// optional branch length.
    fn parse_suffix<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<(Option<f64>, Vec<(String, AnnotationValue)>), ParsingError> {
        let mut annotations = self.parse_annotations(parser)?;
        let branch_length = self.parse_branch_length(parser)?;
        annotations.extend(self.parse_annotations(parser)?);
        Ok((branch_length, annotations))
    }

    /// Parses optional branch length `[:number]`:
    /// - Supports scientific notation (e.g., `1.5e-10`)
    ///
    /// # Returns
    /// - `Ok(Some(branch_length))` if found a branch length and was able to parse it
    /// - `Ok(None)` if no branch length found
    /// - [ParsingError] if it couldn't parse branch length value
    fn parse_branch_length<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<Option<f64>, ParsingError> {
        self.skip(parser)?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_whitespace();

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            // Valid characters for a float: digits, '.', '-', '+', 'e', 'E'
            if b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+' || b == b'e' || b == b'E' {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = branch_length_str.parse().map_err(|_| {
            ParsingError::invalid_newick_string(parser, format!("Invalid branch length: {}", branch_length_str))
        })?;
        Ok(Some(value))
    }

    /// Parses an annotation block `[&key=value,...]` if present and enabled.
    ///
    /// Note that `[` without `&` is a regular comment, not an annotation.
    ///
    /// # Returns
    /// * `Ok(pairs)` - Parsed key-value pairs, empty if there was no block
    /// * `Err(ParsingError)` - If annotation block is malformed
    fn parse_annotations<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<Vec<(String, AnnotationValue)>, ParsingError> {
        let mut annotations = Vec::new();
        self.skip(parser)?;
        if !self.parse_annotations || !parser.consume_if_sequence(ANNOTATION_START) {
            return Ok(annotations);
        }

        loop {
            let key = parser.parse_unquoted_label(b"=,]")?;
            if key.is_empty() || !parser.consume_if(b'=') {
                return Err(ParsingError::invalid_newick_string(parser, "Empty annotation key".to_string()));
            }

            let value_str = parser.parse_unquoted_label(b",]")?;
            if value_str.is_empty() {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Empty annotation value for key '{}'", key),
                ));
            }
            annotations.push((key.trim().to_string(), AnnotationValue::parse(value_str.trim())));

            // ',' means more pairs, ']' means end
            if !parser.consume_if(b',') {
                break;
            }
        }

        if !parser.consume_if(b']') {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Expected ']' at end of annotation block".to_string(),
            ));
        }

        Ok(annotations)
    }

    /// Passes parsed annotations on to the [TreeBuilder].
    fn add_annotations(&mut self, annotations: Vec<(String, AnnotationValue)>, vertex: VertexIdx) {
        for (key, value) in annotations {
            self.tree_builder.add_annotation(vertex, key, value);
        }
    }

    /// Skips whitespace and comments, keeping annotation blocks if they are parsed.
    fn skip<B: ByteSource>(&self, parser: &mut ByteParser<B>) -> Result<(), ParsingError> {
        if self.parse_annotations {
            parser.skip_plain_comments_and_whitespace()
        } else {
            parser.skip_comment_and_whitespace()
        }
    }
}
