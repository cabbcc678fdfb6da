//! Low-level byte-by-byte parser for ASCII text.
//!
//! This module provides [ByteParser] with peeking, consuming, pattern matching,
//! and quote-aware label parsing. It is the foundation of the extended Newick
//! parser in [crate::newick].

use crate::parser::byte_source::{ByteSource, InMemoryByteSource};
use crate::parser::parsing_error::ParsingError;
use ConsumeMode::Inclusive;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser for ASCII text with support for peeking, consuming, and pattern matching.
///
/// # Features
/// - Works with any [ByteSource]
/// - Whitespace and comment skipping, optionally leaving `[&...]` annotation
///   blocks in place
/// - Quote-aware label parsing (single quotes with escaping)
/// - Context extraction for error reporting
///
/// # Example
/// ```
/// use speciesnetwork::parser::byte_parser::ByteParser;
///
/// let mut parser = ByteParser::from_str("  [comment] (A:1.0,B:1.0);");
/// parser.skip_comment_and_whitespace().unwrap();
/// assert!(parser.peek_is(b'('));
///
/// let mut parser = ByteParser::from_str(" [&gamma=0.3]:0.5");
/// parser.skip_plain_comments_and_whitespace().unwrap();
/// assert!(parser.peek_is_sequence(b"[&"));
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
}

impl ByteParser<InMemoryByteSource> {
    /// Creates a new `ByteParser` from a String by copying it into a Vec.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.as_bytes().to_vec()))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a new `ByteParser` from a byte source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Peeks at the current byte without consuming it.
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.source.peek()
    }

    /// Gets the current byte and advances the position (consumes it).
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Skips (consumes) all consecutive whitespace characters.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.next_byte();
            } else {
                break;
            }
        }
    }

    /// Skips (consumes) a comment `[...]` if present.
    ///
    /// # Returns
    /// * `Ok(true)` - A comment was found and consumed
    /// * `Ok(false)` - No comment at current position
    ///
    /// # Errors
    /// Returns an error if a comment starts with `[` but doesn't have a closing `]`.
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if self.consume_if(b'[') {
            if !self.consume_until(b']', Inclusive) {
                return Err(ParsingError::unclosed_comment(self));
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// Skips (consumes) all consecutive whitespace and comments, including
    /// annotation blocks.
    ///
    /// # Errors
    /// Returns an error if an unclosed comment is encountered.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();

        while self.skip_comment()? {
            self.skip_whitespace();
        }

        Ok(())
    }

    /// Like [skip_comment_and_whitespace](Self::skip_comment_and_whitespace),
    /// but stops in front of an annotation block `[&...]`.
    ///
    /// # Errors
    /// Returns an error if an unclosed comment is encountered.
    pub fn skip_plain_comments_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();

        while !self.peek_is_sequence(b"[&") && self.skip_comment()? {
            self.skip_whitespace();
        }

        Ok(())
    }

    /// Checks if the current byte matches the target byte.
    pub fn peek_is(&self, ch: u8) -> bool {
        self.peek() == Some(ch)
    }

    /// Checks if the upcoming bytes match the given sequence exactly.
    pub fn peek_is_sequence(&self, sequence: &[u8]) -> bool {
        self.source.peek_slice(sequence.len()) == sequence
    }

    /// Consumes the current byte if it matches `ch`.
    ///
    /// # Returns
    /// `true` if the byte matched and was consumed, `false` otherwise
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes the upcoming bytes if they match `sequence` exactly.
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if self.peek_is_sequence(sequence) {
            for _ in 0..sequence.len() {
                self.next_byte();
            }
            true
        } else {
            false
        }
    }

    /// Consumes bytes until the target byte is found.
    ///
    /// # Returns
    /// `true` if the target was found, `false` if EOF was reached first
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    pub fn is_eof(&self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current byte offset.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Returns up to `k` bytes from the current position for error context.
    pub fn get_context(&self, k: usize) -> Vec<u8> {
        self.source.get_context(k)
    }

    pub fn get_context_as_string(&self, k: usize) -> String {
        let context_bytes = &self.get_context(k);
        String::from_utf8_lossy(context_bytes).chars().collect()
    }

    /// Parses a label (quoted or unquoted) with the given delimiter set.
    ///
    /// # Errors
    /// Returns an error if skipping a leading comment fails
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_plain_comments_and_whitespace()?;

        if self.peek() == Some(b'\'') {
            self.parse_quoted_label()
        } else {
            self.parse_unquoted_label(delimiters)
        }
    }

    /// Parses a quoted label enclosed in single quotes with escape support.
    ///
    /// Single quotes within the label are escaped by doubling them
    /// (e.g., `'Wilson''s'` becomes `Wilson's`).
    ///
    /// # Errors
    /// Returns an error if the quoted label is not closed before EOF
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.next_byte(); // consume opening '

        let mut label = String::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => {
                    if self.peek() == Some(b'\'') {
                        label.push('\'');
                        self.next_byte();
                    } else {
                        break;
                    }
                }
                Some(b) => label.push(b as char),
                None => return Err(ParsingError::unexpected_eof(self)),
            }
        }

        Ok(label)
    }

    /// Parses an unquoted label until any of the given delimiters is encountered.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let mut label = String::new();

        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            label.push(b as char);
            self.next_byte();
        }

        Ok(label)
    }
}

/// Specifies whether to consume or leave the target when using `consume_until` methods.
///
/// # Examples
/// ```
/// use speciesnetwork::parser::byte_parser::{ByteParser, ConsumeMode};
///
/// let mut parser = ByteParser::from_str("[a comment] (A,B);");
/// parser.consume_until(b']', ConsumeMode::Inclusive);
/// assert_eq!(parser.peek(), Some(b' '));
///
/// let mut parser = ByteParser::from_str("(A,B);");
/// parser.consume_until(b';', ConsumeMode::Exclusive);
/// assert_eq!(parser.peek(), Some(b';'));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeMode {
    /// Consume everything up to and including the target
    Inclusive,
    /// Consume everything up to but not including the target
    Exclusive,
}
