//! Low-level parsing infrastructure.
//!
//! This module provides the byte-level parser and the error type used by the
//! extended Newick reader in [crate::newick].

pub mod byte_parser;
pub mod byte_source;
pub mod parsing_error;

pub use parsing_error::{ParsingError, ParsingErrorType};
