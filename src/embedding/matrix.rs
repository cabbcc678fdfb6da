//! The embedding of one gene tree in the network.

use crate::error::EmbeddingError;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::Network;
use log::trace;

/// Cell value of a gene node that does not pass a network node.
pub const NOT_TRAVERSED: i8 = -1;

// =#========================================================================#=
// EMBEDDING MATRIX
// =#========================================================================#=
/// Traversal directions of gene lineages at network nodes.
///
/// One row per traversal node (non-leaf network node, row = node index minus
/// leaf count), one column per gene node. A cell holds the child slot (`0` or
/// `1`) the gene lineage takes at that network node, or [NOT_TRAVERSED].
///
/// # Example
/// ```
/// use speciesnetwork::embedding::matrix::{EmbeddingMatrix, NOT_TRAVERSED};
///
/// let mut embedding = EmbeddingMatrix::new(3, 5);
/// embedding.set(1, 4, 0);
/// assert_eq!(embedding.direction(1, 4), Some(0));
/// assert_eq!(embedding.get(0, 4), NOT_TRAVERSED);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<i8>,
    stored: Option<(usize, usize, Vec<i8>)>,
    dirty: bool,
}

impl EmbeddingMatrix {
    /// Creates a `rows` x `cols` matrix with all cells [NOT_TRAVERSED].
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![NOT_TRAVERSED; rows * cols], stored: None, dirty: false }
    }

    /// Creates an empty matrix sized for `gene_tree` in `network`.
    pub fn for_network(network: &Network, gene_tree: &GeneTree) -> Self {
        Self::new(network.num_traversal_nodes(), gene_tree.num_nodes())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the raw cell value.
    ///
    /// # Panics
    /// Panics if the cell is out of bounds.
    pub fn get(&self, row: usize, gene: GeneIndex) -> i8 {
        assert!(row < self.rows && gene < self.cols, "cell ({row}, {gene}) out of bounds");
        self.cells[row * self.cols + gene]
    }

    /// Returns the recorded child slot, `None` if not traversed.
    pub fn direction(&self, row: usize, gene: GeneIndex) -> Option<usize> {
        match self.get(row, gene) {
            NOT_TRAVERSED => None,
            d => Some(d as usize),
        }
    }

    /// Sets a cell and marks the matrix dirty.
    ///
    /// # Panics
    /// Panics if the value is not `-1`, `0` or `1`, or the cell is out of bounds.
    pub fn set(&mut self, row: usize, gene: GeneIndex, value: i8) {
        assert!((NOT_TRAVERSED..=1).contains(&value), "invalid embedding value {value}");
        assert!(row < self.rows && gene < self.cols, "cell ({row}, {gene}) out of bounds");
        self.cells[row * self.cols + gene] = value;
        self.dirty = true;
    }

    /// Returns all cells of one row.
    pub fn row(&self, row: usize) -> &[i8] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Resizes to `rows` x `cols` and clears every cell to [NOT_TRAVERSED].
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.cells.clear();
        self.cells.resize(rows * cols, NOT_TRAVERSED);
        self.dirty = true;
    }

    /// Checks that the matrix matches the node counts of `network` and `gene_tree`.
    pub fn check_dimensions(&self, network: &Network, gene_tree: &GeneTree) -> Result<(), EmbeddingError> {
        let (rows, cols) = (network.num_traversal_nodes(), gene_tree.num_nodes());
        if self.rows != rows || self.cols != cols {
            return Err(EmbeddingError::Dimensions { rows, cols, found_rows: self.rows, found_cols: self.cols });
        }
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// Keeps a shadow copy unless one is held already.
    pub fn start_editing(&mut self, editor: &str) {
        if self.stored.is_none() {
            self.store();
        }
        trace!("{editor} starts editing an embedding");
        self.dirty = true;
    }

    pub fn store(&mut self) {
        self.stored = Some((self.rows, self.cols, self.cells.clone()));
    }

    pub fn restore(&mut self) {
        if let Some((rows, cols, cells)) = self.stored.take() {
            self.rows = rows;
            self.cols = cols;
            self.cells = cells;
        }
        self.dirty = false;
    }

    pub fn accept(&mut self) {
        self.stored = None;
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
