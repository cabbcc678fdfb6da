//! Trait for constructing networks and gene trees during parsing.
//!
//! The [`TreeBuilder`] trait decouples the Newick parser from the concrete
//! representations. The parser calls builder methods as it reads (extended)
//! Newick syntax, and the builder assembles a [Network](crate::model::Network)
//! or a [GeneTree](crate::model::GeneTree) when the tree is finished.
//!
//! # Built-in implementations
//! * [`GeneTreeBuilder`](crate::model::GeneTreeBuilder) - binary gene trees
//!   with branch lengths converted to heights
//! * [`NetworkBuilder`](crate::model::NetworkBuilder) - networks with `#H`
//!   hybrid labels merged into reticulations
//!
//! # Builder lifecycle
//! A builder can construct multiple trees sequentially:
//!
//! ```text
//! Empty ──→ init_next() ──→ Building ──→ add_* ──→ finish_tree() ──→ Empty
//!   ↑                                                                  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::model::annotation::AnnotationValue;
use crate::parser::ParsingError;

/// Index of a vertex while a tree is being parsed.
pub type VertexIdx = usize;

// =#========================================================================#=
// TREE BUILDER (trait)
// =#========================================================================#=
/// Abstraction for constructing trees during parsing.
///
/// Vertices are handed to the builder bottom-up: the children of a vertex
/// are always added before the vertex itself, so the root comes last.
pub trait TreeBuilder {
    /// The type produced by this builder.
    type Tree;

    /// Prepares the builder for constructing a new tree.
    fn init_next(&mut self);

    /// Adds a childless vertex with its label and optional branch length.
    fn add_leaf(&mut self, label: String, branch_length: Option<f64>) -> VertexIdx;

    /// Adds a vertex above `children`, with optional label and branch length.
    fn add_internal(&mut self, children: Vec<VertexIdx>, label: Option<String>, branch_length: Option<f64>)
    -> VertexIdx;

    /// Attaches an annotation `key=value` to a vertex added before.
    fn add_annotation(&mut self, vertex: VertexIdx, key: String, value: AnnotationValue);

    /// Assembles the tree with the given root and resets the builder.
    ///
    /// # Errors
    /// Returns a [ParsingError] if the parsed vertices do not form a valid
    /// instance of [Self::Tree].
    fn finish_tree(&mut self, root: VertexIdx) -> Result<Self::Tree, ParsingError>;
}

// =#========================================================================#=
// PENDING VERTICES
// =#========================================================================#=
/// A vertex as read from the input, before conversion.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingVertex {
    pub(crate) label: Option<String>,
    pub(crate) branch_length: Option<f64>,
    pub(crate) children: Vec<VertexIdx>,
    pub(crate) annotations: Vec<(String, AnnotationValue)>,
}

impl PendingVertex {
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the numeric value of an annotation, if present.
    pub(crate) fn annotation_f64(&self, key: &str) -> Option<f64> {
        self.annotations.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_f64())
    }
}

/// Shared vertex storage of the built-in builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingVertices {
    pub(crate) vertices: Vec<PendingVertex>,
}

impl PendingVertices {
    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
    }

    pub(crate) fn push(&mut self, vertex: PendingVertex) -> VertexIdx {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    pub(crate) fn annotate(&mut self, vertex: VertexIdx, key: String, value: AnnotationValue) {
        self.vertices[vertex].annotations.push((key, value));
    }

    /// Returns the parent of every vertex, `None` for the root.
    pub(crate) fn parents(&self) -> Vec<Option<VertexIdx>> {
        let mut parents = vec![None; self.vertices.len()];
        for (index, vertex) in self.vertices.iter().enumerate() {
            for &child in &vertex.children {
                parents[child] = Some(index);
            }
        }
        parents
    }
}

impl std::ops::Index<VertexIdx> for PendingVertices {
    type Output = PendingVertex;

    fn index(&self, index: VertexIdx) -> &Self::Output {
        &self.vertices[index]
    }
}
