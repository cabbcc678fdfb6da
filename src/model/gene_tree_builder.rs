//! Builder for [GeneTree]s from Newick strings.

use crate::model::annotation::AnnotationValue;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::EPSILON;
use crate::model::tree_builder::{PendingVertex, PendingVertices, TreeBuilder, VertexIdx};
use crate::parser::{ParsingError, ParsingErrorType};

// =#========================================================================#=
// GENE TREE BUILDER
// =#========================================================================#=
/// Builds a [GeneTree] from parsed vertices.
///
/// Branch lengths are converted into heights: the deepest leaf sits at `0.0`
/// and every node's height is its distance from that depth. Leaf heights within
/// `1e-7` of zero are snapped to exactly zero.
///
/// Leaves get the first indices in input order, followed by internal nodes
/// in input order, so the root is last.
#[derive(Debug, Default)]
pub struct GeneTreeBuilder {
    pending: PendingVertices,
}

impl GeneTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeBuilder for GeneTreeBuilder {
    type Tree = GeneTree;

    fn init_next(&mut self) {
        self.pending.clear();
    }

    fn add_leaf(&mut self, label: String, branch_length: Option<f64>) -> VertexIdx {
        self.pending.push(PendingVertex { label: Some(label), branch_length, ..Default::default() })
    }

    fn add_internal(&mut self, children: Vec<VertexIdx>, label: Option<String>, branch_length: Option<f64>)
    -> VertexIdx {
        self.pending.push(PendingVertex { label, branch_length, children, ..Default::default() })
    }

    fn add_annotation(&mut self, vertex: VertexIdx, key: String, value: AnnotationValue) {
        self.pending.annotate(vertex, key, value);
    }

    fn finish_tree(&mut self, root: VertexIdx) -> Result<GeneTree, ParsingError> {
        let pending = std::mem::take(&mut self.pending);
        let invalid = |msg: String| ParsingError::without_context(ParsingErrorType::InvalidTreeStructure(msg));

        if pending.vertices.len() < 3 {
            return Err(invalid("a gene tree needs at least two leaves".to_string()));
        }

        // Depth of each vertex below the root, top-down
        let mut depth = vec![f64::NAN; pending.vertices.len()];
        depth[root] = 0.0;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let vertex = &pending[index];
            if !vertex.is_leaf() && vertex.children.len() != 2 {
                return Err(invalid(format!("gene tree vertex {index} has {} children", vertex.children.len())));
            }
            for &child in &vertex.children {
                let length = pending[child]
                    .branch_length
                    .ok_or_else(|| invalid(format!("missing branch length above vertex {child}")))?;
                if length < 0.0 {
                    return Err(invalid(format!("negative branch length {length} above vertex {child}")));
                }
                depth[child] = depth[index] + length;
                stack.push(child);
            }
        }
        if depth.iter().any(|d| d.is_nan()) {
            return Err(invalid("vertices are not connected to the root".to_string()));
        }

        let max_depth = pending
            .vertices
            .iter()
            .zip(&depth)
            .filter(|(v, _)| v.is_leaf())
            .map(|(_, &d)| d)
            .fold(0.0, f64::max);
        let height_of = |index: VertexIdx| {
            let h = max_depth - depth[index];
            if h.abs() < EPSILON { 0.0 } else { h }
        };

        let num_leaves = pending.vertices.iter().filter(|v| v.is_leaf()).count();
        let mut tree = GeneTree::new(num_leaves);

        let mut gene_index: Vec<GeneIndex> = vec![0; pending.vertices.len()];
        for (index, vertex) in pending.vertices.iter().enumerate().filter(|(_, v)| v.is_leaf()) {
            let label = vertex.label.as_deref().unwrap_or_default();
            if label.is_empty() {
                return Err(invalid(format!("leaf vertex {index} has no label")));
            }
            gene_index[index] = tree.add_leaf(label, height_of(index));
        }
        // Children precede their parents in input order
        for (index, vertex) in pending.vertices.iter().enumerate().filter(|(_, v)| !v.is_leaf()) {
            let children = (gene_index[vertex.children[0]], gene_index[vertex.children[1]]);
            gene_index[index] = if index == root {
                tree.add_root(children, height_of(index))
            } else {
                tree.add_internal(children, height_of(index))
            };
        }

        if !tree.is_valid() {
            return Err(invalid("heights or links of the gene tree are inconsistent".to_string()));
        }
        Ok(tree)
    }
}
