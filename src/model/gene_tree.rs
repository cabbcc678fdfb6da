//! Gene tree module.
//!
//! This module provides the data structures for gene trees embedded in a network:
//! - [GeneTree]: a binary, time-measured tree using the arena pattern.
//! - [GeneNode]: a node of a gene tree with its height.
//! - [GeneIndex] is used to index nodes, and hence embedding columns.

use crate::model::network::EPSILON;
use log::trace;

/// Index of a node in a gene tree (arena).
pub type GeneIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: GeneIndex = usize::MAX;

/// A node of a [GeneTree].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneNode {
    index: GeneIndex,
    height: f64,
    label: Option<String>,
    parent: Option<GeneIndex>,
    children: Option<(GeneIndex, GeneIndex)>,
}

impl GeneNode {
    pub fn index(&self) -> GeneIndex {
        self.index
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn parent(&self) -> Option<GeneIndex> {
        self.parent
    }

    pub fn children(&self) -> Option<(GeneIndex, GeneIndex)> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// =#========================================================================#=
// GENE TREE
// =#========================================================================#=
/// A binary gene tree with node heights (time before present).
///
/// # Structure
/// - All nodes are stored in the arena; the root index is maintained
/// - Leaves occupy the first `num_leaves` indices when built bottom-up via
///   [add_leaf](Self::add_leaf) first, but no operation relies on it
/// - Heights are absolute; a child is never higher than its parent
///
/// # Construction
/// Add leaves, then internal nodes bottom-up, and finally the root.
/// Test validity with [GeneTree::is_valid].
///
/// # Example
/// ```
/// use speciesnetwork::model::gene_tree::GeneTree;
///
/// // ((a:0.2,b:0.2):0.3,c:0.5);
/// let mut tree = GeneTree::new(3);
/// let a = tree.add_leaf("a", 0.0);
/// let b = tree.add_leaf("b", 0.0);
/// let c = tree.add_leaf("c", 0.0);
/// let ab = tree.add_internal((a, b), 0.2);
/// let root = tree.add_root((ab, c), 0.5);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.root_index(), root);
/// assert_eq!(tree.num_nodes(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct GeneTree {
    num_leaves_init: usize,
    nodes: Vec<GeneNode>,
    root_index: GeneIndex,
    name: Option<String>,
    stored: Option<(Vec<GeneNode>, GeneIndex)>,
    dirty: bool,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl GeneTree {
    /// Creates a new gene tree with capacity for `num_leaves` leaves.
    ///
    /// # Arguments
    /// `num_leaves` - number of leaves of the new binary tree; must be positive
    pub fn new(num_leaves: usize) -> Self {
        assert!(num_leaves > 0);
        GeneTree {
            num_leaves_init: num_leaves,
            nodes: Vec::with_capacity(2 * num_leaves - 1),
            root_index: NO_ROOT_SET_INDEX,
            name: None,
            stored: None,
            dirty: false,
        }
    }

    /// Attaches a name to this tree.
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Adds a leaf with the given label and height and returns its index.
    pub fn add_leaf(&mut self, label: &str, height: f64) -> GeneIndex {
        let index = self.nodes.len();
        self.nodes.push(GeneNode {
            index,
            height,
            label: Some(label.to_string()),
            parent: None,
            children: None,
        });
        index
    }

    /// Adds an internal node above `children` and returns its index.
    pub fn add_internal(&mut self, children: (GeneIndex, GeneIndex), height: f64) -> GeneIndex {
        let index = self.nodes.len();
        self.nodes.push(GeneNode {
            index,
            height,
            label: None,
            parent: None,
            children: Some(children),
        });
        self.nodes[children.0].parent = Some(index);
        self.nodes[children.1].parent = Some(index);
        index
    }

    /// Adds the root above `children` and returns its index.
    pub fn add_root(&mut self, children: (GeneIndex, GeneIndex), height: f64) -> GeneIndex {
        let index = self.add_internal(children, height);
        self.root_index = index;
        index
    }

    /// Validates the tree structure, all index references and heights.
    ///
    /// Checks:
    /// - Root index is set and the root has no parent
    /// - Node indices match their arena position
    /// - Children point back to their parent, every non-root has a parent
    ///   listing it as a child
    /// - There are as many leaves as initialized, all labelled
    /// - No child is higher than its parent
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if self.root_index >= self.nodes.len() || !self.nodes[self.root_index].is_root() {
            return false;
        }

        let mut leaf_count = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            if node.index != index {
                return false;
            }

            match node.children {
                Some((left, right)) => {
                    if left >= self.nodes.len() || right >= self.nodes.len() || left == right {
                        return false;
                    }
                    for child in [left, right] {
                        if self.nodes[child].parent != Some(index) {
                            return false;
                        }
                        if self.nodes[child].height > node.height + EPSILON {
                            return false;
                        }
                    }
                }
                None => {
                    leaf_count += 1;
                    if node.label.is_none() {
                        return false;
                    }
                }
            }

            match node.parent {
                None if index != self.root_index => return false,
                Some(parent) => {
                    let listed = self
                        .nodes
                        .get(parent)
                        .and_then(|p| p.children)
                        .is_some_and(|(l, r)| l == index || r == index);
                    if !listed {
                        return false;
                    }
                }
                None => {}
            }
        }

        leaf_count == self.num_leaves_init
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn root_index(&self) -> GeneIndex {
        self.root_index
    }

    /// Returns a reference to the root node.
    ///
    /// # Panics
    /// Panics if the root hasn't been set.
    pub fn root(&self) -> &GeneNode {
        &self[self.root_index]
    }

    pub fn node(&self, index: GeneIndex) -> &GeneNode {
        &self[index]
    }

    pub fn nodes(&self) -> &[GeneNode] {
        &self.nodes
    }

    /// Returns the indices of all leaves.
    pub fn leaves(&self) -> impl Iterator<Item = GeneIndex> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.index)
    }

    /// Returns the height of the root.
    pub fn height(&self) -> f64 {
        self.root().height
    }

    pub fn set_height(&mut self, index: GeneIndex, height: f64) {
        self.nodes[index].height = height;
    }

    /// Returns the leaves of the subtree below `index` (including itself).
    pub fn subtree_leaves(&self, index: GeneIndex) -> Vec<GeneIndex> {
        self.pre_order_iter_from(index).filter(|n| n.is_leaf()).map(|n| n.index).collect()
    }

    /// Returns whether `ancestor` lies on the path from `index` to the root.
    pub fn is_ancestor(&self, ancestor: GeneIndex, index: GeneIndex) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    /// Returns an iterator over the tree in post-order (children before parents).
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self, self.root_index)
    }

    /// Returns an iterator over the subtree below `index` in pre-order.
    pub fn pre_order_iter_from(&self, index: GeneIndex) -> PreOrderIter<'_> {
        PreOrderIter::new(self, index)
    }
}

impl std::ops::Index<GeneIndex> for GeneTree {
    type Output = GeneNode;

    fn index(&self, index: GeneIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

// ============================================================================
// Editing (pub)
// ============================================================================
impl GeneTree {
    /// Requests write access for a proposal by `editor`, snapshotting the tree
    /// unless a snapshot is held already.
    pub fn start_editing(&mut self, editor: &str) {
        if self.stored.is_none() {
            self.store();
        }
        trace!("{editor} starts editing gene tree {:?}", self.name);
        self.dirty = true;
    }

    pub fn store(&mut self) {
        self.stored = Some((self.nodes.clone(), self.root_index));
    }

    pub fn restore(&mut self) {
        if let Some((nodes, root_index)) = self.stored.take() {
            self.nodes = nodes;
            self.root_index = root_index;
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

    /// Moves `moved` from its place onto the lineage above `graft`.
    ///
    /// The child `disowned` of `moved` takes its place below the former parent
    /// of `moved` (or becomes the root), and `moved` is inserted between `graft`
    /// and its parent, with `graft` in the slot `disowned` had before.
    /// Heights are untouched, so `graft` must be below and its parent above
    /// `moved`.
    ///
    /// # Panics
    /// Panics if `disowned` is not a child of `moved`.
    pub fn prune_and_regraft(&mut self, moved: GeneIndex, disowned: GeneIndex, graft: GeneIndex) {
        let (left, right) = self.nodes[moved].children.expect("moved node must be internal");
        assert!(left == disowned || right == disowned, "disowned node must be a child of the moved node");

        // Prune: disowned replaces moved
        let former_parent = self.nodes[moved].parent;
        self.replace_child_of(former_parent, moved, disowned);

        // Regraft: moved goes between graft and its parent
        let graft_parent = self.nodes[graft].parent;
        self.replace_child_of(graft_parent, graft, moved);
        self.nodes[moved].children = Some(if left == disowned { (graft, right) } else { (left, graft) });
        self.nodes[graft].parent = Some(moved);
    }

    /// Puts `new` where `old` was, below `parent` or as the root.
    fn replace_child_of(&mut self, parent: Option<GeneIndex>, old: GeneIndex, new: GeneIndex) {
        match parent {
            Some(p) => {
                if let Some((l, r)) = self.nodes[p].children.as_mut() {
                    if *l == old {
                        *l = new;
                    } else if *r == old {
                        *r = new;
                    }
                }
            }
            None => self.root_index = new,
        }
        self.nodes[new].parent = parent;
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for post-order traversal (children before parents).
///
/// Stack-based, no recursion.
pub struct PostOrderIter<'a> {
    tree: &'a GeneTree,
    stack: Vec<(GeneIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a GeneTree, start: GeneIndex) -> Self {
        let mut stack = Vec::new();
        if start < tree.nodes.len() {
            stack.push((start, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a GeneNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree[index];

            match node.children {
                Some((left, right)) if !children_visited => {
                    self.stack.push((index, true));
                    // Right first, so left is processed first
                    self.stack.push((right, false));
                    self.stack.push((left, false));
                }
                _ => return Some(node),
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    tree: &'a GeneTree,
    stack: Vec<GeneIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a GeneTree, start: GeneIndex) -> Self {
        let mut stack = Vec::new();
        if start < tree.nodes.len() {
            stack.push(start);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a GeneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree[index];

        if let Some((left, right)) = node.children {
            self.stack.push(right);
            self.stack.push(left);
        }

        Some(node)
    }
}
