//! Network module for phylogenetic network representation.
//!
//! This module provides the core data structure of the crate:
//! - [Network]: a rooted DAG of [NetworkNode]s using the arena pattern, with
//!   an explicit branch table addressed by [BranchNumber].
//! - [Branch]: a directed edge from a parent to a child node.

use crate::error::StructuralFault;
use crate::model::network_node::{BranchNumber, NetworkNode, NodeIndex, NodeKind};
use log::trace;

/// Float comparison tolerance
pub(crate) const EPSILON: f64 = 1e-7;

/// A directed edge of a [Network], from `parent` (older) to `child` (younger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub(crate) parent: NodeIndex,
    pub(crate) child: NodeIndex,
}

impl Branch {
    pub fn parent(&self) -> NodeIndex {
        self.parent
    }

    pub fn child(&self) -> NodeIndex {
        self.child
    }
}

/// Copy of the node and branch tables, held while a proposal is under way.
#[derive(Debug, Clone)]
struct Snapshot {
    nodes: Vec<NetworkNode>,
    branches: Vec<Branch>,
    origin: Option<NodeIndex>,
}

// =#========================================================================#=
// NETWORK
// =#========================================================================#=
/// A phylogenetic network stored as a node arena plus a branch table.
///
/// # Structure
/// - Leaves occupy the first `num_leaves` indices, which lets an embedding row
///   be addressed as `node index - num_leaves`.
/// - Each branch is owned by its child: a node lists the branches towards its
///   parents (gamma branch first) and towards its children (direction `0` first).
/// - The origin has a single child branch, the *root branch*, leading to the root.
///
/// # Editing
/// Operators call [start_editing](Self::start_editing) before the first write of
/// a proposal. This takes a snapshot of both tables (unless one is held already)
/// that [restore](Self::restore) rolls back to and [accept](Self::accept) drops.
///
/// # Example
/// ```
/// use speciesnetwork::model::network::Network;
/// use speciesnetwork::model::network_node::NodeKind;
///
/// // (A:1.0,B:1.0):0.5; with the origin 0.5 above the root
/// let mut network = Network::new();
/// let a = network.add_leaf("A");
/// let b = network.add_leaf("B");
/// let root = network.new_node(NodeKind::Speciation, 1.0);
/// let origin = network.new_node(NodeKind::Origin, 1.5);
/// network.add_branch(root, a);
/// network.add_branch(root, b);
/// network.add_branch(origin, root);
///
/// assert!(network.check_sanity().is_ok());
/// assert_eq!(network.branch_count(), 3);
/// assert_eq!(network.root(), root);
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    branches: Vec<Branch>,
    num_leaves: usize,
    origin: Option<NodeIndex>,
    stored: Option<Snapshot>,
    dirty: bool,
}

// ============================================================================
// New, Construction (pub)
// ============================================================================
impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Network {
            nodes: Vec::new(),
            branches: Vec::new(),
            num_leaves: 0,
            origin: None,
            stored: None,
            dirty: false,
        }
    }

    /// Adds a leaf at height `0.0` and returns its index.
    ///
    /// # Panics
    /// Panics if a non-leaf node has been added already.
    pub fn add_leaf(&mut self, label: &str) -> NodeIndex {
        assert_eq!(self.num_leaves, self.nodes.len(), "leaves must be added before internal nodes");
        let index = self.nodes.len();
        self.nodes.push(NetworkNode::new_leaf(index, label.to_string()));
        self.num_leaves += 1;
        index
    }

    /// Allocates a fresh, unconnected non-leaf node and returns its index.
    ///
    /// # Panics
    /// Panics if `kind` is [NodeKind::Leaf] or a second origin is requested.
    pub fn new_node(&mut self, kind: NodeKind, height: f64) -> NodeIndex {
        assert!(kind != NodeKind::Leaf, "leaves are added with add_leaf");
        let index = self.nodes.len();
        if kind == NodeKind::Origin {
            assert!(self.origin.is_none(), "network already has an origin");
            self.origin = Some(index);
        }
        self.nodes.push(NetworkNode::new(index, kind, height));
        index
    }

    /// Adds a branch from `parent` to `child`, appending it to the child slots
    /// of `parent` and the parent slots of `child`.
    pub fn add_branch(&mut self, parent: NodeIndex, child: NodeIndex) -> BranchNumber {
        let number = self.branches.len();
        self.branches.push(Branch { parent, child });
        self.nodes[parent].child_branches.push(number);
        self.nodes[child].parent_branches.push(number);
        number
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Network {
    /// Returns the number of nodes, including leaves and origin.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Returns the number of nodes that lineages traverse, i.e. all non-leaf
    /// nodes (including the origin). This is the row count of an embedding.
    pub fn num_traversal_nodes(&self) -> usize {
        self.nodes.len() - self.num_leaves
    }

    /// Returns the embedding row of a node, `None` for leaves.
    pub fn traversal_index(&self, node: NodeIndex) -> Option<usize> {
        node.checked_sub(self.num_leaves)
    }

    /// Returns the number of branches implied by the node kinds: one per leaf
    /// and speciation, two per reticulation.
    pub fn branch_count(&self) -> usize {
        self.nodes.iter().map(|n| n.kind().num_parents()).sum()
    }

    /// Returns the branch with the given number.
    pub fn branch(&self, branch: BranchNumber) -> &Branch {
        &self.branches[branch]
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Returns the (child) node at the tipward end of a branch.
    pub fn node_for_branch(&self, branch: BranchNumber) -> NodeIndex {
        self.branches[branch].child
    }

    /// Returns the node at the rootward end of a branch.
    pub fn branch_parent(&self, branch: BranchNumber) -> NodeIndex {
        self.branches[branch].parent
    }

    /// Returns the length of a branch, i.e. the height difference of its ends.
    pub fn branch_length(&self, branch: BranchNumber) -> f64 {
        let Branch { parent, child } = self.branches[branch];
        self.nodes[parent].height() - self.nodes[child].height()
    }

    /// Returns the index of the origin.
    ///
    /// # Panics
    /// Panics if the network has no origin yet.
    pub fn origin(&self) -> NodeIndex {
        self.origin.expect("network has no origin")
    }

    /// Returns the branch from the origin to the root.
    pub fn root_branch(&self) -> BranchNumber {
        self.nodes[self.origin()].child_branches[0]
    }

    /// Returns the index of the root, the only child of the origin.
    pub fn root(&self) -> NodeIndex {
        self.branches[self.root_branch()].child
    }

    pub fn root_height(&self) -> f64 {
        self.nodes[self.root()].height()
    }

    /// Returns the summed length of all branches except the root branch.
    pub fn network_length(&self) -> f64 {
        let root_branch = self.root_branch();
        (0..self.branches.len())
            .filter(|&b| b != root_branch)
            .map(|b| self.branch_length(b))
            .sum()
    }

    pub fn node(&self, index: NodeIndex) -> &NetworkNode {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> &mut NetworkNode {
        &mut self.nodes[index]
    }

    pub fn all_nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn leaf_nodes(&self) -> &[NetworkNode] {
        &self.nodes[..self.num_leaves]
    }

    /// Returns the first leaf with the given label.
    pub fn leaf_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.leaf_nodes().iter().position(|n| n.label() == Some(label))
    }

    /// Returns all speciation and reticulation nodes.
    pub fn internal_nodes(&self) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .filter(|n| n.is_speciation() || n.is_reticulation())
            .map(|n| n.index())
            .collect()
    }

    /// Returns all speciation and reticulation nodes plus the origin.
    pub fn internal_nodes_including_origin(&self) -> Vec<NodeIndex> {
        (self.num_leaves..self.nodes.len()).collect()
    }

    /// Returns all reticulations in index order; the position in this list is
    /// the reticulation number used to address the gamma vector.
    pub fn reticulation_nodes(&self) -> Vec<NodeIndex> {
        self.nodes.iter().filter(|n| n.is_reticulation()).map(|n| n.index()).collect()
    }

    pub fn num_reticulations(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_reticulation()).count()
    }

    /// Returns the reticulation number of a node, `None` unless reticulation.
    pub fn reticulation_number(&self, node: NodeIndex) -> Option<usize> {
        if !self.nodes[node].is_reticulation() {
            return None;
        }
        Some(self.nodes[..node].iter().filter(|n| n.is_reticulation()).count())
    }

    /// Returns the inheritance probabilities of all reticulations, by
    /// reticulation number.
    pub fn gammas(&self) -> Vec<f64> {
        self.nodes.iter().filter_map(|n| n.gamma()).collect()
    }

    /// Returns the parent of a node through the parent slot `slot`.
    pub fn parent(&self, node: NodeIndex, slot: usize) -> Option<NodeIndex> {
        self.nodes[node].parent_branches.get(slot).map(|&b| self.branches[b].parent)
    }

    /// Returns the child of a node in embedding direction `direction`.
    pub fn child(&self, node: NodeIndex, direction: usize) -> Option<NodeIndex> {
        self.nodes[node].child_branch(direction).map(|b| self.branches[b].child)
    }

    /// Returns the parents of a node, gamma parent first.
    pub fn parents(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[node].parent_branches.iter().map(|&b| self.branches[b].parent)
    }

    /// Returns the children of a node, direction `0` first.
    pub fn children(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[node].child_branches.iter().map(|&b| self.branches[b].child)
    }

    /// Returns all nodes reachable from the origin such that every node comes
    /// after all of its children (post-order on the DAG).
    pub fn post_order(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![(self.origin(), false)];

        while let Some((index, children_visited)) = stack.pop() {
            if children_visited {
                order.push(index);
                continue;
            }
            if visited[index] {
                continue;
            }
            visited[index] = true;
            stack.push((index, true));
            for child in self.children(index).collect::<Vec<_>>().into_iter().rev() {
                if !visited[child] {
                    stack.push((child, false));
                }
            }
        }

        order
    }

    /// Returns whether `ancestor` can be reached going rootward from `node`
    /// (a node is its own ancestor).
    pub fn is_ancestor(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        let mut stack = vec![node];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if std::mem::replace(&mut visited[current], true) {
                continue;
            }
            stack.extend(self.parents(current));
        }
        false
    }
}

impl std::ops::Index<NodeIndex> for Network {
    type Output = NetworkNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<NodeIndex> for Network {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

// ============================================================================
// Editing lifecycle (pub)
// ============================================================================
impl Network {
    /// Requests write access for a proposal by `editor`.
    ///
    /// Takes a snapshot unless one is held already and marks the network dirty.
    pub fn start_editing(&mut self, editor: &str) {
        if self.stored.is_none() {
            self.store();
        }
        trace!("{editor} starts editing the network");
        self.dirty = true;
    }

    /// Stores a snapshot of the current tables.
    pub fn store(&mut self) {
        self.stored = Some(Snapshot {
            nodes: self.nodes.clone(),
            branches: self.branches.clone(),
            origin: self.origin,
        });
    }

    /// Rolls back to the last snapshot, if any, and clears the dirty flag.
    pub fn restore(&mut self) {
        if let Some(snapshot) = self.stored.take() {
            self.nodes = snapshot.nodes;
            self.branches = snapshot.branches;
            self.origin = snapshot.origin;
        }
        self.dirty = false;
    }

    /// Drops the snapshot, keeping the current tables.
    pub fn accept(&mut self) {
        self.stored = None;
        self.dirty = false;
    }

    /// Returns whether the network was edited since the last store/accept.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

// ============================================================================
// Surgery (crate)
// ============================================================================
impl Network {
    /// Moves the rootward end of `branch` to `parent`.
    ///
    /// The branch leaves the child slots of its former parent (a no-op if it
    /// was displaced there already) and takes the slot of `in_place_of` among
    /// the children of `parent`, or is appended if `None`. The tipward end and
    /// thus the parent slots of its child are unchanged.
    pub(crate) fn move_branch_top(&mut self, branch: BranchNumber, parent: NodeIndex, in_place_of: Option<BranchNumber>) {
        let former = self.branches[branch].parent;
        self.nodes[former].remove_child_branch(branch);
        self.branches[branch].parent = parent;
        match in_place_of {
            Some(old) => self.nodes[parent].replace_child_branch(old, branch),
            None => self.nodes[parent].child_branches.push(branch),
        }
    }

    /// Exchanges the rootward ends of two branches with different parents,
    /// each taking the child slot of the other.
    pub(crate) fn exchange_branch_tops(&mut self, first: BranchNumber, second: BranchNumber) {
        let first_parent = self.branches[first].parent;
        let second_parent = self.branches[second].parent;
        debug_assert_ne!(first_parent, second_parent);
        self.nodes[first_parent].replace_child_branch(first, second);
        self.nodes[second_parent].replace_child_branch(second, first);
        self.branches[first].parent = second_parent;
        self.branches[second].parent = first_parent;
    }

    /// Inserts a new node of `kind` at `height` on `branch` (parent p, child c).
    ///
    /// The lower segment keeps the number `branch`, so c's parent slots are
    /// unchanged; the upper segment p → new gets a fresh number that takes over
    /// the slot of `branch` among p's children.
    pub(crate) fn split_branch(&mut self, branch: BranchNumber, kind: NodeKind, height: f64) -> NodeIndex {
        let parent = self.branches[branch].parent;
        let node = self.new_node(kind, height);

        let upper = self.branches.len();
        self.branches.push(Branch { parent, child: node });
        self.nodes[parent].replace_child_branch(branch, upper);
        self.nodes[node].parent_branches.push(upper);

        self.branches[branch].parent = node;
        self.nodes[node].child_branches.push(branch);

        node
    }

    /// Removes a node with exactly one parent and one child branch, joining
    /// both into one branch. The joined branch keeps the number of the child
    /// branch and takes over the child slot of the parent branch.
    pub(crate) fn suppress_node(&mut self, node: NodeIndex) {
        debug_assert_eq!(self.nodes[node].parent_branches.len(), 1);
        debug_assert_eq!(self.nodes[node].child_branches.len(), 1);
        let upper = self.nodes[node].parent_branches[0];
        let lower = self.nodes[node].child_branches[0];
        let grandparent = self.branches[upper].parent;

        self.branches[lower].parent = grandparent;
        self.nodes[grandparent].replace_child_branch(upper, lower);
        self.nodes[node].child_branches.clear();
        self.nodes[node].parent_branches.clear();
        // `upper` is now only referenced by its own entry
        self.branches[upper] = Branch { parent: node, child: node };
        self.swap_remove_branch(upper);
        self.remove_node(node);
    }

    /// Detaches `branch` from both of its endpoints and removes it from the table.
    pub(crate) fn remove_branch(&mut self, branch: BranchNumber) {
        let Branch { parent, child } = self.branches[branch];
        self.nodes[parent].remove_child_branch(branch);
        self.nodes[child].remove_parent_branch(branch);
        self.swap_remove_branch(branch);
    }

    /// Removes an already detached branch, renumbering the last branch into its place.
    fn swap_remove_branch(&mut self, branch: BranchNumber) {
        let last = self.branches.len() - 1;
        self.branches.swap_remove(branch);
        if branch != last {
            let Branch { parent, child } = self.branches[branch];
            self.nodes[parent].replace_child_branch(last, branch);
            self.nodes[child].replace_parent_branch(last, branch);
        }
    }

    /// Removes a non-leaf node without any branches, renumbering the last node
    /// into its place.
    pub(crate) fn remove_node(&mut self, node: NodeIndex) {
        assert!(node >= self.num_leaves, "leaves cannot be removed");
        debug_assert!(self.nodes[node].parent_branches.is_empty());
        debug_assert!(self.nodes[node].child_branches.is_empty());

        let last = self.nodes.len() - 1;
        if self.origin == Some(node) {
            self.origin = None;
        }
        self.nodes.swap_remove(node);
        if node != last {
            self.nodes[node].set_index(node);
            for &b in &self.nodes[node].parent_branches {
                self.branches[b].child = node;
            }
            for &b in &self.nodes[node].child_branches {
                self.branches[b].parent = node;
            }
            if self.origin == Some(last) {
                self.origin = Some(node);
            }
        }
    }
}

// ============================================================================
// Sanity (pub)
// ============================================================================
impl Network {
    /// Checks all structural invariants and returns the first violation found.
    ///
    /// Checks:
    /// - Exactly one origin; leaves occupy the first indices
    /// - Node indices match their arena position
    /// - Degrees match node kinds
    /// - Every branch belongs to exactly one parent slot and one child slot,
    ///   consistent with the branch table
    /// - The branch count matches the node kinds
    /// - No child is higher than its parent; reticulations carry γ in `[0, 1]`
    /// - All nodes are reachable from the origin
    pub fn check_sanity(&self) -> Result<(), StructuralFault> {
        let num_origins = self.nodes.iter().filter(|n| n.is_origin()).count();
        match num_origins {
            0 => return Err(StructuralFault::MissingOrigin),
            1 => {}
            n => return Err(StructuralFault::MultipleOrigins(n)),
        }
        if self.origin.is_none_or(|o| !self.nodes.get(o).is_some_and(|n| n.is_origin())) {
            return Err(StructuralFault::MissingOrigin);
        }

        for (position, node) in self.nodes.iter().enumerate() {
            if node.index() != position {
                return Err(StructuralFault::IndexMismatch { position, stored: node.index() });
            }
            if node.is_leaf() != (position < self.num_leaves) {
                return Err(StructuralFault::LeavesNotFirst(position));
            }
            let kind = node.kind();
            if node.parent_branches.len() != kind.num_parents() {
                return Err(StructuralFault::ParentDegree {
                    node: position,
                    kind,
                    found: node.parent_branches.len(),
                    expected: kind.num_parents(),
                });
            }
            if node.child_branches.len() != kind.num_children() {
                return Err(StructuralFault::ChildDegree {
                    node: position,
                    kind,
                    found: node.child_branches.len(),
                    expected: kind.num_children(),
                });
            }
            if kind == NodeKind::Reticulation && node.gamma().is_none_or(|g| !(0.0..=1.0).contains(&g)) {
                return Err(StructuralFault::InvalidGamma(position));
            }
        }

        // Ownership: each branch is listed once as a parent slot and once as a child slot
        let mut owned_by_child: Vec<Option<NodeIndex>> = vec![None; self.branches.len()];
        let mut owned_by_parent: Vec<Option<NodeIndex>> = vec![None; self.branches.len()];
        for node in &self.nodes {
            for &branch in &node.parent_branches {
                claim(&mut owned_by_child, branch, node.index())?;
            }
            for &branch in &node.child_branches {
                claim(&mut owned_by_parent, branch, node.index())?;
            }
        }

        for (branch, entry) in self.branches.iter().enumerate() {
            match (owned_by_child[branch], owned_by_parent[branch]) {
                (Some(child), Some(parent)) => {
                    if entry.child != child {
                        return Err(StructuralFault::LinkMismatch { branch, node: child });
                    }
                    if entry.parent != parent {
                        return Err(StructuralFault::LinkMismatch { branch, node: parent });
                    }
                }
                _ => return Err(StructuralFault::OrphanBranch(branch)),
            }

            let parent_height = self.nodes[entry.parent].height();
            let child_height = self.nodes[entry.child].height();
            if child_height > parent_height {
                return Err(StructuralFault::HeightInversion { branch, parent_height, child_height });
            }
        }

        if self.branches.len() != self.branch_count() {
            return Err(StructuralFault::BranchCount { found: self.branches.len(), expected: self.branch_count() });
        }

        let mut reachable = vec![false; self.nodes.len()];
        for index in self.post_order() {
            reachable[index] = true;
        }
        if let Some(unreachable) = reachable.iter().position(|&r| !r) {
            return Err(StructuralFault::Unreachable(unreachable));
        }

        Ok(())
    }

    /// Checks all structural invariants and aborts on a violation.
    ///
    /// # Panics
    /// Panics with the [StructuralFault] if [check_sanity](Self::check_sanity) fails.
    pub fn assert_sane(&self) {
        if let Err(fault) = self.check_sanity() {
            panic!("structural fault in network: {fault}");
        }
    }
}

/// Records `node` as owner of `branch`, failing if the branch is unknown or
/// owned by another node already.
fn claim(owners: &mut [Option<NodeIndex>], branch: BranchNumber, node: NodeIndex) -> Result<(), StructuralFault> {
    let Some(owner) = owners.get_mut(branch) else {
        return Err(StructuralFault::DanglingBranch { node, branch });
    };
    match *owner {
        Some(first) => Err(StructuralFault::SharedBranch { branch, first, second: node }),
        None => {
            *owner = Some(node);
            Ok(())
        }
    }
}
