//! Node module for phylogenetic network representation.
//!
//! - [NetworkNode]: a node of a [Network](crate::model::network::Network),
//!   referencing incident branches by [BranchNumber].
//! - [NodeKind]: leaf, speciation, reticulation or origin.

/// Index of a node in a network (arena).
pub type NodeIndex = usize;

/// Number of a branch in a network, i.e. its index in the branch table.
pub type BranchNumber = usize;

/// Kind of a network node, determining its in- and out-degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// No children, one parent.
    Leaf,
    /// Two children, one parent.
    Speciation,
    /// One child, two parents (hybridization event).
    Reticulation,
    /// Start of the process: one child (the root), no parents.
    Origin,
}

impl NodeKind {
    /// Number of parent branches a node of this kind must have.
    pub fn num_parents(&self) -> usize {
        match self {
            NodeKind::Leaf | NodeKind::Speciation => 1,
            NodeKind::Reticulation => 2,
            NodeKind::Origin => 0,
        }
    }

    /// Number of child branches a node of this kind must have.
    pub fn num_children(&self) -> usize {
        match self {
            NodeKind::Leaf => 0,
            NodeKind::Speciation => 2,
            NodeKind::Reticulation | NodeKind::Origin => 1,
        }
    }
}

// =#========================================================================#=
// NETWORK NODE
// =#========================================================================#=
/// A node of a phylogenetic network.
///
/// Parent and child relations are held as lists of [BranchNumber]s into the
/// branch table of the owning network, never as references to other nodes.
///
/// # Slots
/// - `parent_branches[0]` is the *gamma* branch of a reticulation, i.e. the
///   left parent edge that is traversed (forward in time) with probability γ.
/// - `child_branches[0]` is the branch taken for direction `0` in an embedding,
///   `child_branches[1]` the one for direction `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    index: NodeIndex,
    kind: NodeKind,
    height: f64,
    label: Option<String>,
    pub(crate) parent_branches: Vec<BranchNumber>,
    pub(crate) child_branches: Vec<BranchNumber>,
    gamma: Option<f64>,
}

impl NetworkNode {
    /// Creates an unconnected node of the given kind.
    ///
    /// Reticulations start with γ = 0.5.
    pub fn new(index: NodeIndex, kind: NodeKind, height: f64) -> Self {
        let gamma = if kind == NodeKind::Reticulation { Some(0.5) } else { None };
        Self {
            index,
            kind,
            height,
            label: None,
            parent_branches: Vec::with_capacity(kind.num_parents()),
            child_branches: Vec::with_capacity(kind.num_children()),
            gamma,
        }
    }

    /// Creates a labelled leaf at height `0.0`.
    pub fn new_leaf(index: NodeIndex, label: String) -> Self {
        let mut node = Self::new(index, NodeKind::Leaf, 0.0);
        node.label = Some(label);
        node
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: NodeIndex) {
        self.index = index;
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, height: f64) {
        debug_assert!(height.is_finite() && height >= 0.0, "invalid node height {height}");
        self.height = height;
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn is_speciation(&self) -> bool {
        self.kind == NodeKind::Speciation
    }

    pub fn is_reticulation(&self) -> bool {
        self.kind == NodeKind::Reticulation
    }

    pub fn is_origin(&self) -> bool {
        self.kind == NodeKind::Origin
    }

    /// Branches towards the parents, gamma branch first.
    pub fn parent_branches(&self) -> &[BranchNumber] {
        &self.parent_branches
    }

    /// Branches towards the children, direction `0` first.
    pub fn child_branches(&self) -> &[BranchNumber] {
        &self.child_branches
    }

    /// Returns the child branch taken for the given embedding direction.
    pub fn child_branch(&self, direction: usize) -> Option<BranchNumber> {
        self.child_branches.get(direction).copied()
    }

    /// Returns the embedding direction leading into the given child branch.
    pub fn direction_of(&self, branch: BranchNumber) -> Option<usize> {
        self.child_branches.iter().position(|&b| b == branch)
    }

    /// Inheritance probability of the gamma branch; `None` unless reticulation.
    pub fn gamma(&self) -> Option<f64> {
        self.gamma
    }

    /// Sets γ of a reticulation.
    ///
    /// # Panics
    /// Panics if this is not a reticulation or `gamma` is outside `[0, 1]`.
    pub fn set_gamma(&mut self, gamma: f64) {
        assert!(self.is_reticulation(), "only reticulations carry an inheritance probability");
        assert!((0.0..=1.0).contains(&gamma), "gamma {gamma} outside [0, 1]");
        self.gamma = Some(gamma);
    }

    /// Replaces `old` by `new` in the child slots, keeping the slot position.
    pub(crate) fn replace_child_branch(&mut self, old: BranchNumber, new: BranchNumber) {
        if let Some(slot) = self.child_branches.iter_mut().find(|b| **b == old) {
            *slot = new;
        }
    }

    /// Replaces `old` by `new` in the parent slots, keeping the slot position.
    pub(crate) fn replace_parent_branch(&mut self, old: BranchNumber, new: BranchNumber) {
        if let Some(slot) = self.parent_branches.iter_mut().find(|b| **b == old) {
            *slot = new;
        }
    }

    pub(crate) fn remove_child_branch(&mut self, branch: BranchNumber) {
        self.child_branches.retain(|&b| b != branch);
    }

    pub(crate) fn remove_parent_branch(&mut self, branch: BranchNumber) {
        self.parent_branches.retain(|&b| b != branch);
    }
}
