//! Builder for [Network]s from extended Newick strings.
//!
//! A reticulation is written twice, under the same hybrid label `#H...`:
//! once with its single child (the defining occurrence) and once as a
//! childless reference below its second parent.
//!
//! ```text
//! ((A:2,(B:1)#H1:1):1,(#H1:1.5,C:2.5):0.5):0.25;
//! ```
//!
//! The branch length of the root becomes the distance from the root up to the
//! origin (`0.0` if absent).

use crate::model::annotation::AnnotationValue;
use crate::model::network::{EPSILON, Network};
use crate::model::network_node::{BranchNumber, NodeIndex, NodeKind};
use crate::model::tree_builder::{PendingVertex, PendingVertices, TreeBuilder, VertexIdx};
use crate::parser::{ParsingError, ParsingErrorType};
use std::collections::{BTreeMap, VecDeque};

/// Annotation key of the inheritance probability of a hybrid edge.
pub const GAMMA_KEY: &str = "gamma";

/// Tolerance when comparing the two heights implied for a reticulation.
const HEIGHT_TOLERANCE: f64 = 1e-6;

/// Both occurrences of a hybrid label.
#[derive(Debug, Default)]
struct HybridOccurrences {
    defining: Option<VertexIdx>,
    referencing: Option<VertexIdx>,
}

// =#========================================================================#=
// NETWORK BUILDER
// =#========================================================================#=
/// Builds a [Network] from parsed vertices.
///
/// Node layout follows [Network]: leaves first in input order, then
/// speciation and reticulation nodes in input order, and the origin last.
///
/// The parent slot `0` (gamma branch) of a reticulation is the occurrence
/// carrying a `[&gamma=...]` annotation, whose value becomes γ. Without
/// annotation, the defining occurrence is the gamma branch and γ is `0.5`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    pending: PendingVertices,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn invalid(msg: String) -> ParsingError {
    ParsingError::without_context(ParsingErrorType::InvalidNetworkStructure(msg))
}

fn unresolved(label: &str) -> ParsingError {
    ParsingError::without_context(ParsingErrorType::UnresolvedHybrid(label.to_string()))
}

/// Splits `X#H1` into the hybrid key `#H1`, `None` for ordinary labels.
fn hybrid_key(vertex: &PendingVertex) -> Option<&str> {
    let label = vertex.label.as_deref()?;
    label.find('#').map(|at| &label[at..])
}

impl TreeBuilder for NetworkBuilder {
    type Tree = Network;

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

    fn finish_tree(&mut self, root: VertexIdx) -> Result<Network, ParsingError> {
        let pending = std::mem::take(&mut self.pending);
        let parents = pending.parents();

        // Group hybrid occurrences by key
        let mut hybrids: BTreeMap<&str, HybridOccurrences> = BTreeMap::new();
        for (index, vertex) in pending.vertices.iter().enumerate() {
            let Some(key) = hybrid_key(vertex) else { continue };
            let entry = hybrids.entry(key).or_default();
            let slot = match vertex.children.len() {
                0 => &mut entry.referencing,
                1 => &mut entry.defining,
                n => return Err(invalid(format!("hybrid {key} has {n} children"))),
            };
            if slot.replace(index).is_some() {
                return Err(unresolved(key));
            }
        }
        for (key, occurrences) in &hybrids {
            if occurrences.defining.is_none() || occurrences.referencing.is_none() {
                return Err(unresolved(key));
            }
        }
        if hybrid_key(&pending[root]).is_some() {
            return Err(invalid("the root cannot be a hybrid".to_string()));
        }

        // Allocate network nodes: leaves, then internal nodes, then the origin
        let mut network = Network::new();
        let mut node_of: Vec<Option<NodeIndex>> = vec![None; pending.vertices.len()];
        for (index, vertex) in pending.vertices.iter().enumerate() {
            if vertex.is_leaf() && hybrid_key(vertex).is_none() {
                let label = vertex.label.as_deref().unwrap_or_default();
                if label.is_empty() {
                    return Err(invalid(format!("leaf vertex {index} has no label")));
                }
                node_of[index] = Some(network.add_leaf(label));
            }
        }
        for (index, vertex) in pending.vertices.iter().enumerate() {
            match (hybrid_key(vertex), vertex.children.len()) {
                (_, 0) => {}
                (Some(_), 1) => node_of[index] = Some(network.new_node(NodeKind::Reticulation, 0.0)),
                (None, 2) => node_of[index] = Some(network.new_node(NodeKind::Speciation, 0.0)),
                (None, n) => return Err(invalid(format!("vertex {index} has {n} children"))),
                (Some(key), n) => return Err(invalid(format!("hybrid {key} has {n} children"))),
            }
        }
        // References resolve to the reticulation of their defining occurrence
        for occurrences in hybrids.values() {
            if let (Some(defining), Some(referencing)) = (occurrences.defining, occurrences.referencing) {
                node_of[referencing] = node_of[defining];
            }
        }
        let origin = network.new_node(NodeKind::Origin, 0.0);

        // Branches with their lengths, in input order of the child occurrence
        let mut lengths: Vec<f64> = Vec::new();
        let mut branch_of: Vec<Option<BranchNumber>> = vec![None; pending.vertices.len()];
        for (index, vertex) in pending.vertices.iter().enumerate() {
            let Some(parent) = parents[index] else { continue };
            let length = vertex
                .branch_length
                .ok_or_else(|| invalid(format!("missing branch length above vertex {index}")))?;
            if length < 0.0 {
                return Err(invalid(format!("negative branch length {length} above vertex {index}")));
            }
            let (Some(parent_node), Some(child_node)) = (node_of[parent], node_of[index]) else {
                return Err(invalid(format!("vertex {index} is not connected")));
            };
            branch_of[index] = Some(network.add_branch(parent_node, child_node));
            lengths.push(length);
        }
        let root_node = node_of[root].ok_or_else(|| invalid("unresolved root".to_string()))?;
        network.add_branch(origin, root_node);
        lengths.push(pending[root].branch_length.unwrap_or(0.0));

        // Gamma slots of the reticulations
        for occurrences in hybrids.values() {
            let (Some(defining), Some(referencing)) = (occurrences.defining, occurrences.referencing) else {
                continue;
            };
            let retic = node_of[defining].ok_or_else(|| invalid("unresolved hybrid".to_string()))?;
            let (gamma_occurrence, gamma) = match (
                pending[defining].annotation_f64(GAMMA_KEY),
                pending[referencing].annotation_f64(GAMMA_KEY),
            ) {
                (Some(g), _) => (defining, g),
                (None, Some(g)) => (referencing, g),
                (None, None) => (defining, 0.5),
            };
            if !(0.0..=1.0).contains(&gamma) {
                return Err(invalid(format!("gamma {gamma} outside [0, 1]")));
            }
            let gamma_branch = branch_of[gamma_occurrence].ok_or_else(|| invalid("hybrid without parent".to_string()))?;
            let slots = &mut network.node_mut(retic).parent_branches;
            if slots[0] != gamma_branch {
                slots.swap(0, 1);
            }
            network.node_mut(retic).set_gamma(gamma);
        }

        assign_heights(&mut network, &lengths)?;
        network.check_sanity().map_err(|fault| invalid(fault.to_string()))?;
        Ok(network)
    }
}

/// Sets node heights from branch lengths, measuring depth from the origin in
/// topological order (Kahn's algorithm) and placing the deepest leaf at `0.0`.
fn assign_heights(network: &mut Network, lengths: &[f64]) -> Result<(), ParsingError> {
    let mut depth: Vec<Option<f64>> = vec![None; network.num_nodes()];
    let mut in_degree: Vec<usize> = network.all_nodes().iter().map(|n| n.parent_branches().len()).collect();
    let origin = network.origin();
    depth[origin] = Some(0.0);

    let mut queue = VecDeque::from([origin]);
    let mut visited = 0;
    while let Some(node) = queue.pop_front() {
        visited += 1;
        let node_depth = depth[node].unwrap_or(0.0);
        for &branch in network.node(node).child_branches() {
            let child = network.node_for_branch(branch);
            let candidate = node_depth + lengths[branch];
            match depth[child] {
                Some(d) if (d - candidate).abs() > HEIGHT_TOLERANCE => {
                    return Err(invalid(format!(
                        "parents of node {child} imply different heights ({d} vs. {candidate})"
                    )));
                }
                Some(_) => {}
                None => depth[child] = Some(candidate),
            }
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    if visited != network.num_nodes() {
        return Err(invalid("network contains a cycle or unreachable nodes".to_string()));
    }

    let depth: Vec<f64> = depth.into_iter().map(|d| d.unwrap_or(0.0)).collect();
    let max_depth = depth[..network.num_leaves()].iter().copied().fold(0.0, f64::max);
    for (node, &d) in depth.iter().enumerate() {
        let height = max_depth - d;
        let height = if height.abs() < EPSILON { 0.0 } else { height };
        if network.node(node).is_leaf() {
            if height > HEIGHT_TOLERANCE {
                return Err(invalid(format!("leaf {node} is not contemporaneous ({height})")));
            }
            continue;
        }
        network.node_mut(node).set_height(height);
    }
    Ok(())
}
