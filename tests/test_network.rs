mod common;

use common::*;
use speciesnetwork::error::StructuralFault;
use speciesnetwork::model::network::Network;
use speciesnetwork::model::network_node::NodeKind;
use speciesnetwork::newick::parse_network;

/// ((A,B),C) built by hand, origin 0.5 above the root at 2.0.
fn three_leaf_tree() -> Network {
    let mut network = Network::new();
    let a = network.add_leaf("A");
    let b = network.add_leaf("B");
    let c = network.add_leaf("C");
    let ab = network.new_node(NodeKind::Speciation, 1.0);
    let root = network.new_node(NodeKind::Speciation, 2.0);
    let origin = network.new_node(NodeKind::Origin, 2.5);
    network.add_branch(ab, a);
    network.add_branch(ab, b);
    network.add_branch(root, ab);
    network.add_branch(root, c);
    network.add_branch(origin, root);
    network
}

// --- TESTS CONSTRUCTION ---
#[test]
fn test_built_tree() {
    let network = three_leaf_tree();
    assert_eq!(network.check_sanity(), Ok(()));

    // Test counts
    assert_eq!(network.num_nodes(), 6);
    assert_eq!(network.num_leaves(), 3);
    assert_eq!(network.num_traversal_nodes(), 3);
    assert_eq!(network.branch_count(), 5);
    assert_eq!(network.num_reticulations(), 0);
    assert!(network.gammas().is_empty());

    // Test root and origin
    assert_eq!(network.origin(), 5);
    assert_eq!(network.root(), 4);
    assert_eq!(network.root_branch(), 4);
    assert_eq!(network.root_height(), 2.0);
    assert_eq!(network.branch_length(network.root_branch()), 0.5);
    // 1 + 1 + 1 + 2, without the root branch
    assert!((network.network_length() - 5.0).abs() < 1e-12);

    // Test rows
    assert_eq!(network.traversal_index(0), None);
    assert_eq!(network.traversal_index(3), Some(0));
    assert_eq!(network.traversal_index(5), Some(2));
}

#[test]
fn test_parsed_reticulation() {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    assert_eq!(network.check_sanity(), Ok(()));

    assert_eq!(network.num_nodes(), 8);
    assert_eq!(network.branch_count(), 8);
    assert_eq!(network.reticulation_nodes(), vec![H1]);
    assert_eq!(network.reticulation_number(H1), Some(0));
    assert_eq!(network.reticulation_number(L), None);
    assert_eq!(network.gammas(), vec![0.4]);

    // Test heights
    let heights: Vec<f64> = (H1..=ORIGIN).map(|n| network.node(n).height()).collect();
    for (height, expected) in heights.iter().zip([0.5, 1.0, 1.5, 2.0, 2.5]) {
        assert!((height - expected).abs() < 1e-9);
    }

    // Test slots: gamma branch from L, direction 0 of the root towards L
    let node = network.node(H1);
    assert_eq!(node.parent_branches(), &[2, 4]);
    assert_eq!(network.parent(H1, 0), Some(L));
    assert_eq!(network.parent(H1, 1), Some(R));
    assert_eq!(network.child(ROOT, 0), Some(L));
    assert_eq!(network.child(ROOT, 1), Some(R));
    assert_eq!(network.node(L).direction_of(2), Some(1));
    assert_eq!(network.leaf_by_label("B"), Some(1));
    assert_eq!(network.node(network.leaf_by_label("B").unwrap()).label(), Some("B"));
}

#[test]
fn test_node_lists() {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    assert_eq!(network.internal_nodes(), vec![H1, L, R, ROOT]);
    assert_eq!(network.internal_nodes_including_origin(), vec![H1, L, R, ROOT, ORIGIN]);
    assert_eq!(network.leaf_nodes().len(), 3);
    assert_eq!(network.parents(H1).collect::<Vec<_>>(), vec![L, R]);
    assert_eq!(network.children(R).collect::<Vec<_>>(), vec![H1, 2]);
}

// --- TESTS TRAVERSAL ---
#[test]
fn test_post_order() {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    let order = network.post_order();
    assert_eq!(order.len(), network.num_nodes());
    assert_eq!(order.last(), Some(&ORIGIN));

    // Every node comes after all of its children, the shared child only once
    let position = |node: usize| order.iter().position(|&n| n == node).unwrap();
    for node in 0..network.num_nodes() {
        for child in network.children(node) {
            assert!(position(child) < position(node), "{child} after its parent {node}");
        }
    }
}

#[test]
fn test_is_ancestor() {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    assert!(network.is_ancestor(L, 1));
    assert!(network.is_ancestor(R, 1));
    assert!(network.is_ancestor(ORIGIN, 0));
    assert!(network.is_ancestor(H1, H1));
    assert!(!network.is_ancestor(R, 0));
    assert!(!network.is_ancestor(H1, L));
}

// --- TESTS SANITY ---
#[test]
fn test_height_inversion() {
    let mut network = three_leaf_tree();
    network.node_mut(3).set_height(3.0);
    assert!(matches!(network.check_sanity(), Err(StructuralFault::HeightInversion { branch: 2, .. })));
}

#[test]
fn test_parent_degree() {
    let mut network = three_leaf_tree();
    let extra = network.new_node(NodeKind::Reticulation, 0.5);
    network.add_branch(extra, 0);
    // The new node has no parents and node A has two
    assert!(matches!(
        network.check_sanity(),
        Err(StructuralFault::ParentDegree { node: 0, kind: NodeKind::Leaf, found: 2, expected: 1 })
    ));
}

#[test]
fn test_missing_origin() {
    let mut network = Network::new();
    let a = network.add_leaf("A");
    let b = network.add_leaf("B");
    let root = network.new_node(NodeKind::Speciation, 1.0);
    network.add_branch(root, a);
    network.add_branch(root, b);
    assert_eq!(network.check_sanity(), Err(StructuralFault::MissingOrigin));
}

#[test]
#[should_panic(expected = "outside [0, 1]")]
fn test_invalid_gamma() {
    let mut network = parse_network(SINGLE_RETICULATION).unwrap();
    network.node_mut(H1).set_gamma(1.5);
}

#[test]
#[should_panic(expected = "structural fault in network")]
fn test_assert_sane_panics() {
    let mut network = three_leaf_tree();
    network.node_mut(4).set_height(0.5);
    network.assert_sane();
}

#[test]
#[should_panic]
fn test_gamma_on_speciation() {
    let mut network = three_leaf_tree();
    network.node_mut(3).set_gamma(0.5);
}

#[test]
#[should_panic]
fn test_leaf_after_internal() {
    let mut network = three_leaf_tree();
    network.add_leaf("D");
}

// --- TESTS LIFECYCLE ---
#[test]
fn test_store_restore() {
    let mut network = parse_network(SINGLE_RETICULATION).unwrap();
    assert!(!network.is_dirty());

    network.start_editing("test");
    assert!(network.is_dirty());
    network.node_mut(H1).set_height(0.25);
    network.node_mut(H1).set_gamma(0.9);

    network.restore();
    assert!(!network.is_dirty());
    assert_eq!(network.node(H1).height(), 0.5);
    assert_eq!(network.gammas(), vec![0.4]);
}

#[test]
fn test_accept_keeps_edits() {
    let mut network = parse_network(SINGLE_RETICULATION).unwrap();
    network.start_editing("test");
    network.node_mut(R).set_height(1.75);
    network.accept();
    assert!(!network.is_dirty());
    assert_eq!(network.node(R).height(), 1.75);

    // Nothing to roll back to
    network.restore();
    assert_eq!(network.node(R).height(), 1.75);
}

#[test]
fn test_nested_start_editing() {
    let mut network = parse_network(SINGLE_RETICULATION).unwrap();
    network.start_editing("first");
    network.node_mut(L).set_height(1.2);
    network.start_editing("second");
    network.node_mut(L).set_height(1.4);

    // Rolls back to the state before the first editor
    network.restore();
    assert_eq!(network.node(L).height(), 1.0);
}
