mod common;

use common::*;
use speciesnetwork::model::NetworkBuilder;
use speciesnetwork::newick::{NewickParser, parse_gene_tree, parse_gene_tree_file, parse_network};
use speciesnetwork::parser::ParsingErrorType;
use speciesnetwork::parser::byte_parser::ByteParser;
use std::io::Write;

// --- TESTS NETWORK PARSING ---
#[test]
fn test_basic_tree_as_network() {
    let network = parse_network("((A:1.0,B:1.0):0.5,C:1.5):0.1;").unwrap();

    // Test counts
    assert_eq!(network.num_leaves(), 3);
    assert_eq!(network.num_nodes(), 6);
    assert_eq!(network.num_reticulations(), 0);

    // Test heights: root at 1.5, origin 0.1 above
    assert!((network.root_height() - 1.5).abs() < 1e-9);
    assert!((network.node(network.origin()).height() - 1.6).abs() < 1e-9);
    assert!((network.branch_length(network.root_branch()) - 0.1).abs() < 1e-9);

    // Test relationships
    let root = network.root();
    let (left, right) = (network.child(root, 0).unwrap(), network.child(root, 1).unwrap());
    assert!(network.node(left).is_speciation());
    assert_eq!(network.node(right).label(), Some("C"));
    assert_eq!(network.children(left).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_missing_root_branch() {
    let network = parse_network("(A:1.0,B:1.0);").unwrap();
    assert_eq!(network.node(network.origin()).height(), network.root_height());
    assert_eq!(network.branch_length(network.root_branch()), 0.0);
}

#[test]
fn test_gamma_on_defining_occurrence() {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    let hybrid = network.node(H1);
    assert!(hybrid.is_reticulation());
    assert_eq!(hybrid.gamma(), Some(0.4));
    assert_eq!(network.parent(H1, 0), Some(L));
    assert_eq!(network.node(network.child(H1, 0).unwrap()).label(), Some("B"));
}

#[test]
fn test_gamma_on_referencing_occurrence() {
    let network = parse_network("((A:1.0,(B:0.5)#H1:0.5):1.0,(#H1[&gamma=0.7]:1.0,C:1.5):0.5);").unwrap();
    assert_eq!(network.node(H1).gamma(), Some(0.7));
    assert_eq!(network.parent(H1, 0), Some(R));
    assert_eq!(network.parent(H1, 1), Some(L));
    assert_eq!(network.check_sanity(), Ok(()));
}

#[test]
fn test_gamma_default() {
    let network = parse_network("((A:1.0,(B:0.5)#H1:0.5):1.0,(#H1:1.0,C:1.5):0.5);").unwrap();
    assert_eq!(network.gammas(), vec![0.5]);
    assert_eq!(network.parent(H1, 0), Some(L));
}

#[test]
fn test_annotation_before_branch_length() {
    let network = parse_network("((A:1.0,(B:0.5)#H1[&gamma=0.25]:0.5):1.0,(#H1:1.0,C:1.5):0.5);").unwrap();
    assert_eq!(network.gammas(), vec![0.25]);
}

#[test]
fn test_labelled_hybrid() {
    let network = parse_network("((A:1.0,(B:0.5)X#H1:0.5):1.0,(#H1:1.0,C:1.5):0.5);").unwrap();
    assert_eq!(network.reticulation_nodes(), vec![H1]);
}

#[test]
fn test_whitespace_and_comments() {
    let network = parse_network(" ( (A:1.0, B:1.0) [ab] :0.5 ,\n C:1.5 ) ;").unwrap();
    assert_eq!(network.num_leaves(), 3);
    assert!((network.root_height() - 1.5).abs() < 1e-9);
}

#[test]
fn test_two_reticulations() {
    let newick = "(((A:0.5,(B:0.2)#H1:0.3):0.5,(#H1:0.4,(C:0.3)#H2:0.3):0.4):0.5,(#H2:0.2,D:0.5):1.0);";
    let network = parse_network(newick).unwrap();
    assert_eq!(network.num_reticulations(), 2);
    assert_eq!(network.branch_count(), network.branches().len());
    assert_eq!(network.check_sanity(), Ok(()));
    for reticulation in network.reticulation_nodes() {
        assert_eq!(network.parents(reticulation).count(), 2);
    }
}

#[test]
fn test_parse_all_networks() {
    let input = "(A:1.0,B:1.0);\n((A:1.0,B:1.0):0.5,C:1.5);\n";
    let mut parser = NewickParser::new(NetworkBuilder::new()).with_annotations();
    let networks = parser.parse_all(ByteParser::from_str(input)).unwrap();
    assert_eq!(networks.len(), 2);
    assert_eq!(networks[0].num_leaves(), 2);
    assert_eq!(networks[1].num_leaves(), 3);
}

// --- TESTS NETWORK ERRORS ---
#[test]
fn test_unresolved_hybrid() {
    let error = parse_network("((A:1.0,#H1:0.5):1.0,C:2.0);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::UnresolvedHybrid(label) if label == "#H1"));
}

#[test]
fn test_duplicate_hybrid_definition() {
    let error = parse_network("(((A:0.5)#H1:0.5,(B:0.5)#H1:0.5):1.0,#H1:2.0);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::UnresolvedHybrid(_)));
}

#[test]
fn test_inconsistent_reticulation_height() {
    let error = parse_network("((A:1.0,(B:0.5)#H1:0.5):1.0,(#H1:0.8,C:1.5):0.5);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNetworkStructure(_)));
}

#[test]
fn test_leaves_not_contemporaneous() {
    let error = parse_network("((A:1.0,B:0.5):1.0,C:2.0);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNetworkStructure(_)));
}

#[test]
fn test_polytomy_in_network() {
    let error = parse_network("(A:1.0,B:1.0,C:1.0);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNetworkStructure(_)));
}

#[test]
fn test_missing_branch_length() {
    let error = parse_network("((A:1.0,B):0.5,C:1.5);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNetworkStructure(_)));
}

#[test]
fn test_missing_semicolon() {
    let error = parse_network("(A:1.0,B:1.0)").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNewickString(_)));
}

#[test]
fn test_gamma_out_of_range() {
    let error = parse_network("((A:1.0,(B:0.5)#H1[&gamma=1.5]:0.5):1.0,(#H1:1.0,C:1.5):0.5);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidNetworkStructure(_)));
}

// --- TESTS GENE TREE PARSING ---
#[test]
fn test_basic_gene_tree() {
    let tree = parse_gene_tree(GENES_FREE).unwrap();

    // Test counts and layout: leaves first, root last
    assert_eq!(tree.num_leaves(), 4);
    assert_eq!(tree.num_nodes(), 7);
    assert_eq!(tree.root_index(), 6);
    assert_eq!(tree[B1].label(), Some("b1"));

    // Test heights
    assert!((tree.height() - 2.7).abs() < 1e-9);
    assert!((tree[4].height() - 0.3).abs() < 1e-9);
    assert!((tree[5].height() - 2.2).abs() < 1e-9);
    assert!(tree.leaves().all(|leaf| tree[leaf].height() == 0.0));

    // Test relationships
    assert_eq!(tree[4].children(), Some((0, 1)));
    assert_eq!(tree[5].children(), Some((2, 3)));
    assert_eq!(tree[B1].parent(), Some(5));
    assert!(tree.is_ancestor(6, B1));
    assert!(!tree.is_ancestor(4, B1));
    assert!(tree.is_valid());
}

#[test]
fn test_gene_tree_ignores_annotations() {
    let tree = parse_gene_tree("((a1[&rate=1.2]:1.0,b1:1.0)[&rate=0.8]:0.5,c1:1.5);").unwrap();
    assert_eq!(tree.num_leaves(), 3);
    assert!((tree.height() - 1.5).abs() < 1e-9);
}

#[test]
fn test_gene_tree_not_binary() {
    let error = parse_gene_tree("(a:1.0,b:1.0,c:1.0);").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidTreeStructure(_)));
}

#[test]
fn test_gene_tree_single_leaf() {
    let error = parse_gene_tree("a:1.0;").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::InvalidTreeStructure(_)));
}

#[test]
fn test_gene_tree_file() {
    let path = std::env::temp_dir().join(format!("speciesnetwork_gene_trees_{}.nwk", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{GENES_FORCED}").unwrap();
    writeln!(file, "[locus two] {GENES_FREE}").unwrap();
    drop(file);

    let trees = parse_gene_tree_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].num_leaves(), 3);
    assert_eq!(trees[1].num_leaves(), 4);
    let stem = path.file_stem().unwrap().to_string_lossy();
    assert_eq!(trees[0].name(), Some(format!("{stem}_1").as_str()));
    assert_eq!(trees[1].name(), Some(format!("{stem}_2").as_str()));
}

#[test]
fn test_gene_tree_file_missing() {
    let error = parse_gene_tree_file("/nonexistent/gene_trees.nwk").unwrap_err();
    assert!(matches!(error.kind(), ParsingErrorType::IoError(_)));
}
