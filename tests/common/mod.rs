#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use speciesnetwork::embedding::EmbeddingMatrix;
use speciesnetwork::model::{GeneIndex, GeneTree, Network, TaxonMap};
use speciesnetwork::newick::{parse_gene_tree, parse_network};
use speciesnetwork::state::State;

// --- SINGLE RETICULATION ---
// Heights: H1 0.5, L 1.0, R 1.5, root 2.0, origin 2.5
// Nodes: A 0, B 1, C 2, H1 3, L 4, R 5, root 6, origin 7
// Branches: L->A 0, H1->B 1, L->H1 2 (gamma), root->L 3, R->H1 4,
//           R->C 5, root->R 6, origin->root 7
pub const SINGLE_RETICULATION: &str = "((A:1.0,(B:0.5)#H1[&gamma=0.4]:0.5):1.0,(#H1:1.0,C:1.5):0.5):0.5;";
pub const H1: usize = 3;
pub const L: usize = 4;
pub const R: usize = 5;
pub const ROOT: usize = 6;
pub const ORIGIN: usize = 7;

/// All lineages forced.
pub const GENES_FORCED: &str = "((a1:1.2,b1:1.2):1.5,c1:2.7);";
/// b1 (gene node 2) passes the network root alone: one free choice.
/// Nodes: a1 0, a2 1, b1 2, c1 3, (a1,a2) 4, (b1,c1) 5, root 6
pub const GENES_FREE: &str = "((a1:0.3,a2:0.3):2.4,(b1:2.2,c1:2.2):0.5);";
pub const B1: GeneIndex = 2;

pub fn single_reticulation_taxa() -> TaxonMap {
    TaxonMap::from_pairs([("a1", "A"), ("a2", "A"), ("b1", "B"), ("c1", "C")])
}

pub fn single_reticulation_state(genes: &[&str]) -> State {
    let network = parse_network(SINGLE_RETICULATION).unwrap();
    let gene_trees = genes.iter().map(|g| parse_gene_tree(g).unwrap()).collect();
    State::new(network, gene_trees, single_reticulation_taxa()).unwrap()
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// --- SEVEN SPECIES ---
// Species tree without root branch; diploid samples s{i}_tip{j} of species s{i}
pub const SEVEN_SPECIES: &str = "((((s1:0.33109175037666511,s3:0.33109175037666511):0.19728320951827943,(s4:0.35745288551058663,s5:0.35745288551058663):0.17092207438435791):0.13952939110386009,(s0:0.23635691859481153,s2:0.23635691859481153):0.43154743240399307):0.24425886940385155,s6:0.91216322040265618)";

pub const SEVEN_SPECIES_GENES_A: &str = "((((((s0_tip0:0.347407793400568,s0_tip1:0.347407793400568):0.3249109011518702,s1_tip1:0.6723186945524382):0.016870213500392195,s1_tip2:0.6891889080528304):0.019839817741234667,(((s2_tip0:0.15046603845862686,s2_tip2:0.15046603845862686):0.09011985750867982,s0_tip2:0.24058589596730667):0.26040023056469325,s2_tip1:0.5009861265319999):0.20804259926206514):0.10308010748979513,((((s4_tip1:0.24286247683385803,s4_tip2:0.24286247683385803):0.0774217631281886,s4_tip0:0.32028423996204664):0.3802893107428073,s3_tip0:0.7005735507048539):0.026014759502167695,((s5_tip0:0.31157453809588487,s5_tip2:0.31157453809588487):0.36446702876275516,s5_tip1:0.67604156685864):0.050546743348381606):0.08552052307683855):1.998402609908173,(((s1_tip0:0.33277869115410225,s3_tip2:0.33277869115410225):0.3046584920967114,s3_tip1:0.6374371832508137):0.7842206490201684,((s6_tip1:0.031029864092966437,s6_tip2:0.031029864092966437):0.190295736989861,s6_tip0:0.22132560108282742):1.2003322311881546):1.3888536109210512);";

pub const SEVEN_SPECIES_GENES_B: &str = "((((((((s4_tip0:0.11574942025779661,s4_tip2:0.11574942025779661):0.13340648460476376,s4_tip1:0.24915590486256037):0.4203387072191621,s0_tip0:0.6694946120817225):0.0016639946047994902,s2_tip1:0.6711586066865219):0.004588498334115565,s3_tip2:0.6757471050206375):0.08816455259319111,(((s5_tip0:0.15177697100996357,s5_tip2:0.15177697100996357):0.04136320593387219,s5_tip1:0.19314017694383576):0.4459847564129401,s1_tip0:0.6391249333567759):0.12478672425705273):0.8382962467124154,((s6_tip0:0.07184180885800906,s6_tip1:0.07184180885800906):0.02011869319832174,s6_tip2:0.0919605020563308):1.5102474022699133):1.0266078730012804,((((s0_tip1:0.24303930678736413,s0_tip2:0.24303930678736413):0.24352270440468898,(s2_tip0:0.42115724212102956,s2_tip2:0.42115724212102956):0.06540476907102355):0.25003033795794816,((s1_tip2:0.6543745786115609,s3_tip0:0.6543745786115609):0.01621620123129608,s3_tip1:0.670590779842857):0.06600156930714429):0.001545938344288289,s1_tip1:0.7381382874942896):1.890677489833235);";

pub fn seven_species_taxa() -> TaxonMap {
    let mut taxa = TaxonMap::new();
    for species in 0..7 {
        for tip in 0..3 {
            taxa.insert(&format!("s{species}_tip{tip}"), &format!("s{species}"));
        }
    }
    taxa
}

/// The seven species network with the origin `root_branch` above the root.
pub fn seven_species_state(root_branch: f64) -> State {
    let network = if root_branch > 0.0 {
        parse_network(format!("{SEVEN_SPECIES}:{root_branch};")).unwrap()
    } else {
        parse_network(format!("{SEVEN_SPECIES};")).unwrap()
    };
    let gene_trees = vec![
        parse_gene_tree(SEVEN_SPECIES_GENES_A).unwrap(),
        parse_gene_tree(SEVEN_SPECIES_GENES_B).unwrap(),
    ];
    State::new(network, gene_trees, seven_species_taxa()).unwrap()
}

// --- INDEPENDENT CHECKS ---
/// Log probability of the reticulation directions as read off the cells:
/// for every gene node passing a reticulation, the first lineage in its
/// ancestry that passes a parent of the reticulation towards it tells the
/// branch it arrived through.
pub fn recorded_log_gamma_sum(network: &Network, gene_tree: &GeneTree, embedding: &EmbeddingMatrix) -> f64 {
    let mut sum = 0.0;
    for reticulation in network.reticulation_nodes() {
        let node = network.node(reticulation);
        let gamma = node.gamma().unwrap();
        let row = network.traversal_index(reticulation).unwrap();
        for gene in 0..gene_tree.num_nodes() {
            if embedding.get(row, gene) < 0 {
                continue;
            }
            let mut ancestor = Some(gene);
            'ancestry: while let Some(a) = ancestor {
                for (slot, &branch) in node.parent_branches().iter().enumerate() {
                    let parent = network.branch_parent(branch);
                    let parent_row = network.traversal_index(parent).unwrap();
                    let taken = embedding.direction(parent_row, a).and_then(|d| network.node(parent).child_branch(d));
                    if taken == Some(branch) {
                        sum += if slot == 0 { gamma.ln() } else { (1.0 - gamma).ln() };
                        break 'ancestry;
                    }
                }
                ancestor = gene_tree[a].parent();
            }
        }
    }
    sum
}

/// Returns whether the row of `node` records at least one lineage.
pub fn row_is_used(network: &Network, embedding: &EmbeddingMatrix, node: usize) -> bool {
    let row = network.traversal_index(node).unwrap();
    embedding.row(row).iter().any(|&cell| cell >= 0)
}
