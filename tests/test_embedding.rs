mod common;

use common::*;
use proptest::prelude::*;
use speciesnetwork::embedding::{EmbeddingMatrix, HeirSets, NOT_TRAVERSED, choice_delta, count_choices, rebuild, reembed};
use speciesnetwork::newick::parse_gene_tree;
use std::collections::BTreeSet;
use std::f64::consts::LN_2;

// Rows of the single reticulation network
const ROW_H1: usize = 0;
const ROW_L: usize = 1;
const ROW_R: usize = 2;
const ROW_ROOT: usize = 3;
const ROW_ORIGIN: usize = 4;

// --- TESTS HEIR SETS ---
#[test]
fn test_heir_sets() {
    let state = single_reticulation_state(&[GENES_FREE]);
    let heirs = HeirSets::compute(state.network(), state.gene_tree(0), state.assignment(0));

    assert_eq!(heirs.of_node(0), &BTreeSet::from([0, 1]));
    assert_eq!(heirs.of_node(H1), &BTreeSet::from([B1]));
    assert_eq!(heirs.of_node(L), &BTreeSet::from([0, 1, B1]));
    assert_eq!(heirs.of_node(R), &BTreeSet::from([B1, 3]));
    assert_eq!(heirs.of_node(ORIGIN), &BTreeSet::from([0, 1, 2, 3]));
    assert_eq!(heirs.of_gene(5), &BTreeSet::from([B1, 3]));

    // b1 fits below both parents of H1, (b1,c1) only below R
    assert!(heirs.covers(L, B1));
    assert!(heirs.covers(R, B1));
    assert!(heirs.covers(R, 5));
    assert!(!heirs.covers(L, 5));
}

// --- TESTS REBUILD ---
#[test]
fn test_rebuild_forced() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    assert_eq!(state.rebuild_embeddings(&mut rng(1)), Some(0));

    // Gene nodes: a1 0, b1 1, c1 2, (a1,b1) 3, root 4
    let embedding = state.embedding(0);
    assert_eq!(embedding.rows(), 5);
    assert_eq!(embedding.cols(), 5);
    assert_eq!(embedding.direction(ROW_ROOT, 3), Some(0));
    assert_eq!(embedding.direction(ROW_ROOT, 2), Some(1));
    assert_eq!(embedding.direction(ROW_L, 0), Some(0));
    assert_eq!(embedding.direction(ROW_L, 1), Some(1));
    assert_eq!(embedding.direction(ROW_H1, 1), Some(0));
    assert_eq!(embedding.direction(ROW_R, 2), Some(1));

    // The root coalesces above the network root, (a1,b1) above L
    assert_eq!(embedding.get(ROW_ROOT, 4), NOT_TRAVERSED);
    assert_eq!(embedding.get(ROW_L, 3), NOT_TRAVERSED);
    assert_eq!(embedding.get(ROW_R, 1), NOT_TRAVERSED);
    assert!(embedding.row(ROW_ORIGIN).iter().all(|&cell| cell == NOT_TRAVERSED));
}

#[test]
fn test_rebuild_free_choice() {
    let mut seen = [false; 2];
    for seed in 0..32 {
        let mut state = single_reticulation_state(&[GENES_FREE]);
        assert_eq!(state.rebuild_embeddings(&mut rng(seed)), Some(1));

        let embedding = state.embedding(0);
        let direction = embedding.direction(ROW_ROOT, B1).unwrap();
        seen[direction] = true;

        // Whichever way b1 goes, it reaches H1 through a forced step
        let via = if direction == 0 { ROW_L } else { ROW_R };
        let other = if direction == 0 { ROW_R } else { ROW_L };
        assert!(embedding.direction(via, B1).is_some());
        assert_eq!(embedding.get(other, B1), NOT_TRAVERSED);
        assert_eq!(embedding.direction(ROW_H1, B1), Some(0));
    }
    assert_eq!(seen, [true, true]);
}

#[test]
fn test_rebuild_not_embeddable() {
    // a1 and c1 would have to meet below the root
    let mut state = single_reticulation_state(&["((a1:0.5,c1:0.5):2.0,b1:2.5);"]);
    assert_eq!(state.rebuild_embeddings(&mut rng(3)), None);
}

#[test]
fn test_rebuild_seven_species() {
    let mut state = seven_species_state(0.0);
    assert!(state.rebuild_embeddings(&mut rng(11)).is_some());
    for i in 0..state.num_gene_trees() {
        assert!(count_choices(state.network(), state.gene_tree(i), state.assignment(i), state.embedding(i)).is_some());
    }
}

// --- TESTS COUNTING ---
#[test]
fn test_count_rejects_wrong_direction() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(1)).unwrap();
    state.embedding_mut(0).set(ROW_L, 0, 1);
    assert_eq!(count_choices(state.network(), state.gene_tree(0), state.assignment(0), state.embedding(0)), None);
}

#[test]
fn test_count_rejects_unset_cell() {
    let mut state = single_reticulation_state(&[GENES_FREE]);
    state.rebuild_embeddings(&mut rng(1)).unwrap();
    state.embedding_mut(0).set(ROW_H1, B1, NOT_TRAVERSED);
    assert_eq!(count_choices(state.network(), state.gene_tree(0), state.assignment(0), state.embedding(0)), None);
}

#[test]
fn test_count_rejects_dimensions() {
    let state = single_reticulation_state(&[GENES_FREE]);
    let embedding = EmbeddingMatrix::new(2, 7);
    assert_eq!(count_choices(state.network(), state.gene_tree(0), state.assignment(0), &embedding), None);
}

#[test]
fn test_count_empty_embedding() {
    let state = single_reticulation_state(&[GENES_FORCED]);
    assert_eq!(count_choices(state.network(), state.gene_tree(0), state.assignment(0), state.embedding(0)), None);
}

// --- TESTS REEMBEDDING ---
#[test]
fn test_choice_delta() {
    assert_eq!(choice_delta(2, 2), 0.0);
    assert!((choice_delta(1, 3) - 2.0 * LN_2).abs() < 1e-12);
    assert!((choice_delta(3, 2) + LN_2).abs() < 1e-12);
}

#[test]
fn test_reembed_without_valid_embedding() {
    let mut state = single_reticulation_state(&[GENES_FREE]);
    let (network, gene_tree, assignment, embedding) = state.embedding_parts_mut(0);
    let outcome = reembed(None, network, gene_tree, assignment, embedding, &mut rng(0));
    assert!(!outcome.success);
    assert_eq!(outcome.log_choice_delta, f64::NEG_INFINITY);
}

#[test]
fn test_reembed_counts_new_choices() {
    // b1 passing the root alone is the only free choice
    let mut state = single_reticulation_state(&[GENES_FREE]);
    let (network, gene_tree, assignment, embedding) = state.embedding_parts_mut(0);
    let outcome = reembed(Some(0), network, gene_tree, assignment, embedding, &mut rng(0));
    assert!(outcome.success);
    assert!((outcome.log_choice_delta - LN_2).abs() < 1e-12);
    assert_eq!(count_choices(network, gene_tree, assignment, embedding), Some(1));

    let outcome = reembed(Some(3), network, gene_tree, assignment, embedding, &mut rng(1));
    assert!((outcome.log_choice_delta + 2.0 * LN_2).abs() < 1e-12);
}

#[test]
fn test_rebuild_overwrites_stale_matrix() {
    let state = single_reticulation_state(&[GENES_FORCED]);
    let gene_tree = parse_gene_tree(GENES_FREE).unwrap();
    let assignment = state.taxa().assign(state.network(), &gene_tree).unwrap();
    let mut embedding = EmbeddingMatrix::new(1, 1);
    assert_eq!(rebuild(state.network(), &gene_tree, &assignment, &mut embedding, &mut rng(5)), Some(1));
    assert_eq!((embedding.rows(), embedding.cols()), (5, 7));
}

// --- TESTS LIFECYCLE ---
#[test]
fn test_embedding_store_restore() {
    let mut state = single_reticulation_state(&[GENES_FREE]);
    state.rebuild_embeddings(&mut rng(9)).unwrap();
    let before: Vec<i8> = state.embedding(0).row(ROW_ROOT).to_vec();

    let embedding = state.embedding_mut(0);
    embedding.start_editing("test");
    assert!(embedding.is_dirty());
    embedding.set(ROW_ROOT, B1, 1 - embedding.get(ROW_ROOT, B1));
    embedding.restore();

    assert!(!state.embedding(0).is_dirty());
    assert_eq!(state.embedding(0).row(ROW_ROOT), before.as_slice());
}

proptest! {
    #[test]
    fn test_count_matches_rebuild(seed in any::<u64>()) {
        let mut state = seven_species_state(0.0);
        let mut random = rng(seed);
        for i in 0..state.num_gene_trees() {
            let (network, gene_tree, assignment, embedding) = state.embedding_parts_mut(i);
            let drawn = rebuild(network, gene_tree, assignment, embedding, &mut random);
            prop_assert!(drawn.is_some());
            prop_assert_eq!(count_choices(network, gene_tree, assignment, embedding), drawn);
        }
    }

    #[test]
    fn test_reembed_same_network_delta_zero(first in any::<u64>(), second in any::<u64>()) {
        let mut state = single_reticulation_state(&[GENES_FREE, GENES_FORCED]);
        state.rebuild_embeddings(&mut rng(first)).unwrap();
        let mut random = rng(second);
        for i in 0..state.num_gene_trees() {
            let old = count_choices(state.network(), state.gene_tree(i), state.assignment(i), state.embedding(i));
            let (network, gene_tree, assignment, embedding) = state.embedding_parts_mut(i);
            let outcome = reembed(old, network, gene_tree, assignment, embedding, &mut random);
            prop_assert!(outcome.success);
            prop_assert_eq!(outcome.log_choice_delta, 0.0);
        }
    }
}
