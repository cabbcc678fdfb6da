mod common;

use common::*;
use proptest::prelude::*;
use speciesnetwork::coalescent::{GeneTreeStatistics, compute};
use speciesnetwork::config::StatisticsConfig;
use speciesnetwork::embedding::EmbeddingMatrix;
use speciesnetwork::error::EmbeddingError;

/// Checks that every non-root lineage spends exactly its length in the network.
fn assert_occupancy_sums(state: &speciesnetwork::State, i: usize) {
    let statistics = state.statistics(i).unwrap();
    let gene_tree = state.gene_tree(i);
    for node in gene_tree.nodes() {
        let total = statistics.total_occupancy(node.index());
        match node.parent() {
            Some(parent) => {
                let expected = gene_tree[parent].height() - node.height();
                assert!((total - expected).abs() < 1e-9, "gene node {}: {total} vs. {expected}", node.index());
            }
            None => assert_eq!(total, f64::INFINITY),
        }
    }
}

// --- TESTS STATISTICS ---
#[test]
fn test_forced_statistics() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    let statistics = state.statistics(0).unwrap();
    let root_branch = state.network().root_branch();
    assert_eq!(root_branch, 7);

    // Gene nodes: a1 0, b1 1, c1 2, (a1,b1) 3, root 4
    assert_eq!(statistics.coalescent_times_in(root_branch), &[2.7]);
    assert_eq!(statistics.coalescent_times_in(3).len(), 1);
    assert!((statistics.coalescent_times_in(3)[0] - 1.2).abs() < 1e-9);
    assert!(statistics.coalescent_times_in(6).is_empty());

    // Lineages at the tipward end of each branch
    assert_eq!(statistics.lineage_counts, vec![1, 1, 1, 2, 0, 1, 1, 2]);

    // b1 spends 0.2 above L, 0.5 in the gamma branch and 0.5 below H1
    assert!((statistics.occupancy[1][3] - 0.2).abs() < 1e-9);
    assert!((statistics.occupancy[1][2] - 0.5).abs() < 1e-9);
    assert!((statistics.occupancy[1][1] - 0.5).abs() < 1e-9);
    assert_eq!(statistics.occupancy[1][4], 0.0);
    assert_eq!(statistics.occupancy[4][root_branch], f64::INFINITY);

    // b1 arrives at H1 through the gamma branch
    assert!((statistics.log_gamma_sum - 0.4f64.ln()).abs() < 1e-12);
    assert_occupancy_sums(&state, 0);
}

#[test]
fn test_free_choice_log_gamma_sum() {
    for seed in 0..16 {
        let mut state = single_reticulation_state(&[GENES_FREE]);
        state.rebuild_embeddings(&mut rng(seed)).unwrap();
        let statistics = state.statistics(0).unwrap();

        let expected = match state.embedding(0).direction(3, B1) {
            Some(0) => 0.4f64.ln(),
            _ => 0.6f64.ln(),
        };
        assert!((statistics.log_gamma_sum - expected).abs() < 1e-12);
        let recorded = recorded_log_gamma_sum(state.network(), state.gene_tree(0), state.embedding(0));
        assert!((statistics.log_gamma_sum - recorded).abs() < 1e-12);

        // (b1,c1) and the root coalesce above the network root
        let times = statistics.coalescent_times_in(state.network().root_branch());
        assert_eq!(times.len(), 2);
        assert!(times[0] < times[1]);
        assert_occupancy_sums(&state, 0);
    }
}

#[test]
fn test_impossible_direction() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.network_mut().node_mut(H1).set_gamma(0.0);
    assert_eq!(state.statistics(0).unwrap().log_gamma_sum, f64::NEG_INFINITY);
}

#[test]
fn test_tree_has_no_gamma_term() {
    let mut state = seven_species_state(0.0);
    state.rebuild_embeddings(&mut rng(4)).unwrap();
    for i in 0..state.num_gene_trees() {
        assert_eq!(state.statistics(i).unwrap().log_gamma_sum, 0.0);
        assert_occupancy_sums(&state, i);
    }
}

// --- TESTS ERRORS ---
#[test]
fn test_untraversed_before_rebuild() {
    let state = single_reticulation_state(&[GENES_FORCED]);
    let error = state.statistics(0).unwrap_err();
    assert_eq!(error, EmbeddingError::Untraversed { node: ROOT, gene: 3 });
}

#[test]
fn test_missing_child() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.embedding_mut(0).set(0, 1, 1);
    let error = state.statistics(0).unwrap_err();
    assert_eq!(error, EmbeddingError::MissingChild { node: H1, gene: 1, direction: 1 });
}

#[test]
fn test_wrong_dimensions() {
    let state = single_reticulation_state(&[GENES_FORCED]);
    let embedding = EmbeddingMatrix::new(4, 5);
    let error = compute(state.network(), state.gene_tree(0), &embedding, &state.network().gammas()).unwrap_err();
    assert!(matches!(error, EmbeddingError::Dimensions { rows: 5, cols: 5, found_rows: 4, found_cols: 5 }));
}

#[test]
fn test_gamma_count() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    let error = compute(state.network(), state.gene_tree(0), state.embedding(0), &[]).unwrap_err();
    assert_eq!(error, EmbeddingError::GammaCount { found: 0, expected: 1 });
}

// --- TESTS CACHE ---
#[test]
fn test_cache_recomputes_after_edit() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.accept();

    let mut cache = GeneTreeStatistics::new(0, &StatisticsConfig::default());
    assert_eq!(cache.gene_tree(), 0);
    assert_eq!(cache.ploidy(), 2.0);
    assert!(cache.is_dirty());

    let before = cache.statistics(&state).unwrap().clone();
    assert!(!cache.is_dirty());
    assert!(!cache.requires_recalculation(&state));

    // Raising L changes the time b1 spends above it
    state.network_mut().start_editing("test");
    state.network_mut().node_mut(L).set_height(1.1);
    assert!(cache.requires_recalculation(&state));
    let after = cache.statistics(&state).unwrap();
    assert!((after.occupancy[1][3] - 0.1).abs() < 1e-9);
    assert_ne!(&before, after);
}

#[test]
fn test_cache_store_restore() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.accept();

    let mut cache = GeneTreeStatistics::new(0, &StatisticsConfig::default().with_ploidy(1.0));
    assert_eq!(cache.ploidy(), 1.0);
    let before = cache.statistics(&state).unwrap().clone();
    state.store();
    cache.store();

    state.network_mut().start_editing("test");
    state.network_mut().node_mut(L).set_height(1.1);
    cache.statistics(&state).unwrap();

    state.restore();
    cache.restore();
    assert!(!cache.is_dirty());
    assert_eq!(cache.statistics(&state).unwrap(), &before);
}

#[test]
fn test_cache_mark_dirty() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.accept();

    let mut cache = GeneTreeStatistics::new(0, &StatisticsConfig::default());
    cache.occupancy(&state).unwrap();
    assert!(!cache.is_dirty());
    cache.mark_dirty();
    assert!(cache.requires_recalculation(&state));
}

#[test]
fn test_cache_after_accepted_edit() {
    let mut state = single_reticulation_state(&[GENES_FORCED]);
    state.rebuild_embeddings(&mut rng(2)).unwrap();
    state.accept();

    let mut cache = GeneTreeStatistics::new(0, &StatisticsConfig::default());
    let before = cache.statistics(&state).unwrap().clone();

    // Accepting clears the edit flags, so only mark_dirty reveals the edit
    state.network_mut().start_editing("test");
    state.network_mut().node_mut(L).set_height(1.1);
    state.accept();
    assert!(!cache.requires_recalculation(&state));
    assert_eq!(cache.statistics(&state).unwrap(), &before);

    cache.mark_dirty();
    let after = cache.statistics(&state).unwrap();
    assert_eq!(after, &state.statistics(0).unwrap());
    assert!((after.occupancy[1][3] - 0.1).abs() < 1e-9);
}

proptest! {
    #[test]
    fn test_occupancy_sums(seed in any::<u64>()) {
        let mut state = seven_species_state(0.0);
        prop_assert!(state.rebuild_embeddings(&mut rng(seed)).is_some());
        for i in 0..state.num_gene_trees() {
            let statistics = state.statistics(i).unwrap();
            let gene_tree = state.gene_tree(i);
            for node in gene_tree.nodes() {
                if let Some(parent) = node.parent() {
                    let expected = gene_tree[parent].height() - node.height();
                    prop_assert!((statistics.total_occupancy(node.index()) - expected).abs() < 1e-9);
                }
            }
            // One lineage per gene leaf ends in a leaf branch
            let leaf_lineages: usize = (0..state.network().num_leaves())
                .map(|leaf| statistics.lineage_counts[state.network().node(leaf).parent_branches()[0]])
                .sum();
            prop_assert_eq!(leaf_lineages, gene_tree.num_leaves());
        }
    }

    #[test]
    fn test_log_gamma_sum_matches_cells(seed in any::<u64>()) {
        let mut state = single_reticulation_state(&[GENES_FREE, GENES_FORCED]);
        state.rebuild_embeddings(&mut rng(seed)).unwrap();
        for i in 0..state.num_gene_trees() {
            let statistics = state.statistics(i).unwrap();
            let recorded = recorded_log_gamma_sum(state.network(), state.gene_tree(i), state.embedding(i));
            prop_assert!((statistics.log_gamma_sum - recorded).abs() < 1e-12);
        }
    }
}
