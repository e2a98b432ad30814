use msmkit_counts::{
    CountConfig, CountMatrix, CountMode, CountsError, connected_sets, count_matrix,
    largest_connected_set,
};
use ndarray::Array2;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// 1. multiple_trajectories_accumulate
// ---------------------------------------------------------------------------
#[test]
fn multiple_trajectories_accumulate() {
    let a = vec![0usize, 1, 2, 1];
    let b = vec![2usize, 2, 0];
    let c = count_matrix(&[a, b], &CountConfig::new(1)).unwrap();
    assert_eq!(c.n_states(), 3);
    assert_eq!(c.total(), 5.0);
    assert_eq!(c.get(0, 1), 1.0);
    assert_eq!(c.get(1, 2), 1.0);
    assert_eq!(c.get(2, 1), 1.0);
    assert_eq!(c.get(2, 2), 1.0);
    assert_eq!(c.get(2, 0), 1.0);
}

// ---------------------------------------------------------------------------
// 2. restrict_to_largest_component
// ---------------------------------------------------------------------------
#[test]
fn restrict_to_largest_component() {
    // {0, 1, 2} cycle among themselves; 3 only leaks out and 4 is absorbing.
    let dtrajs = vec![
        vec![0usize, 1, 2, 0, 1, 2, 0],
        vec![3usize, 0, 1, 2],
        vec![4usize, 4, 4],
    ];
    let c = count_matrix(&dtrajs, &CountConfig::new(1)).unwrap();
    let sets = c.validate().unwrap();
    assert_eq!(sets.len(), 3);
    assert_eq!(sets.largest(), &[0, 1, 2]);
    assert_eq!(largest_connected_set(&c), vec![0, 1, 2]);

    let (sub, kept) = c.largest_connected_submatrix().unwrap();
    assert_eq!(kept, vec![0, 1, 2]);
    assert_eq!(sub.n_states(), 3);
    assert!(sub.validate().unwrap().is_connected());
    assert_eq!(sub.get(2, 0), 2.0);
}

// ---------------------------------------------------------------------------
// 3. sample_mode_uses_fewer_pairs
// ---------------------------------------------------------------------------
#[test]
fn sample_mode_uses_fewer_pairs() {
    let dtraj: Vec<usize> = (0..100).map(|t| (t / 3) % 4).collect();
    let sliding = count_matrix(&[&dtraj], &CountConfig::new(5)).unwrap();
    let sample = count_matrix(
        &[&dtraj],
        &CountConfig::new(5).with_mode(CountMode::Sample),
    )
    .unwrap();
    assert_eq!(sliding.total(), 95.0);
    assert_eq!(sample.total(), 19.0);
}

// ---------------------------------------------------------------------------
// 4. fixed_state_count_pads_matrix
// ---------------------------------------------------------------------------
#[test]
fn fixed_state_count_pads_matrix() {
    let c = count_matrix(&[vec![0usize, 1, 0]], &CountConfig::new(1).with_n_states(4)).unwrap();
    assert_eq!(c.n_states(), 4);
    assert_eq!(c.row_sums(), vec![1.0, 1.0, 0.0, 0.0]);

    let sets = connected_sets(&c);
    assert_eq!(sets.sizes(), vec![2, 1, 1]);
}

// ---------------------------------------------------------------------------
// 5. error_paths
// ---------------------------------------------------------------------------
#[test]
fn error_paths() {
    let empty: Vec<Vec<usize>> = vec![vec![]];
    assert!(matches!(
        count_matrix(&empty, &CountConfig::new(1)),
        Err(CountsError::EmptyTrajectories)
    ));
    assert!(matches!(
        count_matrix(&[vec![0usize, 1]], &CountConfig::new(0)),
        Err(CountsError::InvalidLag { lag: 0 })
    ));
    assert!(matches!(
        CountMatrix::new(Array2::zeros((2, 2))).unwrap().validate(),
        Err(CountsError::Disconnected)
    ));
}

proptest! {
    #[test]
    fn sliding_total_matches_pair_count(
        dtraj in prop::collection::vec(0usize..6, 1..200),
        lag in 1usize..10,
    ) {
        let c = count_matrix(&[&dtraj], &CountConfig::new(lag)).unwrap();
        let expected = dtraj.len().saturating_sub(lag) as f64;
        prop_assert_eq!(c.total(), expected);
    }

    #[test]
    fn components_partition_states(
        dtraj in prop::collection::vec(0usize..8, 2..100),
    ) {
        let c = count_matrix(&[&dtraj], &CountConfig::new(1)).unwrap();
        let sets = connected_sets(&c);
        let mut seen = vec![false; c.n_states()];
        for (k, set) in sets.iter().enumerate() {
            for &s in set {
                prop_assert!(!seen[s], "state {} in two components", s);
                seen[s] = true;
                prop_assert_eq!(sets.component_of(s), k);
            }
        }
        prop_assert!(seen.iter().all(|&v| v));
        let sizes = sets.sizes();
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }
}
