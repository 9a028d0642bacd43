use commonlines_core::geometry::{rot_x, rot_z};
use commonlines_core::synthetic::{grid_aligned_triplet, random_rotations, GaussianPhantom};
use commonlines_core::{register_rotations, CommonLineAngleMatrix, CommonLineMatrix};
use commonlines_detect::{CommonLineDetector, CommonLineParams};
use commonlines_sync::{
    RotationSynchronizer, SyncError, SyncMatrix, SyncParams, SynchronizationMatrixBuilder,
    VotingEstimator, VotingParams,
};
use nalgebra::{DMatrix, Matrix2};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn voting_reproduces_exact_relative_rotations() {
    let mut rng = StdRng::seed_from_u64(42);
    let truth = random_rotations(10, &mut rng);
    let cl = CommonLineAngleMatrix::from_rotations(&truth);

    let build = SynchronizationMatrixBuilder::new(VotingParams {
        consistency_tolerance: 1e-12,
        ..VotingParams::default()
    })
    .build(&cl);
    let exact = SyncMatrix::from_rotations(&truth);

    assert_eq!(build.report.pairs_voted, 45);
    assert_eq!(build.report.null_blocks, 0);
    assert_eq!(build.report.inconsistent_pairs, 0);
    assert!(build.matrix.asymmetry() < 1e-15);
    for i in 0..10 {
        assert_eq!(build.matrix.block(i, i), Matrix2::identity());
        for j in 0..10 {
            let d = (build.matrix.block(i, j) - exact.block(i, j)).amax();
            assert!(d < 1e-10, "block ({i},{j}) off by {d}");
        }
    }
}

#[test]
fn noiseless_rotations_are_recovered_up_to_global_transform() {
    let mut rng = StdRng::seed_from_u64(7);
    let truth = random_rotations(12, &mut rng);
    let cl = CommonLineAngleMatrix::from_rotations(&truth);

    let s = SynchronizationMatrixBuilder::new(VotingParams::default()).build(&cl);
    let sync = RotationSynchronizer::new(SyncParams::default())
        .synchronize(&s.matrix)
        .unwrap();

    assert_eq!(sync.rotations.len(), 12);
    assert!(sync.rotations.max_orthogonality_error() < 1e-10);
    assert!(sync.rotations.max_determinant_error() < 1e-10);
    // rank-3 matrix: three nonzero eigenvalues summing to the trace 2N
    let top: f64 = sync.eigenvalues[..3].iter().sum();
    assert!((top - 24.0).abs() < 1e-9);
    assert!(sync.eigenvalues[3].abs() < 1e-9);

    let reg = register_rotations(&sync.rotations, &truth).unwrap();
    assert!(reg.max_error < 1e-8, "registration residual {}", reg.max_error);
}

#[test]
fn exact_sync_matrix_gives_exact_rotations() {
    let mut rng = StdRng::seed_from_u64(99);
    let truth = random_rotations(6, &mut rng);
    let sync = RotationSynchronizer::new(SyncParams::default())
        .synchronize(&SyncMatrix::from_rotations(&truth))
        .unwrap();
    assert_eq!(sync.projected, 0);
    let reg = register_rotations(&sync.rotations, &truth).unwrap();
    assert!(reg.max_error < 1e-10);
}

#[test]
fn quantized_detection_pipeline_recovers_rough_orientations() {
    let n_theta = 360;
    let mut rng = StdRng::seed_from_u64(5);
    let truth = random_rotations(12, &mut rng);
    let phantom = GaussianPhantom::random(4, 6.0, 1.0, &mut rng);
    let stack = phantom.polar_stack(&truth, None, 16, n_theta).unwrap();
    let detection = CommonLineDetector::new(CommonLineParams {
        max_shift: 0.0,
        ..CommonLineParams::default()
    })
    .detect(&stack)
    .unwrap();

    let s = SynchronizationMatrixBuilder::new(VotingParams::default()).build(&detection.clmatrix);
    assert_eq!(s.report.pairs_voted, 66);
    // quantization noise alone must not flag most pairs
    assert!(
        s.report.inconsistent_pairs <= s.report.pairs_voted / 4,
        "{} of {} pairs flagged",
        s.report.inconsistent_pairs,
        s.report.pairs_voted
    );
    let sync = RotationSynchronizer::new(SyncParams::default())
        .synchronize(&s.matrix)
        .unwrap();
    assert!(sync.rotations.max_orthogonality_error() < 1e-9);
    assert!(sync.rotations.max_determinant_error() < 1e-9);
    let reg = register_rotations(&sync.rotations, &truth).unwrap();
    assert!(reg.mean_error < 0.05, "mean residual {}", reg.mean_error);
}

#[test]
fn impossible_witness_is_not_a_good_vote() {
    // cos θ1 = cos θ2 = cos θ3 = -0.9 cannot close a spherical triangle
    let t = (-0.9f64).acos();
    let mut cl = CommonLineAngleMatrix::undefined(3);
    cl.set_pair(0, 1, 0.0, 0.0);
    cl.set_pair(0, 2, t, 0.0);
    cl.set_pair(1, 2, t, t);

    let outcome = VotingEstimator::new(VotingParams::default()).vote_pair(&cl, 0, 1);
    assert_eq!(outcome.rejected, vec![2]);
    assert!(outcome.good.is_empty());

    let build = SynchronizationMatrixBuilder::new(VotingParams::default()).build(&cl);
    assert_eq!(build.matrix.block(0, 1), Matrix2::zeros());
    assert!(build.report.null_blocks >= 1);
    assert!(build.report.rejected_witnesses >= 1);
}

#[test]
fn orthogonal_triplet_votes_a_right_angle() {
    let n_theta = 36;
    let rotations = grid_aligned_triplet(&(rot_z(0.2) * rot_x(0.6)), [1, 2, 3], n_theta);
    let cl = CommonLineMatrix::from_rotations(&rotations, n_theta);
    let outcome = VotingEstimator::new(VotingParams::default()).vote_pair(&cl, 0, 1);
    assert_eq!(outcome.good.len(), 1);
    assert_eq!(outcome.good[0].k, 2);
    assert!(outcome.good[0].cos_phi.abs() < 1e-12);
}

#[test]
fn witness_subsampling_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(13);
    let truth = random_rotations(15, &mut rng);
    let cl = CommonLineAngleMatrix::from_rotations(&truth);
    let voting = VotingEstimator::new(VotingParams {
        max_witnesses: Some(5),
        seed: 3,
        ..VotingParams::default()
    });
    let a = voting.witnesses(&cl, 2, 9);
    assert_eq!(a.len(), 5);
    assert!(!a.contains(&2) && !a.contains(&9));
    assert_eq!(a, voting.witnesses(&cl, 2, 9));
}

#[test]
fn indefinite_gram_matrix_is_a_synchronization_failure() {
    // rows satisfy the unit/orthogonality equations for Q = diag(1, 1, -1)
    let (c5, s5) = (0.5f64.cosh(), 0.5f64.sinh());
    let (c7, s7) = (0.7f64.cosh(), 0.7f64.sinh());
    let (c9, s9) = (0.9f64.cos(), 0.9f64.sin());
    let w = DMatrix::from_row_slice(
        8,
        3,
        &[
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            c5, 0.0, s5, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, c7, s7, //
            c9, s9, 0.0, //
            -s9, c9, 0.0,
        ],
    );
    let s = SyncMatrix::from_matrix(&w * w.transpose()).unwrap();
    let err = RotationSynchronizer::new(SyncParams::default())
        .synchronize(&s)
        .unwrap_err();
    assert!(matches!(err, SyncError::NotPositiveDefinite { .. }));
}
