//! Rotation synchronization from common lines.
//!
//! Pairwise common lines are turned into relative in-plane rotations by
//! voting over witness images (`VotingEstimator`), assembled into the
//! `2N x 2N` synchronization matrix (`SynchronizationMatrixBuilder`), and
//! converted into one rotation per image from its leading eigenvectors
//! (`RotationSynchronizer`).

mod error;
mod params;
mod sync_matrix;
mod synchronizer;
mod voting;

pub use error::SyncError;
pub use params::{SyncParams, VotingParams};
pub use sync_matrix::{
    rotation_ratio, PairBlock, SyncMatrix, SyncMatrixBuild, SyncReport,
    SynchronizationMatrixBuilder,
};
pub use synchronizer::{RotationSynchronizer, SyncRotations};
pub use voting::{
    triangle_vote, vote_histogram, TriangleVote, VoteHistogram, VoteOutcome, VotingEstimator,
    Witness,
};
