//! Estimate orientations of a synthetic Gaussian-blob phantom and compare
//! them with the ground truth.
//!
//! Usage: `synthetic_orientation [config.json]`

use commonlines::core::synthetic::{random_rotations, random_shifts, GaussianPhantom};
use commonlines::{register_rotations, OrientationEstimator, OrientationParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
#[cfg(feature = "tracing")]
use tracing_log::LogTracer;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

const N_IMAGES: usize = 24;
const N_RAD: usize = 16;
const N_THETA: usize = 360;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let params = match std::env::args().nth(1) {
        Some(path) => OrientationParams::load_json(path)?,
        None => OrientationParams {
            detect: commonlines::detect::CommonLineParams {
                max_shift: 3.0,
                ..Default::default()
            },
            ..OrientationParams::default()
        },
    };

    let mut rng = StdRng::seed_from_u64(2024);
    let truth = random_rotations(N_IMAGES, &mut rng);
    let shifts = random_shifts(N_IMAGES, 1.0, &mut rng);
    let phantom = GaussianPhantom::random(5, 6.0, 1.0, &mut rng);
    let stack = phantom.polar_stack(&truth, Some(&shifts), N_RAD, N_THETA)?;

    let start = Instant::now();
    let result = OrientationEstimator::new(params).estimate(&stack)?;
    println!(
        "pipeline finished in {:.2} s",
        start.elapsed().as_secs_f64()
    );

    println!(
        "detected {} of {} pairs, {} null blocks",
        result.common_lines.clmatrix.defined_pairs(),
        N_IMAGES * (N_IMAGES - 1) / 2,
        result.sync_report.null_blocks
    );
    if let Some(reg) = register_rotations(&result.rotations, &truth) {
        println!(
            "rotation residual: mean {:.4}, max {:.4} (reflected: {})",
            reg.mean_error, reg.max_error, reg.reflected
        );
    }
    if let Some(est) = &result.shifts {
        println!(
            "shifts: {} equations, LSQR {:?} after {} iterations",
            est.n_equations, est.stop, est.iterations
        );
    }

    Ok(())
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = commonlines::core::init_with_level(log::LevelFilter::Info);
    }
}
