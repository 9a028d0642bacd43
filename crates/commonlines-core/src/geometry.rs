//! Common-line geometry shared by detection, voting and shift estimation.
//!
//! A rotation `R_i` maps image `i` into the molecule frame: its first two
//! columns are the 3D directions of the image's x and y axes, the third is
//! the viewing direction. The in-plane angle `α` of a 3D direction `ℓ`
//! lying in the plane of image `i` is `atan2(ℓ·b_i, ℓ·a_i)`.

use nalgebra::{Matrix3, Vector2, Vector3};
use std::f64::consts::{PI, TAU};

/// Planes closer to parallel than this have no well-defined common line.
const PARALLEL_EPS: f64 = 1e-12;

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn wrap_two_pi(theta: f64) -> f64 {
    let w = theta.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if w >= TAU {
        0.0
    } else {
        w
    }
}

/// Unit in-plane direction of a ray at angle `theta`.
#[inline]
pub fn ray_direction(theta: f64) -> Vector2<f64> {
    Vector2::new(theta.cos(), theta.sin())
}

/// Raw in-plane angles `(α_ij, α_ji)` of the direction `n_i × n_j`, both in
/// `[0, 2π)`. `None` when the two projection planes coincide.
pub fn common_line_raw(ri: &Matrix3<f64>, rj: &Matrix3<f64>) -> Option<(f64, f64)> {
    let ni: Vector3<f64> = ri.column(2).into_owned();
    let nj: Vector3<f64> = rj.column(2).into_owned();
    let l = ni.cross(&nj);
    if l.norm() < PARALLEL_EPS {
        return None;
    }
    let in_plane = |r: &Matrix3<f64>| {
        let a = r.column(0);
        let b = r.column(1);
        wrap_two_pi(l.dot(&b).atan2(l.dot(&a)))
    };
    Some((in_plane(ri), in_plane(rj)))
}

/// Common-line angles normalized so that `α_ij ∈ [0, π)`; `α_ji` is moved by
/// `π` together with `α_ij` so both still name the same 3D direction.
pub fn common_line_angles(ri: &Matrix3<f64>, rj: &Matrix3<f64>) -> Option<(f64, f64)> {
    let (a_ij, a_ji) = common_line_raw(ri, rj)?;
    if a_ij >= PI {
        Some((a_ij - PI, wrap_two_pi(a_ji + PI)))
    } else {
        Some((a_ij, a_ji))
    }
}

/// Quantized common-line indices `(c_ij, c_ji)` with `c_ij < n_theta/2`.
pub fn common_line_indices(
    ri: &Matrix3<f64>,
    rj: &Matrix3<f64>,
    n_theta: usize,
) -> Option<(usize, usize)> {
    let (a_ij, a_ji) = common_line_raw(ri, rj)?;
    let quantize = |a: f64| ((a * n_theta as f64 / TAU).round() as usize) % n_theta;
    let half = n_theta / 2;
    let (mut c_ij, mut c_ji) = (quantize(a_ij), quantize(a_ji));
    if c_ij >= half {
        c_ij -= half;
        c_ji = (c_ji + half) % n_theta;
    }
    Some((c_ij, c_ji))
}

/// Coefficients of the shift equation of a pair on `(x_i, y_i, x_j, y_j)`.
///
/// The 1D shift measured along the common line with angles `alpha` (image
/// `i`) and `beta` (image `j`) is `coeffs · (x_i, y_i, x_j, y_j)`. When
/// `beta` lies in the second half-turn the matching ray of image `j` was the
/// conjugate one and the sign of the whole row flips.
#[inline]
pub fn shift_equation_coefficients(alpha: f64, beta: f64) -> [f64; 4] {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let row = [ca, sa, -cb, -sb];
    if beta >= PI {
        row.map(|v| -v)
    } else {
        row
    }
}

/// 1D shift along a common line predicted from known per-image shifts.
pub fn common_line_shift(alpha: f64, beta: f64, si: &Vector2<f64>, sj: &Vector2<f64>) -> f64 {
    let c = shift_equation_coefficients(alpha, beta);
    c[0] * si.x + c[1] * si.y + c[2] * sj.x + c[3] * sj.y
}

/// Rotation about the z axis.
pub fn rot_z(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation about the x axis.
pub fn rot_x(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

/// `‖R Rᵀ − I‖_F`.
pub fn orthogonality_error(r: &Matrix3<f64>) -> f64 {
    (r * r.transpose() - Matrix3::identity()).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn basis(a: Vector3<f64>, b: Vector3<f64>) -> Matrix3<f64> {
        Matrix3::from_columns(&[a, b, a.cross(&b)])
    }

    #[test]
    fn orthogonal_planes_meet_on_the_shared_axis() {
        let ri = Matrix3::identity();
        let rj = basis(Vector3::x(), Vector3::z());
        let (a_ij, a_ji) = common_line_angles(&ri, &rj).unwrap();
        assert_abs_diff_eq!(a_ij, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(a_ji, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn normalization_moves_both_angles_by_half_turn() {
        let ri = rot_z(PI / 2.0 + 0.3);
        let rj = basis(Vector3::x(), Vector3::z());
        let (raw_ij, raw_ji) = common_line_raw(&ri, &rj).unwrap();
        let (a_ij, a_ji) = common_line_angles(&ri, &rj).unwrap();
        assert!(a_ij < PI);
        // both describe the same direction up to sign
        let d_raw = ri * Vector3::new(raw_ij.cos(), raw_ij.sin(), 0.0);
        let d = ri * Vector3::new(a_ij.cos(), a_ij.sin(), 0.0);
        let dj_raw = rj * Vector3::new(raw_ji.cos(), raw_ji.sin(), 0.0);
        let dj = rj * Vector3::new(a_ji.cos(), a_ji.sin(), 0.0);
        assert_abs_diff_eq!(d.dot(&dj), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d_raw.dot(&dj_raw), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn parallel_planes_have_no_common_line() {
        let r = rot_z(0.7);
        assert!(common_line_raw(&Matrix3::identity(), &r).is_none());
    }

    #[test]
    fn quantized_indices_stay_in_range() {
        let ri = rot_z(1.1) * rot_x(0.4);
        let rj = rot_x(1.3) * rot_z(-0.2);
        let (c_ij, c_ji) = common_line_indices(&ri, &rj, 72).unwrap();
        assert!(c_ij < 36);
        assert!(c_ji < 72);
    }

    #[test]
    fn translation_projections_give_zero_shift() {
        let ri = rot_z(0.3) * rot_x(0.9);
        let rj = rot_x(-0.5) * rot_z(2.0);
        let t = Vector3::new(0.3, -1.2, 0.8);
        let proj = |r: &Matrix3<f64>| Vector2::new(r.column(0).dot(&t), r.column(1).dot(&t));
        let (a, b) = common_line_angles(&ri, &rj).unwrap();
        assert_abs_diff_eq!(common_line_shift(a, b, &proj(&ri), &proj(&rj)), 0.0, epsilon = 1e-12);
    }
}
