//! Compressed sparse rows and the shift-equation builder.

use commonlines_core::geometry::shift_equation_coefficients;

/// Row-compressed sparse matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble from `(row, col, value)` triplets. Duplicate entries are
    /// summed; entries outside the shape are dropped.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets
            .iter()
            .copied()
            .filter(|&(r, c, _)| r < n_rows && c < n_cols)
            .collect();
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(tail) = values.last_mut() {
                    *tail += v;
                }
                continue;
            }
            indices.push(c);
            values.push(v);
            indptr[r + 1] += 1;
            last = Some((r, c));
        }
        for r in 0..n_rows {
            indptr[r + 1] += indptr[r];
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.indptr[r]..self.indptr[r + 1];
        self.indices[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    /// `A x`.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n_cols);
        (0..self.n_rows)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum::<f64>())
            .collect()
    }

    /// `Aᵀ y`.
    pub fn tr_mul_vec(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.n_rows);
        let mut out = vec![0.0; self.n_cols];
        for (r, &yr) in y.iter().enumerate() {
            for (c, v) in self.row(r) {
                out[c] += v * yr;
            }
        }
        out
    }

    /// Dense copy.
    pub fn to_dense(&self) -> nalgebra::DMatrix<f64> {
        let mut m = nalgebra::DMatrix::zeros(self.n_rows, self.n_cols);
        for r in 0..self.n_rows {
            for (c, v) in self.row(r) {
                m[(r, c)] += v;
            }
        }
        m
    }
}

/// Upper bound on the number of shift equations for `n_images` when each
/// image is compared with at most `n_check` later images.
pub fn estimate_equation_capacity(n_images: usize, n_check: Option<usize>) -> usize {
    let limit = n_check.unwrap_or(n_images);
    (0..n_images)
        .map(|i| (n_images - i - 1).min(limit))
        .sum()
}

/// Assembled shift equations `A x = b` over interleaved unknowns
/// `[x0, y0, x1, y1, ...]`.
#[derive(Clone, Debug)]
pub struct ShiftSystem {
    pub n_images: usize,
    pub matrix: CsrMatrix,
    pub rhs: Vec<f64>,
}

impl ShiftSystem {
    #[inline]
    pub fn n_equations(&self) -> usize {
        self.rhs.len()
    }

    #[inline]
    pub fn n_unknowns(&self) -> usize {
        2 * self.n_images
    }
}

/// Accumulates one equation per image pair.
#[derive(Clone, Debug)]
pub struct ShiftSystemBuilder {
    n_images: usize,
    triplets: Vec<(usize, usize, f64)>,
    rhs: Vec<f64>,
}

impl ShiftSystemBuilder {
    pub fn with_capacity(n_images: usize, n_equations: usize) -> Self {
        Self {
            n_images,
            triplets: Vec::with_capacity(4 * n_equations),
            rhs: Vec::with_capacity(n_equations),
        }
    }

    /// Add the equation of pair `(i, j)`: common line at `alpha` in image
    /// `i` and `beta` in image `j`, measured 1D shift `shift`.
    pub fn push_pair(&mut self, i: usize, j: usize, alpha: f64, beta: f64, shift: f64) {
        let row = self.rhs.len();
        let coeffs = shift_equation_coefficients(alpha, beta);
        let cols = [2 * i, 2 * i + 1, 2 * j, 2 * j + 1];
        self.triplets
            .extend(cols.into_iter().zip(coeffs).map(|(c, v)| (row, c, v)));
        self.rhs.push(shift);
    }

    #[inline]
    pub fn n_equations(&self) -> usize {
        self.rhs.len()
    }

    pub fn build(self) -> ShiftSystem {
        let n_rows = self.rhs.len();
        ShiftSystem {
            n_images: self.n_images,
            matrix: CsrMatrix::from_triplets(n_rows, 2 * self.n_images, &self.triplets),
            rhs: self.rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn triplets_are_sorted_and_summed() {
        let m = CsrMatrix::from_triplets(
            2,
            3,
            &[(1, 2, 1.0), (0, 1, 2.0), (1, 0, -1.0), (0, 1, 0.5), (5, 0, 9.0)],
        );
        assert_eq!(m.nnz(), 3);
        let d = m.to_dense();
        assert_eq!(d[(0, 1)], 2.5);
        assert_eq!(d[(1, 0)], -1.0);
        assert_eq!(d[(1, 2)], 1.0);
        assert_eq!(m.mul_vec(&[1.0, 2.0, 3.0]), vec![5.0, 2.0]);
        assert_eq!(m.tr_mul_vec(&[1.0, 2.0]), vec![-2.0, 2.5, 2.0]);
    }

    #[test]
    fn empty_rows_keep_their_place() {
        let m = CsrMatrix::from_triplets(3, 2, &[(2, 1, 4.0)]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![0.0, 0.0, 4.0]);
    }

    #[test]
    fn capacity_counts_later_partners() {
        assert_eq!(estimate_equation_capacity(5, None), 10);
        assert_eq!(estimate_equation_capacity(5, Some(2)), 2 + 2 + 2 + 1);
        assert_eq!(estimate_equation_capacity(1, None), 0);
    }

    #[test]
    fn pair_rows_have_four_entries_in_their_columns() {
        let mut b = ShiftSystemBuilder::with_capacity(3, 1);
        b.push_pair(0, 2, 0.3, 1.1, 0.7);
        let sys = b.build();
        assert_eq!(sys.n_equations(), 1);
        assert_eq!(sys.n_unknowns(), 6);
        let d = sys.matrix.to_dense();
        assert_abs_diff_eq!(d[(0, 0)], 0.3f64.cos());
        assert_abs_diff_eq!(d[(0, 1)], 0.3f64.sin());
        assert_eq!(d[(0, 2)], 0.0);
        assert_eq!(d[(0, 3)], 0.0);
        assert_abs_diff_eq!(d[(0, 4)], -(1.1f64.cos()));
        assert_abs_diff_eq!(d[(0, 5)], -(1.1f64.sin()));
        assert_eq!(sys.rhs, vec![0.7]);
    }
}
