/////////////////////////////////////////////////////////////////////////////////////////////
//
// Adds sparse linear algebra helpers: row storage, normal equations, and direct solves.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # linalg
//!
//! Sparse linear algebra for the least-squares systems assembled by the
//! constraint compilers.
//!
//! Triplets are regrouped into compressed rows once per solve; the rows
//! drive the normal-equation assembly, the iterative refinement mat-vecs,
//! and the residual diagnostics. The direct solve factors `AᵀA` with a
//! sparse Cholesky and falls back to sparse LU when the normal matrix is
//! not numerically positive-definite.

use faer::prelude::Solve;
use faer::sparse::linalg::solvers::{Llt, Lu, SymbolicLlt, SymbolicLu};
use faer::sparse::{SparseColMat, Triplet as SparseTriplet};
use faer::{Mat, Side};
use rayon::prelude::*;

use crate::equation::Triplet;

/// An assembled system in compressed row form, the working representation
/// for everything row-oriented: normal equations, residuals, mat-vecs.
pub (crate) struct RowMajorSystem {
    pub num_rows: usize,
    pub num_cols: usize,
    row_ptr: Vec<usize>,
    cols: Vec<u32>,
    vals: Vec<f32>,
}

impl RowMajorSystem {
    /// Regroups loose triplets by row. Entry order within a row follows
    /// append order; duplicate columns are kept as-is.
    pub fn from_triplets(num_rows: usize, num_cols: usize, triplets: &[Triplet]) -> Self {
        for t in triplets {
            assert!(
                (t.row as usize) < num_rows,
                "Triplet row {} out of range for {} rows",
                t.row,
                num_rows
            );
            assert!(
                (t.col as usize) < num_cols,
                "Triplet column {} out of range for {} unknowns",
                t.col,
                num_cols
            );
        }

        let mut row_counts = vec![0usize; num_rows];
        for t in triplets {
            row_counts[t.row as usize] += 1;
        }

        let mut row_ptr = vec![0usize; num_rows + 1];
        for i in 0..num_rows {
            row_ptr[i + 1] = row_ptr[i] + row_counts[i];
        }

        let nnz = row_ptr[num_rows];
        let mut cols = vec![0u32; nnz];
        let mut vals = vec![0.0f32; nnz];
        let mut cursor = row_ptr[..num_rows].to_vec();
        for t in triplets {
            let pos = cursor[t.row as usize];
            cols[pos] = t.col;
            vals[pos] = t.coeff;
            cursor[t.row as usize] += 1;
        }

        Self { num_rows, num_cols, row_ptr, cols, vals }
    }

    /// The column indices and coefficients of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[u32], &[f32]) {
        let span = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.cols[span.clone()], &self.vals[span])
    }

    /// `out = A x`, row-partitioned across threads.
    pub fn matvec(&self, x: &[f64], out: &mut [f64]) {
        out.par_iter_mut().enumerate().for_each(|(i, out_i)| {
            let (cols, vals) = self.row(i);
            *out_i = cols
                .iter()
                .zip(vals)
                .map(|(&c, &v)| v as f64 * x[c as usize])
                .sum();
        });
    }

    /// `out = Aᵀ y` by scattering each row's contribution.
    pub fn matvec_transpose(&self, y: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        for i in 0..self.num_rows {
            let (cols, vals) = self.row(i);
            let yi = y[i];
            for (&c, &v) in cols.iter().zip(vals) {
                out[c as usize] += v as f64 * yi;
            }
        }
    }
}

/// Forms `N = AᵀA` (summing coincident entries) and `c = Aᵀb`.
fn normal_equations(
    sys: &RowMajorSystem,
    rhs: &[f32],
) -> Option<(SparseColMat<usize, f64>, Mat<f64>)> {
    let n = sys.num_cols;

    let mut atb = Mat::<f64>::zeros(n, 1);
    let mut products: Vec<(usize, usize, f64)> = Vec::new();

    for i in 0..sys.num_rows {
        let (cols, vals) = sys.row(i);
        let b = rhs[i] as f64;
        for (&ca, &va) in cols.iter().zip(vals) {
            atb[(ca as usize, 0)] += va as f64 * b;
            for (&cb, &vb) in cols.iter().zip(vals) {
                products.push((ca as usize, cb as usize, va as f64 * vb as f64));
            }
        }
    }

    // Sum coincident entries before handing faer a duplicate-free list.
    products.sort_unstable_by_key(|&(r, c, _)| (c, r));
    let mut merged: Vec<SparseTriplet<usize, usize, f64>> = Vec::new();
    for (r, c, v) in products {
        match merged.last_mut() {
            Some(last) if last.row == r && last.col == c => last.val += v,
            _ => merged.push(SparseTriplet { row: r, col: c, val: v }),
        }
    }

    let normal = SparseColMat::try_new_from_triplets(n, n, &merged).ok()?;
    Some((normal, atb))
}

/// Solves `N x = c` by sparse Cholesky, falling back to sparse LU when the
/// factorization reports that `N` is not positive-definite.
fn solve_normal_system(normal: &SparseColMat<usize, f64>, atb: &Mat<f64>) -> Option<Mat<f64>> {
    if let Ok(symbolic) = SymbolicLlt::try_new(normal.symbolic(), Side::Lower) {
        if let Ok(llt) = Llt::try_new_with_symbolic(symbolic, normal.as_ref(), Side::Lower) {
            return Some(llt.solve(atb));
        }
    }

    if let Ok(symbolic) = SymbolicLu::try_new(normal.symbolic()) {
        if let Ok(lu) = Lu::try_new_with_symbolic(symbolic, normal.as_ref()) {
            return Some(lu.solve(atb));
        }
    }

    None
}

/// Solves the over-determined system in the least-squares sense, returning
/// the field values at every lattice node.
///
/// Returns an empty vector when the normal matrix cannot be factored or
/// the factorization produces non-finite values; callers treat that as
/// "failed to solve" and pick their own fallback.
pub fn solve_exact(num_unknowns: usize, triplets: &[Triplet], rhs: &[f32]) -> Vec<f32> {
    assert!(num_unknowns > 0, "Cannot solve for zero unknowns");

    let sys = RowMajorSystem::from_triplets(rhs.len(), num_unknowns, triplets);

    let (normal, atb) = match normal_equations(&sys, rhs) {
        Some(pair) => pair,
        None => return Vec::new(),
    };

    let x = match solve_normal_system(&normal, &atb) {
        Some(x) => x,
        None => return Vec::new(),
    };

    let solution: Vec<f32> = (0..num_unknowns).map(|i| x[(i, 0)] as f32).collect();
    match solution.iter().all(|v| v.is_finite()) {
        true => solution,
        false => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::add_value_constraint;
    use crate::field_config::{ValueKernel, Weights};
    use crate::lattice::LatticeField;
    use crate::model::add_field_constraints;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn row_views_group_triplets() {
        let triplets = vec![
            Triplet::new(1, 2, 3.0),
            Triplet::new(0, 0, 1.0),
            Triplet::new(1, 0, -1.0),
        ];
        let sys = RowMajorSystem::from_triplets(2, 3, &triplets);

        let (cols, vals) = sys.row(0);
        assert_eq!(cols, &[0]);
        assert_eq!(vals, &[1.0]);

        let (cols, vals) = sys.row(1);
        assert_eq!(cols, &[2, 0]);
        assert_eq!(vals, &[3.0, -1.0]);
    }

    #[test]
    fn matvec_and_transpose_agree_with_dense() {
        // A = [1 2 0; 0 -1 1]
        let triplets = vec![
            Triplet::new(0, 0, 1.0),
            Triplet::new(0, 1, 2.0),
            Triplet::new(1, 1, -1.0),
            Triplet::new(1, 2, 1.0),
        ];
        let sys = RowMajorSystem::from_triplets(2, 3, &triplets);

        let x = [1.0, 2.0, 3.0];
        let mut ax = [0.0; 2];
        sys.matvec(&x, &mut ax);
        assert_eq!(ax, [5.0, 1.0]);

        let y = [1.0, 2.0];
        let mut aty = [0.0; 3];
        sys.matvec_transpose(&y, &mut aty);
        assert_eq!(aty, [1.0, 0.0, 2.0]);
    }

    #[test]
    fn pinned_ramp_solves_to_a_line() {
        let mut field = LatticeField::new(&[5]);
        let weights = Weights::builder().data_pos(1000.0).model_2(1.0).build();

        assert!(add_value_constraint(
            &mut field,
            &[0.0],
            0.0,
            weights.data_pos,
            ValueKernel::LinearInterp
        ));
        assert!(add_value_constraint(
            &mut field,
            &[4.0],
            4.0,
            weights.data_pos,
            ValueKernel::LinearInterp
        ));
        add_field_constraints(&mut field, &weights);

        let solution = solve_exact(field.num_unknowns(), &field.eq.triplets, &field.eq.rhs);
        assert_eq!(solution.len(), 5);
        for (i, &v) in solution.iter().enumerate() {
            assert!(
                (v - i as f32).abs() < 1e-3,
                "node {}: expected {}, got {}",
                i,
                i,
                v
            );
        }
    }

    #[test]
    fn strongly_weighted_node_values_are_recovered() {
        let values = [1.0f32, 2.0, -1.0, 0.5];
        let mut field = LatticeField::new(&[4]);
        let weights = Weights::builder().data_pos(1000.0).model_2(1.0).build();

        for (i, &v) in values.iter().enumerate() {
            assert!(add_value_constraint(
                &mut field,
                &[i as f32],
                v,
                weights.data_pos,
                ValueKernel::LinearInterp
            ));
        }
        add_field_constraints(&mut field, &weights);

        let solution = solve_exact(field.num_unknowns(), &field.eq.triplets, &field.eq.rhs);
        for (i, (&expected, &got)) in values.iter().zip(solution.iter()).enumerate() {
            assert!(
                (expected - got).abs() < 1e-4,
                "node {}: expected {}, got {}",
                i,
                expected,
                got
            );
        }
    }

    #[test]
    fn unconstrained_system_reports_failure() {
        let solution = solve_exact(4, &[], &[]);
        assert!(solution.is_empty());
    }

    #[test]
    fn strong_gradient_constraints_shape_the_slope() {
        use crate::constraints::add_gradient_constraint;
        use crate::field_config::GradientKernel;

        let mut field = LatticeField::new(&[6]);
        let weights = Weights::builder()
            .data_pos(1000.0)
            .data_gradient(1000.0)
            .model_2(1.0)
            .build();

        assert!(add_value_constraint(
            &mut field,
            &[0.0],
            0.0,
            weights.data_pos,
            ValueKernel::LinearInterp
        ));
        assert!(add_gradient_constraint(
            &mut field,
            &[2.5],
            &[3.0],
            weights.data_gradient,
            GradientKernel::NearestNeighbor
        ));
        add_field_constraints(&mut field, &weights);

        let solution = solve_exact(field.num_unknowns(), &field.eq.triplets, &field.eq.rhs);
        assert_eq!(solution.len(), 6);

        // The finite difference across the constrained edge matches the
        // requested gradient.
        assert!(
            (solution[3] - solution[2] - 3.0).abs() < 1e-3,
            "edge difference {} should be 3",
            solution[3] - solution[2]
        );
    }

    #[test]
    fn least_squares_matches_a_dense_reference() {
        use equator::assert;
        use faer::utils::approx::*;

        let mut rng = StdRng::seed_from_u64(42);
        let (m, n) = (12usize, 6usize);

        let mut triplets = Vec::new();
        let mut rhs = vec![0.0f32; m];

        // Diagonally dominant head keeps the normal matrix well-conditioned.
        for i in 0..n {
            triplets.push(Triplet::new(i as u32, i as u32, 2.0));
            rhs[i] = rng.random_range(-1.0..1.0);
        }
        for i in n..m {
            for j in 0..n {
                triplets.push(Triplet::new(i as u32, j as u32, rng.random_range(-1.0..1.0)));
            }
            rhs[i] = rng.random_range(-1.0..1.0);
        }

        let solution = solve_exact(n, &triplets, &rhs);
        assert!(solution.len() == n);

        // Dense reference: form AᵀA and Aᵀb explicitly and solve with LLᵀ.
        let mut a = Mat::<f64>::zeros(m, n);
        for t in &triplets {
            a[(t.row as usize, t.col as usize)] += t.coeff as f64;
        }
        let b = Mat::<f64>::from_fn(m, 1, |i, _| rhs[i] as f64);
        let ata = a.transpose() * &a;
        let atb = a.transpose() * &b;
        let x_dense = ata.llt(Side::Lower).unwrap().solve(&atb);

        let x_sparse = Mat::<f64>::from_fn(n, 1, |i, _| solution[i] as f64);
        // Generous tolerance: the sparse path returns f32 values.
        let approx_eq = CwiseMat(ApproxEq::eps() * 1e11);
        assert!(x_sparse ~ x_dense);
    }
}
