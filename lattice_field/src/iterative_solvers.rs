/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements conjugate gradient refinement on the normal equations of the lattice system.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # iterative_solvers
//!
//! Conjugate gradient on the normal equations (CGNR). Each iteration needs
//! only one mat-vec with `A` and one with `Aᵀ`, so the assembled triplet
//! rows are used directly and `AᵀA` is never formed. The residual norm
//! `‖Ax − b‖` decreases monotonically, which makes a plateau test a safe
//! stopping criterion.
//!
//! # References
//! 1.  Å. Björck. Numerical Methods for Least Squares Problems. SIAM, 1996.

use crate::linalg::RowMajorSystem;
use crate::progress::{ProgressMsg, ProgressSink, reduction_progress};
use std::sync::Arc;

/// Iteration cap for one refinement call. The starting guess from the
/// coarse solve already carries the low-frequency modes, so refinement
/// only has to clean up local detail.
const MAX_ITERATIONS: usize = 500;

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Refines `x0` toward the least-squares solution of `A x = b`.
///
/// Iterations stop once one of them improves the residual norm by less
/// than `error_tolerance * ‖b‖`, or at a fixed cap.
///
/// # Parameters
/// - `sys`: The assembled system rows
/// - `rhs`: Right-hand side vector
/// - `x0`: Initial guess, typically a prolongated coarse solution
/// - `error_tolerance`: Stopping criterion
/// - `callback`: Optional sink for per-iteration residuals
///
/// # Returns
/// - `x`: Refined solution
pub (crate) fn conjugate_gradient_normal(
    sys: &RowMajorSystem,
    rhs: &[f32],
    x0: &[f32],
    error_tolerance: f32,
    callback: Option<&Arc<dyn ProgressSink>>,
) -> Vec<f32> {
    let (m, n) = (sys.num_rows, sys.num_cols);

    let mut x: Vec<f64> = x0.iter().map(|&v| v as f64).collect();
    let b: Vec<f64> = rhs.iter().map(|&v| v as f64).collect();

    // r = b - A x
    let mut r = vec![0.0f64; m];
    sys.matvec(&x, &mut r);
    for (ri, bi) in r.iter_mut().zip(&b) {
        *ri = bi - *ri;
    }

    // s = Aᵀ r is the steepest-descent direction of ½‖Ax − b‖².
    let mut s = vec![0.0f64; n];
    sys.matvec_transpose(&r, &mut s);

    let mut p = s.clone();
    let mut gamma = dot(&s, &s);

    let b_norm = norm(&b);
    let r0_norm = norm(&r);
    let mut prev_res = r0_norm;
    let threshold = error_tolerance as f64 * b_norm;

    let mut q = vec![0.0f64; m];

    for iter in 1..=MAX_ITERATIONS {
        if gamma == 0.0 {
            break;
        }

        sys.matvec(&p, &mut q);
        let q_energy = dot(&q, &q);
        if q_energy == 0.0 {
            break;
        }

        let alpha = gamma / q_energy;
        for (xi, pi) in x.iter_mut().zip(&p) {
            *xi += alpha * pi;
        }
        for (ri, qi) in r.iter_mut().zip(&q) {
            *ri -= alpha * qi;
        }

        let res = norm(&r);

        if let Some(sink) = callback {
            sink.emit(ProgressMsg::SolverIteration {
                iter,
                residual: res,
                progress: reduction_progress(res, r0_norm, threshold.max(f64::MIN_POSITIVE)),
            });
        }

        if prev_res - res < threshold {
            break;
        }
        prev_res = res;

        sys.matvec_transpose(&r, &mut s);
        let gamma_next = dot(&s, &s);
        let beta = gamma_next / gamma;
        for (pi, si) in p.iter_mut().zip(&s) {
            *pi = si + beta * *pi;
        }
        gamma = gamma_next;
    }

    x.iter().map(|&v| v as f32).collect()
}
