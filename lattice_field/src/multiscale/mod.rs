/////////////////////////////////////////////////////////////////////////////////////////////
//
// Orchestrates the hierarchical approximate solver: coarsen, solve, prolongate, refine.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # multiscale
//!
//! Approximate solver for equation systems assembled on a lattice. A
//! direct solve of the full system is memory-bound for large lattices, so
//! the system is first restricted to a coarse lattice and solved there,
//! which captures the low-frequency modes cheaply. The prolongated coarse
//! solution then seeds conjugate gradient refinement, which only needs
//! mat-vecs with the original sparse rows and converges quickly because
//! mostly local detail remains. Refinement can run globally or on
//! independent overlapping tiles.

mod restriction;
mod tiling;

use std::sync::Arc;

use crate::config::SolveOptions;
use crate::equation::Triplet;
use crate::iterative_solvers::conjugate_gradient_normal;
use crate::linalg::{RowMajorSystem, solve_exact};
use crate::progress::{ProgressMsg, ProgressSink};

use restriction::{coarse_sizes, prolongate, restrict_equations};
use tiling::solve_tiled;

/// Approximately solves the lattice system in the least-squares sense.
///
/// Returns the field at the fine lattice sizes, or an empty vector when
/// the coarse direct solve fails and no refinement stage is enabled to
/// recover from it.
pub fn solve_approximate(
    triplets: &[Triplet],
    rhs: &[f32],
    sizes: &[usize],
    options: &SolveOptions,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Vec<f32> {
    assert!(!sizes.is_empty(), "A lattice needs at least one axis");
    options.validate();

    let num_unknowns: usize = sizes.iter().product();
    let sys = RowMajorSystem::from_triplets(rhs.len(), num_unknowns, triplets);

    let coarse = coarse_sizes(sizes, options.downscale_factor);

    let guess = if coarse == sizes {
        // The lattice is already at the coarse floor; the direct solve is
        // the whole answer unless it fails.
        let solution = solve_exact(num_unknowns, triplets, rhs);
        match solution.is_empty() {
            false => return solution,
            true => match options.cg || options.tile {
                true => vec![0.0f32; num_unknowns],
                false => return Vec::new(),
            },
        }
    } else {
        let coarse_triplets = restrict_equations(&sys, sizes, &coarse, options.downscale_factor);
        let coarse_unknowns: usize = coarse.iter().product();
        let coarse_solution = solve_exact(coarse_unknowns, &coarse_triplets, rhs);

        match coarse_solution.is_empty() {
            false => prolongate(&coarse_solution, &coarse, sizes, options.downscale_factor),
            true => match options.cg || options.tile {
                true => {
                    if let Some(sink) = &progress {
                        sink.emit(ProgressMsg::Message {
                            message: "Coarse solve failed; refining from a zero field".to_string(),
                        });
                    }
                    vec![0.0f32; num_unknowns]
                }
                false => return Vec::new(),
            },
        }
    };

    if options.tile {
        solve_tiled(&sys, rhs, sizes, &guess, options, progress)
    } else if options.cg {
        conjugate_gradient_normal(&sys, rhs, &guess, options.error_tolerance, progress.as_ref())
    } else {
        guess
    }
}
