/////////////////////////////////////////////////////////////////////////////////////////////
//
// Restricts fine-lattice equations onto a coarse lattice and prolongates solutions back.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # restriction
//!
//! The grid-transfer half of the hierarchical solver. Restriction rewrites
//! each fine equation over coarse nodes by collapsing every referenced
//! fine node onto the coarse node that contains it, summing coefficients
//! that land together; weights and right-hand sides are untouched, so the
//! coarse system keeps the meaning of every row at the coarser scale.
//! Prolongation interpolates a coarse solution back to the fine lattice,
//! treating coarse node `i` as sitting at fine coordinate
//! `i * downscale_factor` and clamping past the last coarse node.

use crate::common::sample_multilinear;
use crate::equation::Triplet;
use crate::lattice::{self, decode_index, strides_for};
use crate::linalg::RowMajorSystem;

/// Coarse extents: integer division by the downscale factor, floored at
/// two nodes per axis (never exceeding the fine extent).
pub (crate) fn coarse_sizes(sizes: &[usize], factor: usize) -> Vec<usize> {
    sizes.iter().map(|&s| (s / factor).max(2).min(s)).collect()
}

/// Rewrites every row of the fine system over the coarse lattice.
///
/// Row indices are preserved so the fine right-hand side applies
/// unchanged. Coefficients of fine nodes that share a coarse node are
/// summed; a row may collapse to fewer entries (or to a single zero-sum
/// entry) without losing its slot.
pub (crate) fn restrict_equations(
    sys: &RowMajorSystem,
    fine_sizes: &[usize],
    coarse_sizes: &[usize],
    factor: usize,
) -> Vec<Triplet> {
    let dims = fine_sizes.len();
    let coarse_strides = strides_for(coarse_sizes);

    let mut out = Vec::with_capacity(sys.num_rows * 2);
    let mut fine_node = vec![0usize; dims];
    let mut row_entries: Vec<(u32, f32)> = Vec::new();

    for i in 0..sys.num_rows {
        let (cols, vals) = sys.row(i);

        row_entries.clear();
        for (&c, &v) in cols.iter().zip(vals) {
            decode_index(c as usize, fine_sizes, &mut fine_node);
            let coarse_flat: usize = (0..dims)
                .map(|d| (fine_node[d] / factor).min(coarse_sizes[d] - 1) * coarse_strides[d])
                .sum();

            match row_entries.iter_mut().find(|(cc, _)| *cc == coarse_flat as u32) {
                Some((_, acc)) => *acc += v,
                None => row_entries.push((coarse_flat as u32, v)),
            }
        }

        for &(c, v) in &row_entries {
            out.push(Triplet::new(i as u32, c, v));
        }
    }

    out
}

/// Interpolates a coarse solution to the fine lattice. Fine nodes beyond
/// the last coarse node clamp to the boundary value.
pub (crate) fn prolongate(
    coarse_field: &[f32],
    coarse_sizes: &[usize],
    fine_sizes: &[usize],
    factor: usize,
) -> Vec<f32> {
    let dims = fine_sizes.len();
    let coarse_strides = strides_for(coarse_sizes);

    let mut out = Vec::with_capacity(fine_sizes.iter().product());
    let mut pos = vec![0.0f64; dims];
    lattice::visit_nodes(fine_sizes, |node| {
        for d in 0..dims {
            pos[d] = node[d] as f64 / factor as f64;
        }
        out.push(sample_multilinear(coarse_field, coarse_sizes, &coarse_strides, &pos));
    });

    out
}
