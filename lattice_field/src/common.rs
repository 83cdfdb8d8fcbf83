/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for multilinear field resampling and residual diagnostics.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::equation::Triplet;
use crate::lattice::{self, strides_for};
use crate::linalg::RowMajorSystem;

/// Samples a lattice field at a real-valued position by multilinear
/// interpolation. Positions outside the lattice clamp to the edges.
pub (crate) fn sample_multilinear(
    field: &[f32],
    sizes: &[usize],
    strides: &[usize],
    pos: &[f64],
) -> f32 {
    let dims = sizes.len();
    let mut base = vec![0usize; dims];
    let mut frac = vec![0.0f64; dims];

    for d in 0..dims {
        let s = sizes[d];
        let p = pos[d].clamp(0.0, (s - 1) as f64);
        let i = (p.floor() as usize).min(s.saturating_sub(2));
        base[d] = i;
        frac[d] = p - i as f64;
    }

    let mut acc = 0.0f64;
    for mask in 0..1usize << dims {
        let mut w = 1.0f64;
        for d in 0..dims {
            w *= match (mask >> d) & 1 == 1 {
                true => frac[d],
                false => 1.0 - frac[d],
            };
        }
        if w == 0.0 {
            continue;
        }
        let flat: usize = (0..dims)
            .map(|d| (base[d] + ((mask >> d) & 1)) * strides[d])
            .sum();
        acc += w * field[flat] as f64;
    }

    acc as f32
}

/// Resamples a dense field from `small_sizes` to `large_sizes` by
/// multilinear interpolation, mapping lattice endpoints onto endpoints and
/// clamping at the edges. Identical sizes reproduce the input exactly.
pub fn upsample_field(field: &[f32], small_sizes: &[usize], large_sizes: &[usize]) -> Vec<f32> {
    assert_eq!(
        small_sizes.len(),
        large_sizes.len(),
        "Source and target lattices must share a rank"
    );
    assert_eq!(
        field.len(),
        small_sizes.iter().product::<usize>(),
        "Field length must match the source lattice"
    );

    let dims = small_sizes.len();
    let small_strides = strides_for(small_sizes);

    let scale: Vec<f64> = (0..dims)
        .map(|d| match large_sizes[d] > 1 {
            true => (small_sizes[d] as f64 - 1.0) / (large_sizes[d] as f64 - 1.0),
            false => 0.0,
        })
        .collect();

    let mut out = Vec::with_capacity(large_sizes.iter().product());
    let mut pos = vec![0.0f64; dims];
    lattice::visit_nodes(large_sizes, |node| {
        for d in 0..dims {
            pos[d] = node[d] as f64 * scale[d];
        }
        out.push(sample_multilinear(field, small_sizes, &small_strides, &pos));
    });

    out
}

/// Distributes each row's squared residual `(Ax - b)_i²` over the unknowns
/// the row touches, proportionally to the magnitude of their coefficients.
/// The result is a per-node "blame" map of where the solution disagrees
/// with its constraints.
pub fn generate_error_map(triplets: &[Triplet], solution: &[f32], rhs: &[f32]) -> Vec<f32> {
    let sys = RowMajorSystem::from_triplets(rhs.len(), solution.len(), triplets);

    let mut out = vec![0.0f32; solution.len()];

    for i in 0..sys.num_rows {
        let (cols, vals) = sys.row(i);

        let mut prediction = 0.0f64;
        let mut total_weight = 0.0f64;
        for (&c, &v) in cols.iter().zip(vals) {
            prediction += v as f64 * solution[c as usize] as f64;
            total_weight += (v as f64).abs();
        }
        if total_weight == 0.0 {
            continue;
        }

        let residual = prediction - rhs[i] as f64;
        let blame = residual * residual;
        for (&c, &v) in cols.iter().zip(vals) {
            out[c as usize] += (blame * (v as f64).abs() / total_weight) as f32;
        }
    }

    out
}
