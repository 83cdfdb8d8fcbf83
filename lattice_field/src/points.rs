/////////////////////////////////////////////////////////////////////////////////////////////
//
// Adds batch helpers that splat whole point clouds of surface samples onto a lattice.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # points
//!
//! Batch constraint helpers for point clouds of surface samples. Each point
//! is taken to lie on the `f = 0` iso-surface, with an optional normal
//! giving the field gradient there. Positions are interleaved lattice-unit
//! coordinates (`x y x y ...`); the caller pre-scales them.

use crate::constraints::{
    add_gradient_constraint, add_value_constraint, add_value_constraint_nearest_neighbor,
};
use crate::field_config::{GradientKernel, ValueKernel, Weights};
use crate::lattice::LatticeField;
use crate::model::add_field_constraints;

/// Splats a batch of surface samples onto the lattice: a value constraint
/// `f = 0` per point, and a gradient constraint per point when normals are
/// provided.
///
/// `point_weights`, when given, scales both constraint weights per point.
/// Points outside the lattice are skipped, as are zero-weighted
/// constraints.
pub fn add_points(
    field: &mut LatticeField,
    value_weight: f32,
    value_kernel: ValueKernel,
    gradient_weight: f32,
    gradient_kernel: GradientKernel,
    positions: &[f32],
    normals: Option<&[f32]>,
    point_weights: Option<&[f32]>,
) {
    let dims = field.num_dims();
    assert!(
        positions.len() % dims == 0,
        "Positions must hold {} interleaved coordinates per point",
        dims
    );
    let num_points = positions.len() / dims;

    if let Some(normals) = normals {
        assert_eq!(
            normals.len(),
            positions.len(),
            "Normals must match positions in length"
        );
    }
    if let Some(point_weights) = point_weights {
        assert_eq!(
            point_weights.len(),
            num_points,
            "Per-point weights must hold one entry per point"
        );
    }

    let zero_gradient = vec![0.0f32; dims];

    for i in 0..num_points {
        let pos = &positions[i * dims..(i + 1) * dims];
        let normal = normals.map(|n| &n[i * dims..(i + 1) * dims]);
        let point_weight = point_weights.map_or(1.0, |w| w[i]);

        let vw = value_weight * point_weight;
        if vw > 0.0 {
            match value_kernel {
                ValueKernel::LinearInterp => {
                    add_value_constraint(field, pos, 0.0, vw, ValueKernel::LinearInterp);
                }
                ValueKernel::NearestNeighbor => {
                    // Extrapolate along the normal so the nearest node gets
                    // its signed offset from the surface.
                    let gradient = normal.unwrap_or(&zero_gradient);
                    add_value_constraint_nearest_neighbor(field, pos, gradient, 0.0, vw);
                }
            }
        }

        let gw = gradient_weight * point_weight;
        if gw > 0.0 {
            if let Some(normal) = normal {
                add_gradient_constraint(field, pos, normal, gw, gradient_kernel);
            }
        }
    }
}

/// Builds a field whose `f = 0` iso-surface tracks the given surface
/// samples: splats the points per the kernel and weight configuration,
/// then appends the model constraints.
///
/// The resulting distances are arbitrarily scaled and only accurate near
/// the surface, which is sufficient for iso-surface extraction.
pub fn sdf_from_points(
    sizes: &[usize],
    weights: &Weights,
    positions: &[f32],
    normals: Option<&[f32]>,
    point_weights: Option<&[f32]>,
) -> LatticeField {
    let mut field = LatticeField::new(sizes);
    add_points(
        &mut field,
        weights.data_pos,
        weights.value_kernel,
        weights.data_gradient,
        weights.gradient_kernel,
        positions,
        normals,
        point_weights,
    );
    add_field_constraints(&mut field, weights);
    field
}
