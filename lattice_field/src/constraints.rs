/////////////////////////////////////////////////////////////////////////////////////////////
//
// Compiles value and gradient constraints at real-valued positions into weighted stencil rows.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # constraints
//!
//! Translates data constraints into sparse equation rows.
//!
//! The field value at a non-integer lattice position is a linear
//! combination of the surrounding node values, so any linear constraint on
//! `f` or `∇f` at that position becomes a single linear equation over those
//! nodes. Positions are given in lattice units: node `i` sits at coordinate
//! `i` along its axis.
//!
//! Constraints whose stencil would reach outside the lattice are dropped
//! and reported through the `bool` return value. That is expected behavior
//! when splatting point clouds near the boundary, not an error.

use crate::field_config::{GradientKernel, ValueKernel};
use crate::lattice::LatticeField;

/// Maximum rank supported by the interpolating kernels. Their corner
/// fan-out is `2^D` entries per equation, which stops being practical
/// beyond three axes. The nearest-neighbor kernels work for any rank.
pub const MAX_FANOUT_DIM: usize = 3;

/// Where a position falls along one axis: the origin coordinate of its
/// cell, the fractional offset past it, and which stencil anchors the
/// axis can supply. Kept per axis so that stencil emitters can skip
/// individual axes instead of the whole constraint.
struct AxisLocation {
    /// Origin node of the containing cell, clamped to the last cell.
    origin: usize,

    /// Fractional offset of the position past the origin.
    frac: f64,

    /// The origin addresses a valid node on this axis.
    node_ok: bool,

    /// The axis hosts a full cell at the origin.
    cell_ok: bool,
}

/// Locates `pos` along every axis independently, or `None` when a
/// coordinate is not finite.
///
/// A position exactly on the far boundary belongs to the last cell with a
/// fractional offset of one, so boundary nodes remain addressable. A
/// one-node axis never hosts a cell, but still addresses its node when
/// the position sits on it.
fn locate_axes(field: &LatticeField, pos: &[f32]) -> Option<Vec<AxisLocation>> {
    let mut axes = Vec::with_capacity(field.num_dims());

    for (d, &size) in field.sizes.iter().enumerate() {
        let p = pos[d] as f64;
        if !p.is_finite() {
            return None;
        }

        let location = match size >= 2 {
            true => {
                let origin = (p.floor() as i64).min(size as i64 - 2);
                let frac = p - origin as f64;
                let ok = origin >= 0 && (0.0..=1.0).contains(&frac);
                AxisLocation {
                    origin: origin.max(0) as usize,
                    frac,
                    node_ok: ok,
                    cell_ok: ok,
                }
            }
            false => AxisLocation {
                origin: 0,
                frac: 0.0,
                node_ok: p == 0.0,
                cell_ok: false,
            },
        };
        axes.push(location);
    }

    Some(axes)
}

/// The cell containing a query position: its origin node and the
/// fractional offset of the position within the cell, per axis.
struct Cell {
    origin: Vec<usize>,
    frac: Vec<f64>,
}

/// Locates the cell containing `pos`, or `None` when any axis falls
/// outside the lattice (or on a degenerate one-node axis). The
/// interpolating value kernel spans all axes at once, so its constraint
/// is all-or-nothing.
fn containing_cell(field: &LatticeField, pos: &[f32]) -> Option<Cell> {
    let axes = locate_axes(field, pos)?;
    match axes.iter().all(|axis| axis.cell_ok) {
        true => Some(Cell {
            origin: axes.iter().map(|axis| axis.origin).collect(),
            frac: axes.iter().map(|axis| axis.frac).collect(),
        }),
        false => None,
    }
}

/// Multilinear weight of the cell corner selected by `mask` (bit `d` set
/// means offset one along axis `d`).
#[inline]
fn corner_weight(frac: &[f64], mask: usize) -> f64 {
    frac.iter()
        .enumerate()
        .map(|(d, &t)| match (mask >> d) & 1 == 1 {
            true => t,
            false => 1.0 - t,
        })
        .product()
}

#[inline]
fn corner_node(origin: &[usize], mask: usize, node: &mut [usize]) {
    for (d, &o) in origin.iter().enumerate() {
        node[d] = o + ((mask >> d) & 1);
    }
}

/// Adds the value constraint `f(pos) = value`.
///
/// With [`ValueKernel::LinearInterp`] the constraint becomes one equation
/// over the corners of the containing cell, weighted multilinearly. With
/// [`ValueKernel::NearestNeighbor`] the value is applied to the closest
/// node as-is; use [`add_value_constraint_nearest_neighbor`] when the
/// local gradient is known and the value should be extrapolated to the
/// node.
///
/// Returns `false` if the position was outside the lattice and no
/// equation was emitted.
pub fn add_value_constraint(
    field: &mut LatticeField,
    pos: &[f32],
    value: f32,
    weight: f32,
    kernel: ValueKernel,
) -> bool {
    let dims = field.num_dims();
    assert_eq!(pos.len(), dims, "Position rank must match the lattice rank");

    match kernel {
        ValueKernel::LinearInterp => {
            assert!(
                dims <= MAX_FANOUT_DIM,
                "The interpolating value kernel supports at most {} axes, got {}",
                MAX_FANOUT_DIM,
                dims
            );
            add_value_linear(field, pos, value, weight)
        }
        ValueKernel::NearestNeighbor => {
            let zero_gradient = vec![0.0f32; dims];
            add_value_nearest(field, pos, &zero_gradient, value, weight)
        }
    }
}

/// Adds the constraint `f(pos) = value` to the nearest lattice node, with
/// the value offset by `gradient · (node - pos)` to first order.
///
/// This produces a single-entry equation, so it keeps the system sparser
/// than the interpolating kernel and works for any lattice rank.
///
/// Returns `false` iff the rounded node is outside the lattice.
pub fn add_value_constraint_nearest_neighbor(
    field: &mut LatticeField,
    pos: &[f32],
    gradient: &[f32],
    value: f32,
    weight: f32,
) -> bool {
    let dims = field.num_dims();
    assert_eq!(pos.len(), dims, "Position rank must match the lattice rank");
    assert_eq!(gradient.len(), dims, "Gradient rank must match the lattice rank");

    add_value_nearest(field, pos, gradient, value, weight)
}

fn add_value_linear(field: &mut LatticeField, pos: &[f32], value: f32, weight: f32) -> bool {
    let dims = field.num_dims();
    let cell = match containing_cell(field, pos) {
        Some(cell) => cell,
        None => return false,
    };

    let mut entries = Vec::with_capacity(1 << dims);
    let mut node = vec![0usize; dims];

    for mask in 0..1usize << dims {
        let w = corner_weight(&cell.frac, mask);
        if w == 0.0 {
            continue;
        }
        corner_node(&cell.origin, mask, &mut node);
        entries.push((field.flat_index(&node), w as f32));
    }

    field.eq.add_row(weight, value, &entries);
    true
}

fn add_value_nearest(
    field: &mut LatticeField,
    pos: &[f32],
    gradient: &[f32],
    value: f32,
    weight: f32,
) -> bool {
    let dims = field.num_dims();
    let mut node = vec![0i64; dims];

    for d in 0..dims {
        let p = pos[d] as f64;
        if !p.is_finite() {
            return false;
        }
        node[d] = p.round() as i64;
    }

    let col = match field.checked_flat_index(&node) {
        Some(col) => col,
        None => return false,
    };

    let mut rhs = value as f64;
    for d in 0..dims {
        rhs += gradient[d] as f64 * (node[d] as f64 - pos[d] as f64);
    }

    field.eq.add_row(weight, rhs as f32, &[(col, 1.0)]);
    true
}

/// Adds the gradient constraint `∇f(pos) = gradient`: one first-difference
/// equation per axis, over the edges of the containing cell.
///
/// An axis whose stencil would reach outside the lattice is skipped
/// silently; the call returns `false` only when every axis skipped and no
/// equation was emitted.
pub fn add_gradient_constraint(
    field: &mut LatticeField,
    pos: &[f32],
    gradient: &[f32],
    weight: f32,
    kernel: GradientKernel,
) -> bool {
    let dims = field.num_dims();
    assert_eq!(pos.len(), dims, "Position rank must match the lattice rank");
    assert_eq!(gradient.len(), dims, "Gradient rank must match the lattice rank");

    if !matches!(kernel, GradientKernel::NearestNeighbor) {
        assert!(
            dims <= MAX_FANOUT_DIM,
            "The {:?} gradient kernel supports at most {} axes, got {}",
            kernel,
            MAX_FANOUT_DIM,
            dims
        );
    }

    let axes = match locate_axes(field, pos) {
        Some(axes) => axes,
        None => return false,
    };
    let origin: Vec<usize> = axes.iter().map(|axis| axis.origin).collect();

    let mut node = vec![0usize; dims];
    let mut emitted = false;

    for d in 0..dims {
        // The axis-d difference always needs the edge along d itself.
        if !axes[d].cell_ok {
            continue;
        }

        match kernel {
            GradientKernel::NearestNeighbor => {
                // f(c + e_d) - f(c) = g[d] on the cell's origin edge. The
                // stencil anchors on the origin, which every other axis
                // must be able to address as a node.
                if !(0..dims).all(|a| a == d || axes[a].node_ok) {
                    continue;
                }
                let lo = field.flat_index(&origin);
                node.copy_from_slice(&origin);
                node[d] += 1;
                let hi = field.flat_index(&node);
                field.eq.add_row(weight, gradient[d], &[(lo, -1.0), (hi, 1.0)]);
                emitted = true;
            }
            GradientKernel::CellEdges => {
                // Sum of all 2^(D-1) axis-d edge differences of the cell:
                // every corner appears once, signed by its offset along d.
                // The stencil spans the whole cell, so every axis must
                // host one.
                if !(0..dims).all(|a| axes[a].cell_ok) {
                    continue;
                }
                let mut entries = Vec::with_capacity(1 << dims);
                for mask in 0..1usize << dims {
                    corner_node(&origin, mask, &mut node);
                    let sign = match (mask >> d) & 1 == 1 {
                        true => 1.0,
                        false => -1.0,
                    };
                    entries.push((field.flat_index(&node), sign));
                }
                let rhs = (1usize << (dims - 1)) as f32 * gradient[d];
                field.eq.add_row(weight, rhs, &entries);
                emitted = true;
            }
            GradientKernel::LinearInterp => {
                // Blend the axis-d edge differences by the multilinear
                // weights of the position within the perpendicular face.
                // An axis pinned to a node puts zero weight on its far
                // corners, which are dropped before they are addressed.
                if !(0..dims).all(|a| a == d || axes[a].node_ok) {
                    continue;
                }
                let mut entries = Vec::with_capacity(1 << dims);
                for mask in 0..1usize << dims {
                    let mut w = 1.0f64;
                    for a in 0..dims {
                        if a == d {
                            continue;
                        }
                        w *= match (mask >> a) & 1 == 1 {
                            true => axes[a].frac,
                            false => 1.0 - axes[a].frac,
                        };
                    }
                    if w == 0.0 {
                        continue;
                    }
                    corner_node(&origin, mask, &mut node);
                    let signed = match (mask >> d) & 1 == 1 {
                        true => w,
                        false => -w,
                    };
                    entries.push((field.flat_index(&node), signed as f32));
                }
                field.eq.add_row(weight, gradient[d], &entries);
                emitted = true;
            }
        }
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::Triplet;

    fn entries_of_row(field: &LatticeField, row: u32) -> Vec<Triplet> {
        field
            .eq
            .triplets
            .iter()
            .copied()
            .filter(|t| t.row == row)
            .collect()
    }

    #[test]
    fn value_interp_1d_between_nodes() {
        let mut field = LatticeField::new(&[3]);
        assert!(add_value_constraint(
            &mut field,
            &[1.25],
            10.0,
            1.0,
            ValueKernel::LinearInterp
        ));

        let mut row = entries_of_row(&field, 0);
        row.sort_by_key(|t| t.col);
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].col, 1);
        assert!((row[0].coeff - 0.75).abs() < 1e-6);
        assert_eq!(row[1].col, 2);
        assert!((row[1].coeff - 0.25).abs() < 1e-6);
        assert_eq!(field.eq.rhs, vec![10.0]);
    }

    #[test]
    fn value_interp_corner_weights_sum_to_one() {
        let mut field = LatticeField::new(&[4, 4]);
        assert!(add_value_constraint(
            &mut field,
            &[0.5, 1.25],
            3.0,
            1.0,
            ValueKernel::LinearInterp
        ));

        let row = entries_of_row(&field, 0);
        assert_eq!(row.len(), 4, "interior positions fan out to 2^D corners");
        let total: f32 = row.iter().map(|t| t.coeff).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn value_interp_accepts_the_far_boundary_node() {
        let mut field = LatticeField::new(&[5]);
        assert!(add_value_constraint(
            &mut field,
            &[4.0],
            4.0,
            1.0,
            ValueKernel::LinearInterp
        ));

        let row = entries_of_row(&field, 0);
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].col, 4);
        assert!((row[0].coeff - 1.0).abs() < 1e-6);
    }

    #[test]
    fn value_interp_rejects_outside_positions() {
        let mut field = LatticeField::new(&[5]);
        assert!(!add_value_constraint(
            &mut field,
            &[-0.5],
            1.0,
            1.0,
            ValueKernel::LinearInterp
        ));
        assert!(!add_value_constraint(
            &mut field,
            &[4.5],
            1.0,
            1.0,
            ValueKernel::LinearInterp
        ));
        assert!(!add_value_constraint(
            &mut field,
            &[f32::NAN],
            1.0,
            1.0,
            ValueKernel::LinearInterp
        ));
        assert_eq!(field.eq.num_rows(), 0);
    }

    #[test]
    fn value_nearest_extrapolates_along_the_gradient() {
        let mut field = LatticeField::new(&[4]);
        assert!(add_value_constraint_nearest_neighbor(
            &mut field,
            &[1.3],
            &[2.0],
            10.0,
            1.0
        ));

        let row = entries_of_row(&field, 0);
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].col, 1);
        // Node 1 sits 0.3 units behind the sample, so the value backs off
        // by 0.3 * gradient.
        assert!((field.eq.rhs[0] - 9.4).abs() < 1e-5);
    }

    #[test]
    fn value_nearest_rejects_rounded_nodes_outside() {
        let mut field = LatticeField::new(&[4]);
        assert!(!add_value_constraint_nearest_neighbor(
            &mut field,
            &[3.6],
            &[0.0],
            1.0,
            1.0
        ));
        assert_eq!(field.eq.num_rows(), 0);
    }

    #[test]
    fn gradient_nearest_emits_one_edge_difference_per_axis() {
        let mut field = LatticeField::new(&[3, 3]);
        assert!(add_gradient_constraint(
            &mut field,
            &[1.0, 1.0],
            &[1.0, 0.0],
            1.0,
            GradientKernel::NearestNeighbor
        ));

        assert_eq!(field.eq.num_rows(), 2);

        // Axis x: f(2,1) - f(1,1) = 1.
        let mut row_x = entries_of_row(&field, 0);
        row_x.sort_by_key(|t| t.col);
        assert_eq!(row_x.len(), 2);
        assert_eq!((row_x[0].col, row_x[0].coeff), (4, -1.0));
        assert_eq!((row_x[1].col, row_x[1].coeff), (5, 1.0));
        assert_eq!(field.eq.rhs[0], 1.0);

        // Axis y: f(1,2) - f(1,1) = 0.
        let mut row_y = entries_of_row(&field, 1);
        row_y.sort_by_key(|t| t.col);
        assert_eq!((row_y[0].col, row_y[0].coeff), (4, -1.0));
        assert_eq!((row_y[1].col, row_y[1].coeff), (7, 1.0));
        assert_eq!(field.eq.rhs[1], 0.0);
    }

    #[test]
    fn gradient_rows_have_balanced_coefficients() {
        for kernel in [
            GradientKernel::NearestNeighbor,
            GradientKernel::CellEdges,
            GradientKernel::LinearInterp,
        ] {
            let mut probe = LatticeField::new(&[4, 4]);
            assert!(add_gradient_constraint(
                &mut probe,
                &[1.4, 2.7],
                &[1.0, -2.0],
                1.0,
                kernel
            ));
            assert_eq!(probe.eq.num_rows(), 2, "{:?}: one equation per axis", kernel);
            for row in 0..2u32 {
                let total: f32 = probe
                    .eq
                    .triplets
                    .iter()
                    .filter(|t| t.row == row)
                    .map(|t| t.coeff)
                    .sum();
                assert!(
                    total.abs() < 1e-6,
                    "{:?}: difference stencils must sum to zero",
                    kernel
                );
            }
        }
    }

    #[test]
    fn gradient_cell_edges_sums_every_edge_of_the_cell() {
        let mut field = LatticeField::new(&[3, 3]);
        assert!(add_gradient_constraint(
            &mut field,
            &[0.5, 0.5],
            &[3.0, 0.0],
            1.0,
            GradientKernel::CellEdges
        ));

        // Axis x: both horizontal edge differences, so the rhs doubles.
        let row = entries_of_row(&field, 0);
        assert_eq!(row.len(), 4);
        assert!(row.iter().all(|t| t.coeff.abs() == 1.0));
        assert_eq!(field.eq.rhs[0], 6.0);
    }

    #[test]
    fn gradient_interp_blends_edges_by_face_weights() {
        let mut field = LatticeField::new(&[3, 3]);
        assert!(add_gradient_constraint(
            &mut field,
            &[0.25, 0.75],
            &[1.0, 0.0],
            1.0,
            GradientKernel::LinearInterp
        ));

        // Axis x: bottom edge carries 1 - t_y = 0.25, top edge 0.75.
        let mut row = entries_of_row(&field, 0);
        row.sort_by_key(|t| t.col);
        let coeffs: Vec<(u32, f32)> = row.iter().map(|t| (t.col, t.coeff)).collect();
        assert_eq!(coeffs.len(), 4);
        assert_eq!(coeffs[0].0, 0);
        assert!((coeffs[0].1 + 0.25).abs() < 1e-6);
        assert_eq!(coeffs[1].0, 1);
        assert!((coeffs[1].1 - 0.25).abs() < 1e-6);
        assert_eq!(coeffs[2].0, 3);
        assert!((coeffs[2].1 + 0.75).abs() < 1e-6);
        assert_eq!(coeffs[3].0, 4);
        assert!((coeffs[3].1 - 0.75).abs() < 1e-6);
        assert_eq!(field.eq.rhs[0], 1.0);
    }

    #[test]
    fn gradient_outside_the_lattice_is_ignored() {
        let mut field = LatticeField::new(&[3, 3]);
        assert!(!add_gradient_constraint(
            &mut field,
            &[2.5, 1.0],
            &[1.0, 1.0],
            1.0,
            GradientKernel::CellEdges
        ));
        assert_eq!(field.eq.num_rows(), 0);
    }

    #[test]
    fn gradient_axes_skip_independently() {
        // A one-node axis cannot host an edge, but the other axis still
        // emits its difference equation.
        let mut field = LatticeField::new(&[1, 5]);
        assert!(add_gradient_constraint(
            &mut field,
            &[0.0, 2.5],
            &[1.0, 2.0],
            1.0,
            GradientKernel::NearestNeighbor
        ));
        assert_eq!(field.eq.num_rows(), 1);

        let mut row = entries_of_row(&field, 0);
        row.sort_by_key(|t| t.col);
        assert_eq!((row[0].col, row[0].coeff), (2, -1.0));
        assert_eq!((row[1].col, row[1].coeff), (3, 1.0));
        assert_eq!(field.eq.rhs, vec![2.0]);

        // The blended kernel drops the zero-weight corners of the pinned
        // axis and keeps the same edge difference.
        let mut interp = LatticeField::new(&[1, 5]);
        assert!(add_gradient_constraint(
            &mut interp,
            &[0.0, 2.5],
            &[1.0, 2.0],
            1.0,
            GradientKernel::LinearInterp
        ));
        assert_eq!(interp.eq.num_rows(), 1);
        let mut interp_row = entries_of_row(&interp, 0);
        interp_row.sort_by_key(|t| t.col);
        assert_eq!((interp_row[0].col, interp_row[0].coeff), (2, -1.0));
        assert_eq!((interp_row[1].col, interp_row[1].coeff), (3, 1.0));

        // The summed-edge kernel needs a full cell on every axis, so it
        // has nothing left to emit.
        let mut edges = LatticeField::new(&[1, 5]);
        assert!(!add_gradient_constraint(
            &mut edges,
            &[0.0, 2.5],
            &[1.0, 2.0],
            1.0,
            GradientKernel::CellEdges
        ));
        assert_eq!(edges.eq.num_rows(), 0);

        // Off the one-node axis the position is outside the lattice and
        // every axis skips.
        let mut off = LatticeField::new(&[1, 5]);
        assert!(!add_gradient_constraint(
            &mut off,
            &[0.5, 2.5],
            &[1.0, 2.0],
            1.0,
            GradientKernel::NearestNeighbor
        ));
        assert_eq!(off.eq.num_rows(), 0);
    }

    #[test]
    fn nearest_neighbor_kernels_work_beyond_three_axes() {
        let mut field = LatticeField::new(&[3, 3, 3, 3]);
        assert!(add_value_constraint(
            &mut field,
            &[1.2, 0.4, 2.0, 1.0],
            5.0,
            1.0,
            ValueKernel::NearestNeighbor
        ));
        assert!(add_gradient_constraint(
            &mut field,
            &[1.2, 0.4, 1.6, 1.0],
            &[1.0, 0.0, 0.0, 0.0],
            1.0,
            GradientKernel::NearestNeighbor
        ));
        assert_eq!(field.eq.num_rows(), 5);
    }
}
