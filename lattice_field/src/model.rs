/////////////////////////////////////////////////////////////////////////////////////////////
//
// Emits finite-difference smoothness equations over every node and cell of the lattice.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # model
//!
//! Generates the model constraints: equations with zero right-hand side
//! that express a smoothness prior on the field. Each smoothness order `k`
//! asks the discrete `k`-th derivative to vanish along every axis, using
//! the binomial stencil with alternating signs. Stencils that would reach
//! outside the lattice are not emitted.
//!
//! Row order is an implementation detail; it is observable only through
//! iterative solvers and callers must not rely on it.

use crate::equation::LinearEquation;
use crate::field_config::Weights;
use crate::lattice::{self, LatticeField, flat_index_of};

/// Appends every model equation for the given weights. Zero-weight orders
/// contribute nothing.
pub fn add_field_constraints(field: &mut LatticeField, weights: &Weights) {
    let sizes = field.sizes.clone();
    let strides = field.strides.clone();
    let dims = sizes.len();
    let eq = &mut field.eq;

    let any_node_order = weights.model_0 != 0.0
        || weights.model_1 != 0.0
        || weights.model_2 != 0.0
        || weights.model_3 != 0.0
        || weights.model_4 != 0.0;

    if any_node_order {
        lattice::visit_nodes(&sizes, |node| {
            let base = flat_index_of(node, &strides);

            if weights.model_0 != 0.0 {
                // f = 0
                eq.add_row(weights.model_0, 0.0, &[(base, 1.0)]);
            }

            for d in 0..dims {
                let n = node[d];
                let size = sizes[d];
                let step = strides[d];

                if weights.model_1 != 0.0 && n + 1 < size {
                    // f' = 0
                    eq.add_row(
                        weights.model_1,
                        0.0,
                        &[(base, -1.0), (base + step, 1.0)],
                    );
                }

                if weights.model_2 != 0.0 && n >= 1 && n + 1 < size {
                    // f'' = 0
                    eq.add_row(
                        weights.model_2,
                        0.0,
                        &[(base - step, 1.0), (base, -2.0), (base + step, 1.0)],
                    );
                }

                if weights.model_3 != 0.0 && n + 3 < size {
                    // f''' = 0
                    eq.add_row(
                        weights.model_3,
                        0.0,
                        &[
                            (base, -1.0),
                            (base + step, 3.0),
                            (base + 2 * step, -3.0),
                            (base + 3 * step, 1.0),
                        ],
                    );
                }

                if weights.model_4 != 0.0 && n + 4 < size {
                    // f'''' = 0
                    eq.add_row(
                        weights.model_4,
                        0.0,
                        &[
                            (base, 1.0),
                            (base + step, -4.0),
                            (base + 2 * step, 6.0),
                            (base + 3 * step, -4.0),
                            (base + 4 * step, 1.0),
                        ],
                    );
                }
            }
        });
    }

    if weights.gradient_smoothness != 0.0 && dims >= 2 {
        add_gradient_smoothness(eq, &sizes, &strides, weights.gradient_smoothness);
    }
}

/// For every cell, equates each pair of parallel edge differences: the
/// change of `f` along one axis-`d` edge must match the change along every
/// other axis-`d` edge of the same cell.
fn add_gradient_smoothness(
    eq: &mut LinearEquation,
    sizes: &[usize],
    strides: &[usize],
    weight: f32,
) {
    let dims = sizes.len();

    lattice::visit_cells(sizes, |cell| {
        let base = flat_index_of(cell, strides);

        for d in 0..dims {
            // Offsets of the edges parallel to axis d: every corner whose
            // offset along d is zero.
            let edge_offsets: Vec<usize> = (0..1usize << dims)
                .filter(|mask| (mask >> d) & 1 == 0)
                .map(|mask| {
                    (0..dims)
                        .map(|a| ((mask >> a) & 1) * strides[a])
                        .sum::<usize>()
                })
                .collect();

            let step = strides[d];
            for i in 0..edge_offsets.len() {
                for j in i + 1..edge_offsets.len() {
                    let a = base + edge_offsets[i];
                    let b = base + edge_offsets[j];
                    eq.add_row(
                        weight,
                        0.0,
                        &[
                            (a + step, 1.0),
                            (a, -1.0),
                            (b + step, -1.0),
                            (b, 1.0),
                        ],
                    );
                }
            }
        }
    });
}
