/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for lattice field interpolation.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Sparse least-squares field interpolation on regular lattices.
//!
//! This crate estimates a scalar field sampled on a D-dimensional lattice
//! from a set of weighted constraints. Constraints come in two families:
//!
//! - **Data constraints** - things known about the field: its value or its
//!   gradient at arbitrary (sub-node) positions.
//! - **Model constraints** - smoothness priors: equations asking the
//!   discrete derivatives of the field to vanish, at selectable orders.
//!
//! Every constraint becomes one weighted row of a sparse over-determined
//! system `A x = b`; solving it in the least-squares sense yields the
//! field that balances the constraint errors. Weights steer that balance:
//! trustworthy data wants high data weights, noisy data wants high model
//! weights. Note that model weights are resolution-dependent, since the
//! finite-difference stencils they weight span one lattice step.
//!
//! Two solvers are provided. [`solve_exact`] forms the normal equations
//! and factors them with a sparse Cholesky (LU as fallback), which is the
//! reference answer for small and medium lattices. [`solve_approximate`]
//! restricts the system to a coarse lattice, solves that directly, then
//! prolongates and refines with conjugate gradient iterations, optionally
//! tile by tile in parallel; it scales to lattices where the exact solve
//! is too expensive.
//!
//! The crate is dimension-agnostic and aimed at low ranks (1D, 2D, 3D).
//! Typical uses: fitting a smooth curve to noisy samples, or building a
//! signed distance field from oriented surface points (see
//! [`sdf_from_points`]).
//!
//! Positions handed to the constraint API are in *lattice units*: node `i`
//! sits at coordinate `i` along its axis, so the lattice spans `[0, 0, ..]`
//! to `[sizes[0]-1, sizes[1]-1, ..]` inclusive.
//!
//! # Examples
//!
//! ```
//! use lattice_field::{
//!     LatticeField, ValueKernel, Weights,
//!     add_field_constraints, add_value_constraint, solve_exact,
//! };
//!
//! // A five-node 1D field pinned at both ends, with a smoothness prior
//! // filling in the middle.
//! let mut field = LatticeField::new(&[5]);
//! let weights = Weights::builder().data_pos(1000.0).model_2(1.0).build();
//!
//! assert!(add_value_constraint(
//!     &mut field, &[0.0], 0.0, weights.data_pos, ValueKernel::LinearInterp,
//! ));
//! assert!(add_value_constraint(
//!     &mut field, &[4.0], 4.0, weights.data_pos, ValueKernel::LinearInterp,
//! ));
//! add_field_constraints(&mut field, &weights);
//!
//! let solution = solve_exact(field.num_unknowns(), &field.eq.triplets, &field.eq.rhs);
//!
//! // The smoothness prior interpolates a straight ramp.
//! assert!((solution[2] - 2.0).abs() < 1e-3);
//! ```

pub mod config;

pub mod field_config;

mod common;

mod constraints;

mod equation;

mod iterative_solvers;

mod lattice;

mod linalg;

mod model;

mod multiscale;

mod points;

pub mod progress;

pub use {
    common::{generate_error_map, upsample_field},
    config::{SolveOptions, SolveOptionsBuilder},
    constraints::{
        MAX_FANOUT_DIM, add_gradient_constraint, add_value_constraint,
        add_value_constraint_nearest_neighbor,
    },
    equation::{LinearEquation, Triplet},
    field_config::{GradientKernel, ValueKernel, Weights, WeightsBuilder},
    lattice::LatticeField,
    linalg::solve_exact,
    model::add_field_constraints,
    multiscale::solve_approximate,
    points::{add_points, sdf_from_points},
};
