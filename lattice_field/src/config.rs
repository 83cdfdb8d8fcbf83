/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares configuration types for the hierarchical approximate lattice solver.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares configuration types for the hierarchical approximate lattice solver.

use serde::{Deserialize, Serialize};

/// Parameters controlling the approximate lattice solver.
///
/// The solver first restricts the equations to a coarser lattice and
/// solves that system directly, then prolongates the coarse solution back
/// to the fine lattice. The prolongated field can optionally be refined
/// with conjugate gradient iterations, either globally or independently
/// per overlapping tile.
///
/// ### Default Values
/// - `downscale_factor`: `4`
/// - `tile`: `true`
/// - `tile_size`: `16`
/// - `cg`: `true`
/// - `error_tolerance`: `1e-3`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Integer factor by which each axis is divided to form the coarse
    /// lattice. Must be at least 2; coarse axes never shrink below two
    /// nodes.
    pub downscale_factor: usize,

    /// Whether to refine the fine lattice tile by tile. Tiles are
    /// independent and solved in parallel.
    pub tile: bool,

    /// Side length of a tile core, in nodes.
    pub tile_size: usize,

    /// Whether to refine with conjugate gradient iterations.
    pub cg: bool,

    /// Refinement stops once an iteration improves the residual norm by
    /// less than `error_tolerance * ‖b‖`.
    pub error_tolerance: f32,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            downscale_factor: 4,
            tile: true,
            tile_size: 16,
            cg: true,
            error_tolerance: 1e-3,
        }
    }
}

impl SolveOptions {
    /// Returns a new [`SolveOptionsBuilder`] populated with the default values.
    pub fn builder() -> SolveOptionsBuilder {
        SolveOptionsBuilder::new()
    }

    pub (crate) fn validate(&self) {
        assert!(
            self.downscale_factor >= 2,
            "downscale_factor must be at least 2, got {}",
            self.downscale_factor
        );
        assert!(
            !self.tile || self.tile_size >= 2,
            "tile_size must be at least 2, got {}",
            self.tile_size
        );
        assert!(
            self.error_tolerance >= 0.0,
            "error_tolerance must be non-negative, got {}",
            self.error_tolerance
        );
    }
}

/// A convenience builder for constructing a [`SolveOptions`] instance.
///
/// The builder should be called via the [`SolveOptions::builder`] method.
///
/// See [`SolveOptions`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptionsBuilder {
    options: SolveOptions,
}

impl SolveOptionsBuilder {
    fn new() -> Self {
        Self { options: SolveOptions::default() }
    }

    /// Sets the coarsening factor.
    pub fn downscale_factor(mut self, downscale_factor: usize) -> Self {
        self.options.downscale_factor = downscale_factor;
        self
    }

    /// Enables or disables tiled refinement.
    pub fn tile(mut self, tile: bool) -> Self {
        self.options.tile = tile;
        self
    }

    /// Sets the tile core side length.
    pub fn tile_size(mut self, tile_size: usize) -> Self {
        self.options.tile_size = tile_size;
        self
    }

    /// Enables or disables conjugate gradient refinement.
    pub fn cg(mut self, cg: bool) -> Self {
        self.options.cg = cg;
        self
    }

    /// Sets the refinement stopping tolerance.
    pub fn error_tolerance(mut self, error_tolerance: f32) -> Self {
        self.options.error_tolerance = error_tolerance;
        self
    }

    /// Builds and returns a [`SolveOptions`] instance.
    pub fn build(self) -> SolveOptions {
        self.options.validate();
        self.options
    }
}
