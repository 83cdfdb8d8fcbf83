/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies constraint kernels and weighting options for configuring field reconstructions.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies constraint kernels and weighting options for configuring field reconstructions.

use serde::{Deserialize, Serialize};

/// How a value constraint is splatted onto the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKernel {
    /// Apply to the closest node, offsetting the value along the supplied gradient.
    NearestNeighbor,

    /// Multilinear interpolation over the corners of the containing cell.
    LinearInterp,
}

/// How a gradient constraint is splatted onto the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientKernel {
    /// One edge difference per axis, in the containing cell.
    NearestNeighbor,

    /// All parallel edge differences of the containing cell, summed per axis.
    CellEdges,

    /// Edge differences blended by the multilinear weights of the
    /// perpendicular face fractions.
    LinearInterp,
}

/// Relative strengths of the data and smoothness constraints.
///
/// Data weights say how much the reconstruction should trust the input
/// samples; the `model_*` weights say how strongly the field should obey
/// a smoothness prior of the corresponding differential order. Noisy data
/// calls for higher model weights, trustworthy data for higher data
/// weights. Note that the appropriate model weights change with the
/// lattice resolution: doubling the resolution halves the spacing every
/// finite-difference stencil spans.
///
/// ### Default Values
/// - `data_pos`: `1.0`
/// - `data_gradient`: `1.0`
/// - `model_0` .. `model_4`: `0.0, 0.0, 0.5, 0.0, 0.0`
/// - `gradient_smoothness`: `0.0`
/// - `value_kernel`: [`ValueKernel::LinearInterp`]
/// - `gradient_kernel`: [`GradientKernel::CellEdges`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    /// How much to trust known field values at sample positions.
    pub data_pos: f32,

    /// How much to trust known field gradients at sample positions.
    pub data_gradient: f32,

    /// Pull toward zero everywhere (Tikhonov-style regularization).
    pub model_0: f32,

    /// Pull toward a constant field (first differences vanish).
    pub model_1: f32,

    /// Pull toward a linear field (second differences vanish).
    pub model_2: f32,

    /// Pull toward a quadratic field (third differences vanish).
    pub model_3: f32,

    /// Pull toward a cubic field (fourth differences vanish).
    pub model_4: f32,

    /// Strength of the per-cell equations equating parallel edge
    /// differences. For a 2D cell with corners `A B / C D` these state
    /// `(B-A) == (D-C)` and `(C-A) == (D-B)`.
    pub gradient_smoothness: f32,

    /// Kernel used when splatting value constraints.
    pub value_kernel: ValueKernel,

    /// Kernel used when splatting gradient constraints.
    pub gradient_kernel: GradientKernel,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            data_pos: 1.0,
            data_gradient: 1.0,
            model_0: 0.0,
            model_1: 0.0,
            model_2: 0.5,
            model_3: 0.0,
            model_4: 0.0,
            gradient_smoothness: 0.0,
            value_kernel: ValueKernel::LinearInterp,
            gradient_kernel: GradientKernel::CellEdges,
        }
    }
}

impl Weights {
    /// Returns a new [`WeightsBuilder`] populated with the default values.
    pub fn builder() -> WeightsBuilder {
        WeightsBuilder::new()
    }
}

/// A convenience builder for constructing a [`Weights`] instance.
///
/// The builder should be called via the [`Weights::builder`] method.
///
/// See [`Weights`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct WeightsBuilder {
    weights: Weights,
}

impl WeightsBuilder {
    fn new() -> Self {
        Self { weights: Weights::default() }
    }

    /// Sets the value-constraint trust weight.
    pub fn data_pos(mut self, data_pos: f32) -> Self {
        self.weights.data_pos = data_pos;
        self
    }

    /// Sets the gradient-constraint trust weight.
    pub fn data_gradient(mut self, data_gradient: f32) -> Self {
        self.weights.data_gradient = data_gradient;
        self
    }

    /// Sets the zero-field regularization strength.
    pub fn model_0(mut self, model_0: f32) -> Self {
        self.weights.model_0 = model_0;
        self
    }

    /// Sets the flatness strength.
    pub fn model_1(mut self, model_1: f32) -> Self {
        self.weights.model_1 = model_1;
        self
    }

    /// Sets the C1 smoothness strength.
    pub fn model_2(mut self, model_2: f32) -> Self {
        self.weights.model_2 = model_2;
        self
    }

    /// Sets the C2 smoothness strength.
    pub fn model_3(mut self, model_3: f32) -> Self {
        self.weights.model_3 = model_3;
        self
    }

    /// Sets the C3 smoothness strength.
    pub fn model_4(mut self, model_4: f32) -> Self {
        self.weights.model_4 = model_4;
        self
    }

    /// Sets the parallel-edge consistency strength.
    pub fn gradient_smoothness(mut self, gradient_smoothness: f32) -> Self {
        self.weights.gradient_smoothness = gradient_smoothness;
        self
    }

    /// Sets the value-constraint kernel.
    pub fn value_kernel(mut self, value_kernel: ValueKernel) -> Self {
        self.weights.value_kernel = value_kernel;
        self
    }

    /// Sets the gradient-constraint kernel.
    pub fn gradient_kernel(mut self, gradient_kernel: GradientKernel) -> Self {
        self.weights.gradient_kernel = gradient_kernel;
        self
    }

    /// Builds and returns a [`Weights`] instance.
    pub fn build(self) -> Weights {
        self.weights
    }
}
