/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the lattice field container and index arithmetic for arbitrary-rank grids.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # lattice
//!
//! Geometry of the axis-aligned sample lattice: sizes, row-major strides,
//! and the multi-index ↔ flat-index mapping shared by every stencil emitter.
//!
//! Lattice coordinates run from `[0, 0, ...]` to `[sizes[0]-1, sizes[1]-1, ...]`
//! inclusive. Queries outside that range report "absent" so that stencil
//! emitters can drop equations that would reach past the boundary.

use crate::equation::LinearEquation;

/// An unknown scalar field sampled on a regular lattice, together with the
/// accumulated constraint equations over its node values.
///
/// The dimensionality is a runtime property; stencil emitters iterate the
/// axes rather than hard-coding a rank.
#[derive(Debug, Clone, Default)]
pub struct LatticeField {
    /// Extent along each axis.
    pub sizes: Vec<usize>,

    /// Row-major strides: `strides[0] == 1`, axis 0 varies fastest.
    pub strides: Vec<usize>,

    /// Accumulated constraint equations.
    pub eq: LinearEquation,
}

impl LatticeField {
    /// Creates an empty field over a lattice of the given extents.
    pub fn new(sizes: &[usize]) -> Self {
        assert!(!sizes.is_empty(), "A lattice needs at least one axis");
        assert!(
            sizes.iter().all(|&s| s >= 1),
            "Every lattice axis needs at least one node, got {:?}",
            sizes
        );

        let num_unknowns: usize = sizes.iter().product();
        assert!(
            num_unknowns <= u32::MAX as usize,
            "Lattice of {} nodes exceeds the column index range",
            num_unknowns
        );

        Self {
            sizes: sizes.to_vec(),
            strides: strides_for(sizes),
            eq: LinearEquation::new(),
        }
    }

    pub fn num_dims(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of lattice nodes (= unknowns of the system).
    pub fn num_unknowns(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Flat index of a node known to be in range.
    pub (crate) fn flat_index(&self, node: &[usize]) -> usize {
        flat_index_of(node, &self.strides)
    }

    /// Flat index of a node, or `None` if any coordinate falls outside
    /// the lattice. Signed coordinates let callers probe stencil nodes
    /// computed from floored positions without pre-clamping.
    pub (crate) fn checked_flat_index(&self, node: &[i64]) -> Option<usize> {
        let mut flat = 0usize;
        for (d, &coord) in node.iter().enumerate() {
            if coord < 0 || coord as usize >= self.sizes[d] {
                return None;
            }
            flat += coord as usize * self.strides[d];
        }
        Some(flat)
    }
}

/// Row-major strides for the given extents.
pub (crate) fn strides_for(sizes: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(sizes.len());
    let mut stride = 1usize;
    for &size in sizes {
        strides.push(stride);
        stride *= size;
    }
    strides
}

/// Flat index from a multi-index and matching strides.
#[inline]
pub (crate) fn flat_index_of(node: &[usize], strides: &[usize]) -> usize {
    node.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Decodes a flat index into the multi-index buffer `out`.
#[inline]
pub (crate) fn decode_index(mut flat: usize, sizes: &[usize], out: &mut [usize]) {
    for (d, &size) in sizes.iter().enumerate() {
        out[d] = flat % size;
        flat /= size;
    }
}

/// Visits every node of the lattice in flat-index order, axis 0 fastest.
pub (crate) fn visit_nodes(sizes: &[usize], mut f: impl FnMut(&[usize])) {
    visit_counter(sizes, 0, &mut f);
}

/// Visits the origin node of every cell, i.e. every node with
/// `node[d] <= sizes[d] - 2` on all axes. A lattice with an axis of
/// fewer than two nodes has no cells.
pub (crate) fn visit_cells(sizes: &[usize], mut f: impl FnMut(&[usize])) {
    visit_counter(sizes, 1, &mut f);
}

fn visit_counter(sizes: &[usize], margin: usize, f: &mut impl FnMut(&[usize])) {
    let dims = sizes.len();
    if sizes.iter().any(|&s| s <= margin) {
        return;
    }

    let mut node = vec![0usize; dims];
    loop {
        f(&node);

        let mut d = 0;
        loop {
            node[d] += 1;
            if node[d] < sizes[d] - margin {
                break;
            }
            node[d] = 0;
            d += 1;
            if d == dims {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_are_row_major() {
        let field = LatticeField::new(&[4, 3, 2]);
        assert_eq!(field.strides, vec![1, 4, 12]);
        assert_eq!(field.num_unknowns(), 24);
    }

    #[test]
    fn flat_index_round_trips() {
        let sizes = [5usize, 4, 3];
        let strides = strides_for(&sizes);

        let mut decoded = [0usize; 3];
        for flat in 0..sizes.iter().product::<usize>() {
            decode_index(flat, &sizes, &mut decoded);
            assert_eq!(flat_index_of(&decoded, &strides), flat);
        }
    }

    #[test]
    fn out_of_range_nodes_are_absent() {
        let field = LatticeField::new(&[3, 3]);
        assert_eq!(field.checked_flat_index(&[1, 2]), Some(7));
        assert_eq!(field.checked_flat_index(&[-1, 0]), None);
        assert_eq!(field.checked_flat_index(&[0, 3]), None);
    }

    #[test]
    fn node_and_cell_visit_counts() {
        let mut nodes = 0usize;
        visit_nodes(&[3, 4], |_| nodes += 1);
        assert_eq!(nodes, 12);

        let mut cells = 0usize;
        visit_cells(&[3, 4], |_| cells += 1);
        assert_eq!(cells, 6);

        let mut degenerate = 0usize;
        visit_cells(&[1, 4], |_| degenerate += 1);
        assert_eq!(degenerate, 0, "a one-node axis admits no cells");
    }

    #[test]
    fn nodes_visit_in_flat_order() {
        let sizes = [3usize, 2];
        let strides = strides_for(&sizes);
        let mut expected = 0usize;
        visit_nodes(&sizes, |node| {
            assert_eq!(flat_index_of(node, &strides), expected);
            expected += 1;
        });
        assert_eq!(expected, 6);
    }

    #[test]
    #[should_panic(expected = "at least one axis")]
    fn empty_sizes_fail_fast() {
        LatticeField::new(&[]);
    }
}
