/////////////////////////////////////////////////////////////////////////////////////////////
//
// Partitions the lattice into overlapping tiles and refines them independently in parallel.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # tiling
//!
//! Tiled refinement of the fine lattice. Tile *cores* partition the
//! lattice; each core is padded into an overlapping *window* so that the
//! stencils near a core boundary keep their context. A tile solves only
//! the rows whose support lies entirely inside its window, seeded with the
//! prolongated field, and writes back its core region. Cores are disjoint,
//! so the tiles are independent and run in parallel.

use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::SolveOptions;
use crate::equation::Triplet;
use crate::iterative_solvers::conjugate_gradient_normal;
use crate::lattice::{self, decode_index, flat_index_of, strides_for};
use crate::linalg::{RowMajorSystem, solve_exact};
use crate::progress::{ProgressMsg, ProgressSink};

/// Window padding around each tile core, in nodes. Covers the widest
/// model stencil, so any row whose nodes all sit in a core also fits the
/// window of that core's tile.
pub (crate) const TILE_OVERLAP: usize = 4;

struct Tile {
    core_min: Vec<usize>,
    core_max: Vec<usize>,
    win_min: Vec<usize>,
    win_max: Vec<usize>,
}

fn make_tiles(sizes: &[usize], tile_size: usize) -> Vec<Tile> {
    let dims = sizes.len();
    let counts: Vec<usize> = sizes.iter().map(|&s| s.div_ceil(tile_size)).collect();

    let mut tiles = Vec::with_capacity(counts.iter().product());
    lattice::visit_nodes(&counts, |tile_index| {
        let mut tile = Tile {
            core_min: vec![0; dims],
            core_max: vec![0; dims],
            win_min: vec![0; dims],
            win_max: vec![0; dims],
        };
        for d in 0..dims {
            tile.core_min[d] = tile_index[d] * tile_size;
            tile.core_max[d] = (tile.core_min[d] + tile_size).min(sizes[d]);
            tile.win_min[d] = tile.core_min[d].saturating_sub(TILE_OVERLAP);
            tile.win_max[d] = (tile.core_max[d] + TILE_OVERLAP).min(sizes[d]);
        }
        tiles.push(tile);
    });

    tiles
}

/// Per-row bounding boxes of the referenced nodes, interleaved as
/// `[min_0.., max_0..]` per row. Rows without entries keep an inverted
/// box; the gatherer skips them before consulting it.
fn row_bounding_boxes(sys: &RowMajorSystem, sizes: &[usize]) -> Vec<usize> {
    let dims = sizes.len();
    let mut boxes = vec![0usize; sys.num_rows * 2 * dims];
    let mut node = vec![0usize; dims];

    for i in 0..sys.num_rows {
        let (cols, _) = sys.row(i);
        let slot = &mut boxes[i * 2 * dims..(i + 1) * 2 * dims];
        slot[..dims].fill(usize::MAX);
        slot[dims..].fill(0);

        for &c in cols {
            decode_index(c as usize, sizes, &mut node);
            for d in 0..dims {
                slot[d] = slot[d].min(node[d]);
                slot[dims + d] = slot[dims + d].max(node[d]);
            }
        }
    }

    boxes
}

/// Refines the seeded field tile by tile and returns the merged result.
pub (crate) fn solve_tiled(
    sys: &RowMajorSystem,
    rhs: &[f32],
    sizes: &[usize],
    guess: &[f32],
    options: &SolveOptions,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Vec<f32> {
    let dims = sizes.len();
    let strides = strides_for(sizes);
    let tiles = make_tiles(sizes, options.tile_size);
    let total = tiles.len();
    let boxes = row_bounding_boxes(sys, sizes);

    let output = vec![0.0f32; guess.len()];
    let output_ref = &output;
    let completed = AtomicUsize::new(0);

    tiles.par_iter().for_each(|tile| {
        let window_sizes: Vec<usize> = (0..dims)
            .map(|d| tile.win_max[d] - tile.win_min[d])
            .collect();
        let window_strides = strides_for(&window_sizes);

        let solved = solve_tile(sys, rhs, sizes, guess, tile, &window_sizes, &boxes, options);

        let output_ptr = output_ref.as_ptr() as *mut f32;
        let core_sizes: Vec<usize> = (0..dims)
            .map(|d| tile.core_max[d] - tile.core_min[d])
            .collect();
        let mut global = vec![0usize; dims];
        let mut local = vec![0usize; dims];
        lattice::visit_nodes(&core_sizes, |offset| {
            for d in 0..dims {
                global[d] = tile.core_min[d] + offset[d];
                local[d] = global[d] - tile.win_min[d];
            }
            // SAFETY: Since each tile only writes back its own core nodes
            // and the cores partition the lattice, every output node has
            // exactly one writer and the parallel writes never alias.
            unsafe {
                *output_ptr.add(flat_index_of(&global, &strides)) =
                    solved[flat_index_of(&local, &window_strides)];
            }
        });

        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(sink) = &progress {
            sink.emit(ProgressMsg::TilesSolved { completed: done, total });
        }
    });

    output
}

/// Solves one tile over its window and returns the window-sized field.
/// Falls back to the seed when a direct tile solve fails.
fn solve_tile(
    sys: &RowMajorSystem,
    rhs: &[f32],
    sizes: &[usize],
    guess: &[f32],
    tile: &Tile,
    window_sizes: &[usize],
    boxes: &[usize],
    options: &SolveOptions,
) -> Vec<f32> {
    let dims = sizes.len();
    let strides = strides_for(sizes);
    let window_strides = strides_for(window_sizes);
    let window_unknowns: usize = window_sizes.iter().product();

    // Seed with the prolongated field over the window.
    let mut seed = Vec::with_capacity(window_unknowns);
    let mut global = vec![0usize; dims];
    lattice::visit_nodes(window_sizes, |local| {
        for d in 0..dims {
            global[d] = tile.win_min[d] + local[d];
        }
        seed.push(guess[flat_index_of(&global, &strides)]);
    });

    // Gather the rows whose support lies inside the window.
    let mut local_triplets: Vec<Triplet> = Vec::new();
    let mut local_rhs: Vec<f32> = Vec::new();
    let mut node = vec![0usize; dims];

    for i in 0..sys.num_rows {
        let (cols, vals) = sys.row(i);
        if cols.is_empty() {
            continue;
        }

        let row_box = &boxes[i * 2 * dims..(i + 1) * 2 * dims];
        let inside = (0..dims).all(|d| {
            tile.win_min[d] <= row_box[d] && row_box[dims + d] < tile.win_max[d]
        });
        if !inside {
            continue;
        }

        let local_row = local_rhs.len() as u32;
        for (&c, &v) in cols.iter().zip(vals) {
            decode_index(c as usize, sizes, &mut node);
            let local_col: usize = (0..dims)
                .map(|d| (node[d] - tile.win_min[d]) * window_strides[d])
                .sum();
            local_triplets.push(Triplet::new(local_row, local_col as u32, v));
        }
        local_rhs.push(rhs[i]);
    }

    match options.cg {
        true => {
            let local_sys =
                RowMajorSystem::from_triplets(local_rhs.len(), window_unknowns, &local_triplets);
            conjugate_gradient_normal(
                &local_sys,
                &local_rhs,
                &seed,
                options.error_tolerance,
                None,
            )
        }
        false => {
            let solved = solve_exact(window_unknowns, &local_triplets, &local_rhs);
            match solved.is_empty() {
                true => seed,
                false => solved,
            }
        }
    }
}
