/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages and sinks for long-running solves.
//
// Created on: 22 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting for long-running solves.
//!
//! Solvers accept an optional sink and publish coarse-grained events as
//! they go: one message per refinement iteration, one per finished tile.
//! Delivery is synchronous on the emitting thread. Tile solves emit from
//! rayon workers, so a sink implementation must tolerate concurrent calls
//! and should return quickly; anything slow belongs on the caller's side
//! of the sink.

use std::sync::{Arc, Mutex};

/// Progress events emitted during long-running computations.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// Event indicating iteration status for an iterative solver.
    SolverIteration { iter: usize, residual: f64, progress: f64 },

    /// Event indicating how many lattice tiles have been solved so far.
    TilesSolved { completed: usize, total: usize },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages. Implementations are called from
/// whichever thread produced the event.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, msg: ProgressMsg);
}

/// Sink that hands every message to a caller-supplied closure.
///
/// The closure runs under a mutex, which serializes messages arriving
/// concurrently from parallel tile solves. A poisoned lock (a panic in
/// the handler) silently drops later messages rather than spreading the
/// panic into the solver.
pub struct CallbackSink<F: FnMut(ProgressMsg) + Send> {
    handler: Mutex<F>,
}

impl<F: FnMut(ProgressMsg) + Send> ProgressSink for CallbackSink<F> {
    fn emit(&self, msg: ProgressMsg) {
        if let Ok(mut handler) = self.handler.lock() {
            handler(msg);
        }
    }
}

/// Wraps a closure into a shareable [`ProgressSink`] handle.
pub fn callback_sink<F>(handler: F) -> Arc<dyn ProgressSink>
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    Arc::new(CallbackSink { handler: Mutex::new(handler) })
}

/// Fraction of the requested residual reduction achieved so far, on a
/// logarithmic scale (iterative solvers converge multiplicatively, so
/// linear-in-residual progress would sit near 1 almost immediately).
/// Clamped to [0, 1]: a residual above the starting one reports no
/// progress rather than a negative value.
pub (crate) fn reduction_progress(current: f64, start: f64, target: f64) -> f64 {
    if current <= target {
        return 1.0;
    }
    if current >= start {
        return 0.0;
    }
    let achieved = (start / current).ln();
    let wanted = (start / target).ln();
    (achieved / wanted).clamp(0.0, 1.0)
}
