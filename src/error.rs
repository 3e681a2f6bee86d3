//! Errors reported by the optimizers.

use thiserror::Error;

/// An error of a fireworks optimization run.
///
/// Parameter faults are detected before any optimizer state is mutated;
/// cancellation and numeric faults abort the run, leaving the optimizer in a
/// state the next [`minimize`](crate::optimizer::FireworksHeuristic::minimize)
/// call recovers from.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FwError {
  /// A run parameter violates its constraint.
  #[error("invalid parameter: {0}")]
  InvalidParams(&'static str),

  /// Cooperative cancellation was observed at an iteration boundary.
  #[error("cancelled before iteration {iteration}")]
  Cancelled {
    /// The iteration that was about to start.
    iteration: usize,
  },

  /// An objective function evaluated to NaN or an infinite value. Such a
  /// value would corrupt every downstream distance and weight computation,
  /// so it is surfaced instead of being absorbed.
  #[error("objective evaluated to a non-finite value on iteration {iteration}")]
  NonFiniteObjective {
    /// The iteration the evaluation happened on.
    iteration: usize,
  },
}
