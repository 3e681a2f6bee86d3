//! **MOFW** is a fireworks algorithm framework for single- and
//! multi-objective optimization of black-box functions over box-constrained
//! continuous domains. It is a stochastic, derivative-free heuristic: no
//! gradients are computed and no global optimality is guaranteed - solution
//! quality is evaluated empirically.
//!
//! The fireworks method keeps a small population of **charges** - explosion
//! centers - and on every iteration scatters a cloud of **debris** around
//! each of them: the better a charge, the more debris it receives and the
//! smaller the explosion amplitude, so strong candidates are exploited with
//! dense local search while weak ones explore far. The next generation is
//! then selected from the union of charges and debris by *diversity-weighted
//! random sampling* - candidates far away from the rest of the population
//! are more likely to survive, which keeps the search from collapsing into a
//! single basin.
//!
//! # Optimizers
//!
//! This crate features two optimizers sharing one iteration engine:
//! - [`MofwOptimizer`] minimizes several objectives at once. It ranks
//!   candidates into dominance fronts with a [non-dominated sort], always
//!   keeps the non-dominated front (pruning it by diversity when it
//!   overflows the population) and exposes the current Pareto front through
//!   [`pareto_front`].
//! - [`Fireworks`] minimizes a single objective, keeps the best candidate
//!   unconditionally and requires a [`Distance`] function for its diversity
//!   weighting.
//!
//! Both implement the [`FireworksHeuristic`] trait, which supplies four
//! drivers for the same loop: plain [`minimize`], a cancellable variant
//! polling a [`CancellationToken`] once per iteration, a reporting variant
//! feeding [`Progress`] snapshots to a [`ProgressReporter`], and the
//! combination of both.
//!
//! # Problems and collaborators
//!
//! A problem is anything implementing [`Problem`] or
//! [`MultiObjectiveProblem`] - bounds plus an evaluator - and the
//! [`FnProblem`]/[`FnMultiProblem`] adapters build one from closures.
//! Random sources ([`UniformSource`], [`NormalSource`]) and the dominance
//! ranking ([`NonDominatedSort`]) are injected capabilities: the optimizers
//! depend only on their contracts, and the seedable defaults make whole runs
//! deterministic in tests. Several operator traits of this crate are
//! implemented by closures, so simple collaborators need no named types.
//!
//! # Execution model
//!
//! A run is single-threaded and synchronous: one `minimize` call performs
//! the whole loop on the caller's thread. An optimizer instance owns all of
//! its mutable scratch state - an agent pool, a pairwise distance matrix and
//! a weighted candidate list reused across iterations - so one instance must
//! not be shared between threads, but independent instances run concurrently
//! without contention because nothing global is touched.
//!
//! # Example
//!
//! Solving *Schaffer's Problem No.1* with the multi-objective optimizer:
//! ```no_run
//! use mofw::{
//!   problem::FnMultiProblem,
//!   FireworksHeuristic,
//!   FwParams,
//!   MofwOptimizer,
//! };
//!
//! // objective functions `f1(x) = x^2` and `f2(x) = (x - 2)^2`
//! let problem =
//!   FnMultiProblem::new(vec![-10.0], vec![10.0], 2, |x: &[f64], objs: &mut [f64]| {
//!     objs[0] = x[0].powi(2);
//!     objs[1] = (x[0] - 2.0).powi(2);
//!   });
//! // 40 charges, budget multiplier 20, 100 iterations; debris counts and
//! // amplitude ceiling keep their defaults
//! let params = FwParams::builder().np(40).m(20).imax(100).build();
//! let mut optimizer = MofwOptimizer::new();
//! optimizer.minimize(&params, &problem).unwrap();
//! // the optimizer retains its population: the Pareto front is recomputed
//! // over the current charges on demand
//! for agent in optimizer.pareto_front() {
//!   println!("{:?}", agent.objs());
//! }
//! ```
//!
//! # Errors
//!
//! Malformed parameters are rejected through [`FwError::InvalidParams`]
//! before any optimizer state is touched - eagerly by [`FwParams::new`], or
//! when a run starts for parameters assembled by the unvalidated
//! [`builder`](FwParams::builder). An objective evaluating to NaN or an
//! infinity surfaces as [`FwError::NonFiniteObjective`] instead of silently
//! corrupting the distance computations downstream. The one numeric
//! condition handled locally is collapsed diversity weights - coincident
//! candidates - which fall back to a uniform distribution rather than
//! failing the run.
//!
//! [non-dominated sort]: crate::sorting::NonDominatedSort
//! [`pareto_front`]: crate::optimizer::mofw::MofwOptimizer::pareto_front
//! [`minimize`]: crate::optimizer::FireworksHeuristic::minimize
//! [`Distance`]: crate::optimizer::fireworks::Distance
//! [`Progress`]: crate::optimizer::Progress
//! [`ProgressReporter`]: crate::optimizer::ProgressReporter
//! [`CancellationToken`]: crate::optimizer::CancellationToken
//! [`Problem`]: crate::problem::Problem
//! [`MultiObjectiveProblem`]: crate::problem::MultiObjectiveProblem
//! [`FnProblem`]: crate::problem::FnProblem
//! [`FnMultiProblem`]: crate::problem::FnMultiProblem
//! [`UniformSource`]: crate::random::UniformSource
//! [`NormalSource`]: crate::random::NormalSource
//! [`NonDominatedSort`]: crate::sorting::NonDominatedSort

#![warn(missing_docs)]

pub mod agent;
mod engine;
pub mod error;
pub mod kahan;
pub mod matrix;
pub mod optimizer;
pub mod params;
pub mod point;
pub mod problem;
pub mod random;
pub mod sorting;

pub use crate::{
  error::FwError,
  optimizer::{
    fireworks::Fireworks,
    mofw::MofwOptimizer,
    CancellationToken,
    FireworksHeuristic,
    Progress,
    ProgressReporter,
  },
  params::FwParams,
};
