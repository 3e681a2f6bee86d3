//! The multi-objective fireworks optimizer.

use std::collections::HashSet;

use log::debug;

use crate::{
  agent::{Agent, AgentId},
  engine::{ensure_finite, FwCore, DIV_GUARD},
  error::FwError,
  kahan::KahanSum,
  optimizer::FireworksHeuristic,
  params::FwParams,
  point::Point,
  problem::MultiObjectiveProblem,
  random::{NormalSource, StdNormal, StdUniform, UniformSource},
  sorting::{FastNonDominatedSort, NonDominatedSort},
};

/// The multi-objective fireworks optimizer.
///
/// Every iteration it recomputes the ideal and nadir points of the charge
/// population, hands each charge a debris budget proportional to its
/// distance from the nadir point and an explosion amplitude proportional to
/// its distance from the ideal point, scatters and evaluates the debris,
/// ranks the union of charges and debris into dominance fronts and rebuilds
/// the population: a first front that overflows `np` is diversity-pruned by
/// weighted sampling, an underfull one survives whole and the remainder is
/// diversity-sampled from the dominated candidates.
///
/// # Examples
/// ```no_run
/// use mofw::{
///   problem::FnMultiProblem,
///   FireworksHeuristic,
///   FwParams,
///   MofwOptimizer,
/// };
///
/// // Schaffer's Problem No.1
/// let problem =
///   FnMultiProblem::new(vec![-10.0], vec![10.0], 2, |x: &[f64], objs: &mut [f64]| {
///     objs[0] = x[0].powi(2);
///     objs[1] = (x[0] - 2.0).powi(2);
///   });
/// let params = FwParams::builder().np(40).m(20).imax(100).amax(5.0).build();
/// let mut optimizer = MofwOptimizer::new();
/// optimizer.minimize(&params, &problem).unwrap();
/// for agent in optimizer.pareto_front() {
///   println!("{:?} -> {:?}", agent.point(), agent.objs());
/// }
/// ```
pub struct MofwOptimizer {
  core: FwCore,
  ideal: Point,
  nadir: Point,
  objs_scratch: Vec<f64>,
  ranks: Vec<usize>,
  union: Vec<AgentId>,
  keep: Vec<AgentId>,
  kept: HashSet<AgentId>,
  sorter: Box<dyn NonDominatedSort>,
}

impl MofwOptimizer {
  /// Creates an optimizer with entropy-seeded random sources and the
  /// built-in [`FastNonDominatedSort`].
  pub fn new() -> Self {
    Self::with_sources(
      Box::new(StdUniform::from_entropy()),
      Box::new(StdNormal::from_entropy()),
    )
  }

  /// Creates an optimizer with custom random sources. Seeded sources make
  /// a whole run deterministic.
  pub fn with_sources(
    uniform: Box<dyn UniformSource>,
    normal: Box<dyn NormalSource>,
  ) -> Self {
    Self {
      core: FwCore::new(uniform, normal),
      ideal: Point::default(),
      nadir: Point::default(),
      objs_scratch: Vec::new(),
      ranks: Vec::new(),
      union: Vec::new(),
      keep: Vec::new(),
      kept: HashSet::new(),
      sorter: Box::new(FastNonDominatedSort),
    }
  }

  /// Replaces the dominance ranking implementation.
  pub fn with_sorter(mut self, sorter: Box<dyn NonDominatedSort>) -> Self {
    self.sorter = sorter;
    self
  }

  /// Parameters of the last prepared run, if any.
  pub fn params(&self) -> Option<&FwParams> {
    self.core.params.as_ref()
  }

  /// Recomputes the non-dominated front over the current charge population.
  /// Not cached: every call ranks the charges anew. Empty before the first
  /// run.
  pub fn pareto_front(&self) -> Vec<&Agent> {
    let points: Vec<&[f64]> = self
      .core
      .charges
      .iter()
      .map(|&id| self.core.arena.get(id).objs().as_slice())
      .collect();
    let ranks = self.sorter.rank(&points);
    self
      .core
      .charges
      .iter()
      .zip(ranks)
      .filter(|&(_, rank)| rank == 0)
      .map(|(&id, _)| self.core.arena.get(id))
      .collect()
  }

  fn eval_agent<P>(&mut self, problem: &P, id: AgentId) -> Result<(), FwError>
  where
    P: MultiObjectiveProblem,
  {
    problem.evaluate_into(
      self.core.arena.get(id).point().as_slice(),
      &mut self.objs_scratch,
    );
    ensure_finite(&self.objs_scratch, self.core.iteration)?;
    self.core.arena.get_mut(id).objs_mut().assign(&self.objs_scratch);
    Ok(())
  }

  /// Componentwise minimum and maximum of the charges' objective vectors.
  fn update_ideal_and_nadir(&mut self) {
    let first = self.core.arena.get(self.core.charges[0]).objs();
    self.ideal.set_from(first);
    self.nadir.set_from(first);
    for &id in &self.core.charges[1..] {
      let objs = self.core.arena.get(id).objs();
      for j in 0..objs.len() {
        if objs[j] < self.ideal[j] {
          self.ideal[j] = objs[j];
        } else if objs[j] > self.nadir[j] {
          self.nadir[j] = objs[j];
        }
      }
    }
  }

  /// Debris budget: charges farther from the nadir point - better solutions
  /// - scatter more debris.
  fn allocate_debris(&mut self) {
    let mut denominator = KahanSum::new();
    for &id in &self.core.charges {
      denominator
        .add(self.nadir.distance(self.core.arena.get(id).objs()) + DIV_GUARD);
    }
    let denominator = denominator.sum();
    for charge in 0..self.core.np {
      let dist = self
        .nadir
        .distance(self.core.arena.get(self.core.charges[charge]).objs());
      let share = self.core.m * (dist + DIV_GUARD) / denominator;
      self.core.resize_debris(share, charge);
    }
  }

  /// Explosion amplitude: charges close to the ideal point exploit with
  /// small amplitudes, remote ones explore with large ones. Scatters and
  /// evaluates every debris.
  fn scatter_debris<P>(&mut self, problem: &P) -> Result<(), FwError>
  where
    P: MultiObjectiveProblem,
  {
    let mut denominator = KahanSum::new();
    for &id in &self.core.charges {
      denominator
        .add(self.ideal.distance(self.core.arena.get(id).objs()) + DIV_GUARD);
    }
    let denominator = denominator.sum();
    for charge in 0..self.core.np {
      let dist = self
        .ideal
        .distance(self.core.arena.get(self.core.charges[charge]).objs());
      let amplitude = self.core.amax * (dist + DIV_GUARD) / denominator;
      self.core.explode_charge(
        charge,
        amplitude,
        problem.lower_bounds(),
        problem.upper_bounds(),
      );
    }
    for charge in 0..self.core.np {
      for k in 0..self.core.debris[charge].len() {
        let id = self.core.debris[charge][k];
        self.eval_agent(problem, id)?;
      }
    }
    Ok(())
  }

  /// Ranks the union of charges and debris into fronts and rebuilds the
  /// charge population from the selection rule.
  fn select_next_generation(&mut self) {
    self.union.clear();
    self.union.extend(self.core.charges.iter().copied());
    self.union.extend(self.core.debris.iter().flatten().copied());

    let points: Vec<&[f64]> = self
      .union
      .iter()
      .map(|&id| self.core.arena.get(id).objs().as_slice())
      .collect();
    self.ranks = self.sorter.rank(&points);

    let np = self.core.np;
    let front_size = self.ranks.iter().filter(|&&rank| rank == 0).count();
    debug!(
      "iteration {}: first front holds {} of {} candidates",
      self.core.iteration,
      front_size,
      self.union.len()
    );

    self.keep.clear();
    if front_size > np {
      // the first front overflows the population: prune it by weighted
      // sampling biased toward spatially isolated members
      self.core.reset_weighted(
        self
          .union
          .iter()
          .zip(&self.ranks)
          .filter_map(|(&id, &rank)| (rank == 0).then_some(id)),
      );
      self
        .core
        .diversity_weights(|a, b| a.point().distance(b.point()));
      self.core.take_agents(np);
      self
        .keep
        .extend(self.core.weighted.iter().filter(|w| w.taken).map(|w| w.id));
    } else {
      // the whole first front survives; the remainder is sampled from the
      // dominated candidates
      self.keep.extend(
        self
          .union
          .iter()
          .zip(&self.ranks)
          .filter_map(|(&id, &rank)| (rank == 0).then_some(id)),
      );
      self.core.reset_weighted(
        self
          .union
          .iter()
          .zip(&self.ranks)
          .filter_map(|(&id, &rank)| (rank != 0).then_some(id)),
      );
      let remainder = np - front_size;
      if remainder > 0 {
        self
          .core
          .diversity_weights(|a, b| a.point().distance(b.point()));
        self.core.take_agents(remainder);
        self
          .keep
          .extend(self.core.weighted.iter().filter(|w| w.taken).map(|w| w.id));
      }
    }

    // selected ids become the next generation, everything else returns to
    // the pool
    self.kept.clear();
    self.kept.extend(self.keep.iter().copied());
    for &id in &self.union {
      if !self.kept.contains(&id) {
        self.core.arena.release(id);
      }
    }
    self.core.charges.clear();
    self.core.charges.extend(self.keep.iter().copied());
    for list in &mut self.core.debris {
      list.clear();
    }
    debug_assert_eq!(self.core.charges.len(), np);
  }
}

impl Default for MofwOptimizer {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> FireworksHeuristic<P> for MofwOptimizer
where
  P: MultiObjectiveProblem,
{
  fn prepare(&mut self, params: &FwParams, problem: &P) -> Result<(), FwError> {
    debug_assert_eq!(
      problem.lower_bounds().len(),
      problem.upper_bounds().len(),
      "problem bounds must have equal lengths"
    );
    let dim = problem.lower_bounds().len();
    let dim_objs = problem.objectives();
    self.core.init(params, dim, dim_objs)?;
    if self.ideal.len() != dim_objs {
      self.ideal = Point::new(0.0, dim_objs);
      self.nadir = Point::new(0.0, dim_objs);
    }
    self.objs_scratch.resize(dim_objs, 0.0);
    Ok(())
  }

  fn first_step(&mut self, problem: &P) -> Result<(), FwError> {
    self
      .core
      .seed_charges(problem.lower_bounds(), problem.upper_bounds());
    for k in 0..self.core.charges.len() {
      let id = self.core.charges[k];
      self.eval_agent(problem, id)?;
    }
    Ok(())
  }

  fn next_step(&mut self, problem: &P) -> Result<(), FwError> {
    self.core.iteration += 1;
    self.update_ideal_and_nadir();
    self.allocate_debris();
    self.scatter_debris(problem)?;
    self.select_next_generation();
    Ok(())
  }

  fn finish(&mut self) {
    self.core.finish();
  }

  fn iterations(&self) -> usize {
    self.core.imax
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::optimizer::{CancellationToken, Progress};

  fn seeded(seed: u64) -> MofwOptimizer {
    MofwOptimizer::with_sources(
      Box::new(StdUniform::seed_from_u64(seed)),
      Box::new(StdNormal::seed_from_u64(seed ^ 0xbeef)),
    )
  }

  fn schaffer_like() -> crate::problem::FnMultiProblem<impl Fn(&[f64], &mut [f64])>
  {
    crate::problem::FnMultiProblem::new(
      vec![0.0],
      vec![1.0],
      2,
      |x: &[f64], objs: &mut [f64]| {
        objs[0] = x[0];
        objs[1] = 1.0 - x[0];
      },
    )
  }

  fn set_objs(optimizer: &mut MofwOptimizer, objs: &[[f64; 2]]) {
    for (k, values) in objs.iter().enumerate() {
      let id = optimizer.core.charges[k];
      optimizer.core.arena.get_mut(id).objs_mut().assign(values);
    }
  }

  #[test]
  fn test_ideal_and_nadir_points() {
    let mut optimizer = seeded(1);
    let problem = schaffer_like();
    let params = FwParams::new(3, 3, 2, 1, 4, 1.0).unwrap();
    optimizer.prepare(&params, &problem).unwrap();
    optimizer.first_step(&problem).unwrap();
    set_objs(&mut optimizer, &[[1.0, 5.0], [3.0, 2.0], [0.0, 8.0]]);
    optimizer.update_ideal_and_nadir();
    assert_eq!(optimizer.ideal.as_slice(), &[0.0, 2.0]);
    assert_eq!(optimizer.nadir.as_slice(), &[3.0, 8.0]);
  }

  #[test]
  fn test_pareto_front_excludes_dominated_charges() {
    let mut optimizer = seeded(2);
    let problem = schaffer_like();
    let params = FwParams::new(4, 3, 2, 1, 4, 1.0).unwrap();
    optimizer.prepare(&params, &problem).unwrap();
    optimizer.first_step(&problem).unwrap();
    set_objs(
      &mut optimizer,
      &[[1.0, 4.0], [2.0, 3.0], [3.0, 2.0], [4.0, 5.0]],
    );
    let mut front: Vec<_> = optimizer
      .pareto_front()
      .into_iter()
      .map(|agent| [agent.objs()[0], agent.objs()[1]])
      .collect();
    front.sort_by(|a, b| a[0].total_cmp(&b[0]));
    assert_eq!(front, [[1.0, 4.0], [2.0, 3.0], [3.0, 2.0]]);
  }

  #[test]
  fn test_debris_counts_stay_clamped_over_a_run() {
    let mut optimizer = seeded(3);
    let problem = schaffer_like();
    let params = FwParams::new(8, 5, 4, 2, 6, 1.0).unwrap();
    optimizer.prepare(&params, &problem).unwrap();
    optimizer.first_step(&problem).unwrap();
    for _ in 1..params.imax {
      optimizer.core.iteration += 1;
      optimizer.update_ideal_and_nadir();
      optimizer.allocate_debris();
      for list in &optimizer.core.debris {
        assert!((2..=6).contains(&list.len()));
      }
      optimizer.scatter_debris(&problem).unwrap();
      optimizer.select_next_generation();
    }
  }

  #[test]
  fn test_population_size_is_stable() {
    let mut optimizer = seeded(4);
    let problem = schaffer_like();
    let params = FwParams::new(10, 5, 10, 2, 8, 1.0).unwrap();
    optimizer.minimize(&params, &problem).unwrap();
    assert_eq!(optimizer.core.charges.len(), 10);
  }

  #[test]
  fn test_end_to_end_front_converges() {
    let mut optimizer = seeded(5);
    let problem = schaffer_like();
    let params = FwParams::new(20, 5, 50, 2, 20, 0.5).unwrap();
    optimizer.minimize(&params, &problem).unwrap();
    let front = optimizer.pareto_front();
    assert!(!front.is_empty());
    let close = front
      .iter()
      .filter(|agent| {
        let [f1, f2] = [agent.objs()[0], agent.objs()[1]];
        // distance of (f1, f2) from the true front f1 + f2 = 1
        (f1 + f2 - 1.0).abs() / 2.0f64.sqrt() <= 0.05
      })
      .count();
    assert!(
      close * 2 > front.len(),
      "{close} of {} points near the true front",
      front.len()
    );
  }

  #[test]
  fn test_cancellation_stops_evaluations() {
    let evaluations = Cell::new(0usize);
    let problem = crate::problem::FnMultiProblem::new(
      vec![0.0],
      vec![1.0],
      2,
      |x: &[f64], objs: &mut [f64]| {
        evaluations.set(evaluations.get() + 1);
        objs[0] = x[0];
        objs[1] = 1.0 - x[0];
      },
    );
    let mut optimizer = seeded(6);
    let params = FwParams::new(5, 3, 100, 1, 4, 1.0).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let result = optimizer.minimize_cancellable(&params, &problem, &token);
    assert_eq!(result, Err(FwError::Cancelled { iteration: 1 }));
    // only the initial seeding was evaluated
    assert_eq!(evaluations.get(), 5);
  }

  #[test]
  fn test_progress_is_reported_every_iteration() {
    let mut optimizer = seeded(7);
    let problem = schaffer_like();
    let params = FwParams::new(5, 3, 3, 1, 4, 1.0).unwrap();
    let mut seen = Vec::new();
    {
      let mut reporter = |p: Progress| seen.push(p);
      optimizer
        .minimize_reporting(&params, &problem, &mut reporter)
        .unwrap();
    }
    assert_eq!(
      seen,
      [
        Progress { start: 0, end: 2, current: 0 },
        Progress { start: 0, end: 2, current: 1 },
        Progress { start: 0, end: 2, current: 2 },
      ]
    );
  }

  #[test]
  fn test_non_finite_objective_is_surfaced() {
    let problem = crate::problem::FnMultiProblem::new(
      vec![0.0],
      vec![1.0],
      2,
      |x: &[f64], objs: &mut [f64]| {
        objs[0] = x[0];
        objs[1] = (x[0] - 0.5).ln(); // NaN left of 0.5
      },
    );
    let mut optimizer = seeded(8);
    let params = FwParams::new(5, 3, 10, 1, 4, 1.0).unwrap();
    assert!(matches!(
      optimizer.minimize(&params, &problem),
      Err(FwError::NonFiniteObjective { .. })
    ));
  }

  #[test]
  fn test_repeated_runs_reuse_the_pool() {
    let mut optimizer = seeded(9);
    let problem = schaffer_like();
    // with `m <= smin` every charge scatters exactly `smin` debris, so the
    // arena demand of every run is identical
    let params = FwParams::new(10, 2, 20, 2, 10, 1.0).unwrap();
    optimizer.minimize(&params, &problem).unwrap();
    let allocated = optimizer.core.arena.allocated();
    for _ in 0..3 {
      optimizer.minimize(&params, &problem).unwrap();
      assert_eq!(optimizer.core.arena.allocated(), allocated);
    }
  }

  #[test]
  fn test_invalid_params_fail_before_any_mutation() {
    let mut optimizer = seeded(10);
    let problem = schaffer_like();
    let params = FwParams::builder().np(5).m(3).imax(5).smin(7).smax(2).build();
    assert!(optimizer.minimize(&params, &problem).is_err());
    assert!(optimizer.pareto_front().is_empty());
  }
}
