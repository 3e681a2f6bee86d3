//! The single-objective fireworks optimizer.

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
  problem::Problem,
  random::{NormalSource, StdNormal, StdUniform, UniformSource},
};

/// An operator that measures the distance between two candidate positions
/// for the diversity weighting of the single-objective optimizer.
///
/// # Examples
/// ```
/// # use mofw::{optimizer::fireworks::Distance, point::Point};
/// // Manhattan distance
/// let d = |a: &Point, b: &Point| {
///   a.as_slice()
///     .iter()
///     .zip(b.as_slice())
///     .map(|(x, y)| (x - y).abs())
///     .sum::<f64>()
/// };
/// assert_eq!(d.measure(&vec![0.0, 0.0].into(), &vec![1.0, 2.0].into()), 3.0);
/// ```
///
/// **Note that you always can implement this trait instead of using closures.**
pub trait Distance {
  /// Distance between positions `a` and `b`.
  fn measure(&self, a: &Point, b: &Point) -> f64;
}

impl<F> Distance for F
where
  F: Fn(&Point, &Point) -> f64,
{
  fn measure(&self, a: &Point, b: &Point) -> f64 {
    self(a, b)
  }
}

/// Euclidean distance between positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Distance for Euclidean {
  fn measure(&self, a: &Point, b: &Point) -> f64 {
    a.distance(b)
  }
}

/// The single-objective fireworks optimizer.
///
/// The debris budget of a charge grows with its margin over the worst charge
/// and the explosion amplitude shrinks with its margin over the best one, so
/// good charges search their neighborhood densely and finely while poor ones
/// throw a few debris far. Selection keeps the best candidate of the charges
/// and debris union unconditionally and fills the remaining `np - 1` slots
/// by diversity-weighted sampling with the injected distance function.
///
/// # Examples
/// ```no_run
/// use mofw::{
///   optimizer::fireworks::{Euclidean, Fireworks},
///   problem::FnProblem,
///   FireworksHeuristic,
///   FwParams,
/// };
///
/// let sphere = FnProblem::new(vec![-5.0; 2], vec![5.0; 2], |x: &[f64]| {
///   x.iter().map(|v| v * v).sum()
/// });
/// let params = FwParams::builder().np(10).m(20).imax(100).amax(5.0).build();
/// let mut optimizer = Fireworks::new(Euclidean);
/// optimizer.minimize(&params, &sphere).unwrap();
/// let best = optimizer.best().unwrap();
/// println!("{:?} -> {}", best.point(), best.objs()[0]);
/// ```
pub struct Fireworks<D> {
  core: FwCore,
  distance: D,
  union: Vec<AgentId>,
  keep: Vec<AgentId>,
  kept: HashSet<AgentId>,
}

impl<D> Fireworks<D>
where
  D: Distance,
{
  /// Creates an optimizer with entropy-seeded random sources. The distance
  /// function drives the diversity weighting and is required.
  pub fn new(distance: D) -> Self {
    Self::with_sources(
      distance,
      Box::new(StdUniform::from_entropy()),
      Box::new(StdNormal::from_entropy()),
    )
  }

  /// Creates an optimizer with custom random sources. Seeded sources make
  /// a whole run deterministic.
  pub fn with_sources(
    distance: D,
    uniform: Box<dyn UniformSource>,
    normal: Box<dyn NormalSource>,
  ) -> Self {
    Self {
      core: FwCore::new(uniform, normal),
      distance,
      union: Vec::new(),
      keep: Vec::new(),
      kept: HashSet::new(),
    }
  }

  /// Parameters of the last prepared run, if any.
  pub fn params(&self) -> Option<&FwParams> {
    self.core.params.as_ref()
  }

  /// The best charge found so far. `None` before the first run.
  pub fn best(&self) -> Option<&Agent> {
    self
      .core
      .charges
      .iter()
      .map(|&id| self.core.arena.get(id))
      .min_by(|a, b| a.objs()[0].total_cmp(&b.objs()[0]))
  }

  fn eval_agent<P>(&mut self, problem: &P, id: AgentId) -> Result<(), FwError>
  where
    P: Problem,
  {
    let value = problem.evaluate(self.core.arena.get(id).point().as_slice());
    ensure_finite(&[value], self.core.iteration)?;
    self.core.arena.get_mut(id).objs_mut()[0] = value;
    Ok(())
  }

  fn value(&self, id: AgentId) -> f64 {
    self.core.arena.get(id).objs()[0]
  }

  /// Debris budget: charges with a larger margin over the worst value
  /// scatter more debris.
  fn allocate_debris(&mut self) {
    let worst = self
      .core
      .charges
      .iter()
      .map(|&id| self.value(id))
      .fold(f64::NEG_INFINITY, f64::max);
    let mut denominator = KahanSum::new();
    for &id in &self.core.charges {
      denominator.add(worst - self.value(id) + DIV_GUARD);
    }
    let denominator = denominator.sum();
    for charge in 0..self.core.np {
      let margin = worst - self.value(self.core.charges[charge]);
      let share = self.core.m * (margin + DIV_GUARD) / denominator;
      self.core.resize_debris(share, charge);
    }
  }

  /// Explosion amplitude: charges near the best value exploit with small
  /// amplitudes. Scatters and evaluates every debris.
  fn scatter_debris<P>(&mut self, problem: &P) -> Result<(), FwError>
  where
    P: Problem,
  {
    let best = self
      .core
      .charges
      .iter()
      .map(|&id| self.value(id))
      .fold(f64::INFINITY, f64::min);
    let mut denominator = KahanSum::new();
    for &id in &self.core.charges {
      denominator.add(self.value(id) - best + DIV_GUARD);
    }
    let denominator = denominator.sum();
    for charge in 0..self.core.np {
      let margin = self.value(self.core.charges[charge]) - best;
      let amplitude = self.core.amax * (margin + DIV_GUARD) / denominator;
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

  /// Keeps the best candidate of the union unconditionally and fills the
  /// remaining slots by diversity-weighted sampling.
  fn select_next_generation(&mut self) {
    self.union.clear();
    self.union.extend(self.core.charges.iter().copied());
    self.union.extend(self.core.debris.iter().flatten().copied());

    let best_index = self
      .union
      .iter()
      .enumerate()
      .min_by(|&(_, &a), &(_, &b)| self.value(a).total_cmp(&self.value(b)))
      .map(|(index, _)| index)
      .expect("the population is never empty");
    debug!(
      "iteration {}: best value {}",
      self.core.iteration,
      self.value(self.union[best_index])
    );

    self.keep.clear();
    self.keep.push(self.union[best_index]);
    self.core.reset_weighted(
      self
        .union
        .iter()
        .enumerate()
        .filter_map(|(index, &id)| (index != best_index).then_some(id)),
    );
    let remainder = self.core.np - 1;
    if remainder > 0 {
      let distance = &self.distance;
      self
        .core
        .diversity_weights(|a, b| distance.measure(a.point(), b.point()));
      self.core.take_agents(remainder);
      self
        .keep
        .extend(self.core.weighted.iter().filter(|w| w.taken).map(|w| w.id));
    }

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
    debug_assert_eq!(self.core.charges.len(), self.core.np);
  }
}

impl<P, D> FireworksHeuristic<P> for Fireworks<D>
where
  P: Problem,
  D: Distance,
{
  fn prepare(&mut self, params: &FwParams, problem: &P) -> Result<(), FwError> {
    debug_assert_eq!(
      problem.lower_bounds().len(),
      problem.upper_bounds().len(),
      "problem bounds must have equal lengths"
    );
    let dim = problem.lower_bounds().len();
    self.core.init(params, dim, 1)
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
  use super::*;
  use crate::problem::FnProblem;

  fn seeded(seed: u64) -> Fireworks<Euclidean> {
    Fireworks::with_sources(
      Euclidean,
      Box::new(StdUniform::seed_from_u64(seed)),
      Box::new(StdNormal::seed_from_u64(seed ^ 0xbeef)),
    )
  }

  fn sphere() -> FnProblem<impl Fn(&[f64]) -> f64> {
    FnProblem::new(vec![-5.0; 2], vec![5.0; 2], |x: &[f64]| {
      x.iter().map(|v| v * v).sum()
    })
  }

  #[test]
  fn test_best_is_none_before_a_run() {
    let optimizer = seeded(1);
    assert!(optimizer.best().is_none());
  }

  #[test]
  fn test_sphere_converges() {
    let mut optimizer = seeded(2);
    let params = FwParams::new(10, 20, 100, 2, 10, 5.0).unwrap();
    optimizer.minimize(&params, &sphere()).unwrap();
    let best = optimizer.best().unwrap();
    assert!(best.objs()[0] < 0.1, "best value {}", best.objs()[0]);
    assert!(best.point().as_slice().iter().all(|v| v.abs() < 1.0));
  }

  #[test]
  fn test_best_value_never_degrades() {
    let mut optimizer = seeded(3);
    let problem = sphere();
    let params = FwParams::new(8, 10, 30, 2, 8, 5.0).unwrap();
    optimizer.prepare(&params, &problem).unwrap();
    optimizer.first_step(&problem).unwrap();
    let mut best = optimizer.best().unwrap().objs()[0];
    for _ in 1..params.imax {
      optimizer.next_step(&problem).unwrap();
      let next = optimizer.best().unwrap().objs()[0];
      assert!(next <= best, "{next} > {best}");
      best = next;
    }
  }

  #[test]
  fn test_debris_counts_stay_clamped() {
    let mut optimizer = seeded(4);
    let problem = sphere();
    let params = FwParams::new(6, 12, 5, 2, 5, 5.0).unwrap();
    optimizer.prepare(&params, &problem).unwrap();
    optimizer.first_step(&problem).unwrap();
    for _ in 1..params.imax {
      optimizer.core.iteration += 1;
      optimizer.allocate_debris();
      for list in &optimizer.core.debris {
        assert!((2..=5).contains(&list.len()));
      }
      optimizer.scatter_debris(&problem).unwrap();
      optimizer.select_next_generation();
    }
  }

  #[test]
  fn test_population_within_bounds() {
    let mut optimizer = seeded(5);
    let problem = FnProblem::new(vec![1.0, -2.0], vec![2.0, 0.5], |x: &[f64]| {
      x[0] + x[1]
    });
    let params = FwParams::new(10, 10, 20, 2, 8, 10.0).unwrap();
    optimizer.minimize(&params, &problem).unwrap();
    for &id in &optimizer.core.charges {
      let point = optimizer.core.arena.get(id).point();
      assert!((1.0..=2.0).contains(&point[0]));
      assert!((-2.0..=0.5).contains(&point[1]));
    }
  }

  #[test]
  fn test_custom_distance_closure() {
    let manhattan = |a: &Point, b: &Point| {
      a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
    };
    let mut optimizer = Fireworks::with_sources(
      manhattan,
      Box::new(StdUniform::seed_from_u64(6)),
      Box::new(StdNormal::seed_from_u64(7)),
    );
    let params = FwParams::new(5, 5, 10, 1, 5, 5.0).unwrap();
    optimizer.minimize(&params, &sphere()).unwrap();
    assert!(optimizer.best().is_some());
  }

  #[test]
  fn test_single_charge_population() {
    let mut optimizer = seeded(8);
    let params = FwParams::new(1, 3, 10, 2, 5, 5.0).unwrap();
    optimizer.minimize(&params, &sphere()).unwrap();
    assert_eq!(optimizer.core.charges.len(), 1);
  }
}
