//! Shared per-iteration machinery of the fireworks optimizers.
//!
//! [`FwCore`] owns the populations, the agent arena and every scratch buffer
//! an iteration needs, and supplies the numeric primitives - debris-count
//! clamping, axis-subset sampling, the two explosion operators,
//! diversity-weight computation and weighted sampling without replacement.
//! The optimizer variants invoke these primitives in their own order and
//! supply the objective-aware policies on top.

use std::{cmp::Reverse, collections::BinaryHeap};

use log::warn;

use crate::{
  agent::{Agent, AgentArena, AgentId},
  error::FwError,
  kahan::KahanSum,
  matrix::SymmetricMatrix,
  params::FwParams,
  point::Point,
  random::{NormalSource, UniformSource},
};

/// Small constant keeping budget and amplitude denominators away from zero.
pub(crate) const DIV_GUARD: f64 = 1e-10;

/// A candidate considered for the next-generation selection. The id borrows
/// an agent that stays owned by its charge or debris slot; the scratch list
/// is rebuilt every iteration and never persisted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WeightedAgent {
  pub id: AgentId,
  pub weight: f64,
  pub taken: bool,
}

/// Key of the bounded min-priority-queue used by weighted sampling.
#[derive(Clone, Copy, Debug)]
struct SampleKey {
  key: f64,
  index: usize,
}

impl PartialEq for SampleKey {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == std::cmp::Ordering::Equal
  }
}

impl Eq for SampleKey {}

impl PartialOrd for SampleKey {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for SampleKey {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self
      .key
      .total_cmp(&other.key)
      .then_with(|| self.index.cmp(&other.index))
  }
}

/// Shared state of a fireworks run.
pub(crate) struct FwCore {
  pub params: Option<FwParams>,
  pub np: usize,
  pub m: f64,
  pub imax: usize,
  pub amax: f64,
  min_debris: usize,
  max_debris: usize,
  /// Index of the iteration currently being computed.
  pub iteration: usize,
  pub arena: AgentArena,
  /// Persistent explosion centers, `np` of them for a whole run.
  pub charges: Vec<AgentId>,
  /// Per-charge debris lists, resized every iteration.
  pub debris: Vec<Vec<AgentId>>,
  /// Next-generation candidates, rebuilt every iteration.
  pub weighted: Vec<WeightedAgent>,
  axes: Vec<usize>,
  distances: SymmetricMatrix,
  row_sum: KahanSum,
  total_sum: KahanSum,
  charge_position: Point,
  pub uniform: Box<dyn UniformSource>,
  pub normal: Box<dyn NormalSource>,
}

impl FwCore {
  pub fn new(
    uniform: Box<dyn UniformSource>,
    normal: Box<dyn NormalSource>,
  ) -> Self {
    Self {
      params: None,
      np: 0,
      m: 0.0,
      imax: 0,
      amax: 0.0,
      min_debris: 0,
      max_debris: 0,
      iteration: 0,
      arena: AgentArena::new(),
      charges: Vec::new(),
      debris: Vec::new(),
      weighted: Vec::new(),
      axes: Vec::new(),
      distances: SymmetricMatrix::new(0),
      row_sum: KahanSum::new(),
      total_sum: KahanSum::new(),
      charge_position: Point::default(),
      uniform,
      normal,
    }
  }

  /// Validates `params` and sizes every buffer for a run over
  /// `dim`-dimensional positions with `dim_objs` objectives. Populations
  /// surviving from a previous run are returned to the arena first, so
  /// repeated runs with unchanged parameters reuse the same slots.
  pub fn init(
    &mut self,
    params: &FwParams,
    dim: usize,
    dim_objs: usize,
  ) -> Result<(), FwError> {
    params.validate()?;
    self.params = Some(*params);
    self.np = params.np;
    self.m = params.m as f64;
    self.imax = params.imax;
    self.amax = params.amax;
    self.min_debris = params.smin;
    self.max_debris = params.smax;
    self.iteration = 0;

    for id in self.charges.drain(..) {
      self.arena.release(id);
    }
    for list in &mut self.debris {
      for id in list.drain(..) {
        self.arena.release(id);
      }
    }
    self.debris.resize_with(params.np, Vec::new);
    self.arena.reset(dim, dim_objs, params.np * params.smax / 2);

    self.axes.clear();
    self.axes.resize(dim, 0);
    self.charges.reserve(params.np);
    // steady-state estimate of the scratch population, grown on demand
    let scratch = params.np - 1 + params.np * params.smin;
    self.weighted.clear();
    self.weighted.reserve(scratch);
    self.distances.resize(scratch);
    self.charge_position = Point::new(0.0, dim);
    Ok(())
  }

  /// Seeds `np` charges uniformly at random within the bounds.
  pub fn seed_charges(&mut self, lower: &[f64], upper: &[f64]) {
    for _ in 0..self.np {
      let id = self.arena.acquire();
      let mut point = self.arena.take_point(id);
      for j in 0..lower.len() {
        point[j] = self.uniform.sample(lower[j], upper[j]);
      }
      self.arena.put_point(id, point);
      self.charges.push(id);
    }
  }

  /// Converts the continuous debris share `share` into a count clamped to
  /// `[smin, smax]` and grows or shrinks the debris list of `charge` to
  /// match, recycling agents through the arena. Shrinking removes from the
  /// tail; list order carries no meaning.
  pub fn resize_debris(&mut self, share: f64, charge: usize) {
    let count = (share.trunc() as usize).clamp(self.min_debris, self.max_debris);
    let list = &mut self.debris[charge];
    while list.len() > count {
      let id = list.pop().expect("list is longer than `count`");
      self.arena.release(id);
    }
    while list.len() < count {
      list.push(self.arena.acquire());
    }
  }

  /// Samples `take` distinct axis indices out of `0..dim` uniformly with a
  /// single-pass partial Fisher-Yates reservoir: the first `take` indices
  /// are taken verbatim; each later index `t` draws `j` in `[0, t]` and
  /// overwrites slot `j` only when `j < take`. The chosen subset lands in
  /// `self.axes[..take]` in arbitrary order.
  fn sample_axes(&mut self, take: usize) {
    debug_assert!(take <= self.axes.len());
    for axis in 0..self.axes.len() {
      if axis < take {
        self.axes[axis] = axis;
      } else {
        let j = self.uniform.sample(0.0, (axis + 1) as f64) as usize;
        if j < take {
          self.axes[j] = axis;
        }
      }
    }
  }

  /// Shift spark: perturbs `count` sampled axes of `splinter` by
  /// `amplitude * U(-1, 1)`. A value below the lower bound is re-drawn
  /// uniformly in `[lower, midpoint]`; a value above the upper bound is
  /// clamped to the bound exactly, not re-drawn.
  fn shift_spark(
    &mut self,
    splinter: AgentId,
    count: usize,
    amplitude: f64,
    lower: &[f64],
    upper: &[f64],
  ) {
    self.sample_axes(count);
    let mut point = self.arena.take_point(splinter);
    for i in 0..count {
      let axis = self.axes[i];
      point[axis] += amplitude * self.uniform.sample(-1.0, 1.0);
      if point[axis] < lower[axis] {
        point[axis] = self
          .uniform
          .sample(lower[axis], 0.5 * (lower[axis] + upper[axis]));
      } else if point[axis] > upper[axis] {
        point[axis] = upper[axis];
      }
    }
    self.arena.put_point(splinter, point);
  }

  /// Scale spark: multiplies `count` sampled axes of `splinter` by
  /// `N(1, 1)`. Bound violations are re-drawn uniformly in
  /// `[lower, midpoint]` or `[midpoint, upper]`.
  fn scale_spark(
    &mut self,
    splinter: AgentId,
    count: usize,
    lower: &[f64],
    upper: &[f64],
  ) {
    self.sample_axes(count);
    let mut point = self.arena.take_point(splinter);
    for i in 0..count {
      let axis = self.axes[i];
      point[axis] *= self.normal.sample(1.0, 1.0);
      let midpoint = 0.5 * (lower[axis] + upper[axis]);
      if point[axis] < lower[axis] {
        point[axis] = self.uniform.sample(lower[axis], midpoint);
      } else if point[axis] > upper[axis] {
        point[axis] = self.uniform.sample(midpoint, upper[axis]);
      }
    }
    self.arena.put_point(splinter, point);
  }

  /// Scatters every debris of `charge`: each splinter is reset to the
  /// charge's position, then perturbed along `ceil(dim * xi)` random axes,
  /// with `xi ~ U(0, 1)` also picking the operator - the shift spark below
  /// `0.5`, the scale spark otherwise.
  pub fn explode_charge(
    &mut self,
    charge: usize,
    amplitude: f64,
    lower: &[f64],
    upper: &[f64],
  ) {
    let dim = lower.len();
    self
      .charge_position
      .set_from(self.arena.get(self.charges[charge]).point());
    for k in 0..self.debris[charge].len() {
      let splinter = self.debris[charge][k];
      self
        .arena
        .get_mut(splinter)
        .point_mut()
        .set_from(&self.charge_position);
      let xi = self.uniform.sample(0.0, 1.0);
      let count = (dim as f64 * xi).ceil() as usize;
      if xi < 0.5 {
        self.shift_spark(splinter, count, amplitude, lower, upper);
      } else {
        self.scale_spark(splinter, count, lower, upper);
      }
    }
  }

  /// Rebuilds the weighted scratch list from `ids` and sizes the distance
  /// matrix to match.
  pub fn reset_weighted<I>(&mut self, ids: I)
  where
    I: IntoIterator<Item = AgentId>,
  {
    self.weighted.clear();
    self.weighted.extend(ids.into_iter().map(|id| WeightedAgent {
      id,
      weight: 0.0,
      taken: false,
    }));
    self.distances.resize(self.weighted.len());
  }

  /// Computes a probability-like diversity weight for every scratch
  /// candidate: the pairwise distance matrix is filled (upper triangle
  /// only), each candidate's distances to all others are summed with
  /// compensation, and the row sums are normalized by the compensated grand
  /// total. Candidates far from the rest weigh more.
  ///
  /// If any normalized weight comes out NaN, infinite or non-positive -
  /// distances collapse when points coincide - all weights are discarded
  /// for the uniform distribution `1/N`.
  pub fn diversity_weights<F>(&mut self, mut distance: F)
  where
    F: FnMut(&Agent, &Agent) -> f64,
  {
    let n = self.weighted.len();
    if n == 0 {
      return;
    }
    for i in 0..n {
      for j in (i + 1)..n {
        let d = distance(
          self.arena.get(self.weighted[i].id),
          self.arena.get(self.weighted[j].id),
        );
        self.distances.set(i, j, d);
      }
    }

    self.total_sum.reset();
    for i in 0..n {
      self.row_sum.reset();
      for j in 0..n {
        self.row_sum.add(self.distances.get(i, j));
      }
      self.weighted[i].weight = self.row_sum.sum();
      self.total_sum.add(self.row_sum.sum());
    }

    let total = self.total_sum.sum();
    let mut degenerate = false;
    for candidate in &mut self.weighted {
      candidate.weight /= total;
      if !candidate.weight.is_finite() || candidate.weight <= 0.0 {
        degenerate = true;
        break;
      }
    }
    if degenerate {
      warn!("diversity weights degenerated, substituting the uniform distribution");
      let uniform_weight = 1.0 / n as f64;
      for candidate in &mut self.weighted {
        candidate.weight = uniform_weight;
      }
    }
  }

  /// Weighted random sampling without replacement after Efraimidis and
  /// Spirakis (2006): every candidate `i` draws the key `U(0,1)^(1/w_i)`
  /// and the `total` largest keys win, tracked in a bounded
  /// min-priority-queue that only replaces its minimum when beaten. Marks
  /// the winners' `taken` flags; runs in `O(N log total)`.
  pub fn take_agents(&mut self, total: usize) {
    let mut queue: BinaryHeap<Reverse<SampleKey>> =
      BinaryHeap::with_capacity(total + 1);
    for (index, candidate) in self.weighted.iter().enumerate() {
      let key = self.uniform.sample(0.0, 1.0).powf(1.0 / candidate.weight);
      if queue.len() < total {
        queue.push(Reverse(SampleKey { key, index }));
      } else if let Some(Reverse(min)) = queue.peek() {
        if key >= min.key {
          queue.pop();
          queue.push(Reverse(SampleKey { key, index }));
        }
      }
    }
    for Reverse(winner) in queue {
      self.weighted[winner.index].taken = true;
    }
  }

  /// Ends a run: debris lists and the weighted scratch go back to the
  /// arena. Charges survive so the front and best-solution accessors keep
  /// working; the next [`init`](FwCore::init) recycles them.
  pub fn finish(&mut self) {
    for list in &mut self.debris {
      for id in list.drain(..) {
        self.arena.release(id);
      }
    }
    self.weighted.clear();
  }
}

/// Fails with [`FwError::NonFiniteObjective`] unless every value in `objs`
/// is finite.
pub(crate) fn ensure_finite(
  objs: &[f64],
  iteration: usize,
) -> Result<(), FwError> {
  if objs.iter().all(|value| value.is_finite()) {
    Ok(())
  } else {
    Err(FwError::NonFiniteObjective { iteration })
  }
}
