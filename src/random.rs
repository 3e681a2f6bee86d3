//! Random sources injected into the optimizers.
//!
//! The engine never touches a global or thread-local generator: every
//! optimizer owns its sources, so separate instances run on separate threads
//! without contention and a seeded source makes a whole run deterministic.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// A source of uniformly distributed values.
///
/// # Examples
/// ```
/// # use mofw::random::UniformSource;
/// let mut u = |low: f64, high: f64| (low + high) / 2.0;
/// assert_eq!(u.sample(0.0, 2.0), 1.0);
/// ```
///
/// **Note that you always can implement this trait instead of using closures.**
pub trait UniformSource {
  /// Samples a value uniformly distributed over `[low, high)`.
  ///
  /// # Panics
  ///
  /// Panics if `low > high`.
  fn sample(&mut self, low: f64, high: f64) -> f64;
}

impl<F> UniformSource for F
where
  F: FnMut(f64, f64) -> f64,
{
  fn sample(&mut self, low: f64, high: f64) -> f64 {
    self(low, high)
  }
}

/// A source of normally distributed values.
pub trait NormalSource {
  /// Samples a normally distributed value with the given mean and standard
  /// deviation.
  ///
  /// # Panics
  ///
  /// Panics if `std_dev < 0`.
  fn sample(&mut self, mean: f64, std_dev: f64) -> f64;
}

/// A uniform source backed by [`StdRng`].
#[derive(Clone, Debug)]
pub struct StdUniform {
  rng: StdRng,
}

impl StdUniform {
  /// Creates a source seeded from system entropy.
  pub fn from_entropy() -> Self {
    Self {
      rng: StdRng::from_entropy(),
    }
  }

  /// Creates a deterministic source from `seed`.
  pub fn seed_from_u64(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }
}

impl Default for StdUniform {
  fn default() -> Self {
    Self::from_entropy()
  }
}

impl UniformSource for StdUniform {
  fn sample(&mut self, low: f64, high: f64) -> f64 {
    assert!(low <= high, "`low` must not exceed `high`");
    if low == high {
      return low;
    }
    self.rng.gen_range(low..high)
  }
}

/// A normal source backed by [`StdRng`].
#[derive(Clone, Debug)]
pub struct StdNormal {
  rng: StdRng,
}

impl StdNormal {
  /// Creates a source seeded from system entropy.
  pub fn from_entropy() -> Self {
    Self {
      rng: StdRng::from_entropy(),
    }
  }

  /// Creates a deterministic source from `seed`.
  pub fn seed_from_u64(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }
}

impl Default for StdNormal {
  fn default() -> Self {
    Self::from_entropy()
  }
}

impl NormalSource for StdNormal {
  fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
    let normal =
      Normal::new(mean, std_dev).expect("standard deviation must not be negative");
    normal.sample(&mut self.rng)
  }
}
