//! Kahan-compensated summation.

/// An accumulator that sums floating point terms while tracking and
/// correcting the rounding error lost by plain addition.
///
/// The optimizers sum large numbers of small distance terms when computing
/// diversity weights and their normalization denominators; compensated
/// summation keeps the accumulated error bounded regardless of how many
/// terms are added.
#[derive(Clone, Copy, Debug, Default)]
pub struct KahanSum {
  sum: f64,
  compensation: f64,
}

impl KahanSum {
  /// Creates an accumulator holding zero.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `value` to the running sum.
  pub fn add(&mut self, value: f64) {
    let y = value - self.compensation;
    let t = self.sum + y;
    self.compensation = (t - self.sum) - y;
    self.sum = t;
  }

  /// The compensated sum of every added term.
  pub fn sum(&self) -> f64 {
    self.sum
  }

  /// Resets the accumulator to zero.
  pub fn reset(&mut self) {
    self.sum = 0.0;
    self.compensation = 0.0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_small_terms_are_not_lost() {
    let mut kahan = KahanSum::new();
    let mut naive = 0.0f64;
    kahan.add(1.0);
    naive += 1.0;
    for _ in 0..10_000 {
      kahan.add(1e-16);
      naive += 1e-16;
    }
    // naive summation absorbs every 1e-16 term into 1.0
    assert_eq!(naive, 1.0);
    assert!((kahan.sum() - (1.0 + 10_000.0 * 1e-16)).abs() < 1e-15);
  }

  #[test]
  fn test_reset() {
    let mut kahan = KahanSum::new();
    kahan.add(42.0);
    kahan.reset();
    assert_eq!(kahan.sum(), 0.0);
    kahan.add(1.0);
    assert_eq!(kahan.sum(), 1.0);
  }
}
