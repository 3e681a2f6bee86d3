//! Run parameters shared by the fireworks optimizers.

use typed_builder::TypedBuilder;

use crate::error::FwError;

/// Parameters of a fireworks run.
///
/// [`FwParams::new`] validates eagerly and is the recommended constructor.
/// The [`builder`](FwParams::builder) assembles parameters without checking
/// them - compile-time verification from the `typed-builder` crate only
/// guarantees that every required field is set - so builder-made parameters
/// are re-validated when a run starts and rejected there if a constraint is
/// violated.
///
/// # Examples
/// ```
/// # use mofw::FwParams;
/// let params = FwParams::builder().np(20).m(5).imax(50).build();
/// assert!(params.validate().is_ok());
/// ```
#[derive(TypedBuilder, Clone, Copy, Debug, PartialEq)]
pub struct FwParams {
  /// Number of charges kept in the population on every iteration. Must be
  /// at least 1.
  pub np: usize,

  /// Debris budget multiplier: the continuous debris share of a charge is
  /// proportional to `m`. Must be at least 1.
  pub m: usize,

  /// Number of iterations of the main loop. Must be at least 1.
  pub imax: usize,

  /// Fewest debris a single charge may scatter. Must be positive.
  #[builder(default = 1)]
  pub smin: usize,

  /// Most debris a single charge may scatter. Must not be less than
  /// [`smin`](FwParams::smin).
  #[builder(default = 20)]
  pub smax: usize,

  /// Explosion amplitude ceiling. Must be positive.
  #[builder(default = 40.0)]
  pub amax: f64,
}

impl FwParams {
  /// Creates validated parameters.
  ///
  /// # Errors
  ///
  /// Returns [`FwError::InvalidParams`] if any constraint listed on the
  /// fields is violated.
  pub fn new(
    np: usize,
    m: usize,
    imax: usize,
    smin: usize,
    smax: usize,
    amax: f64,
  ) -> Result<Self, FwError> {
    let params = Self {
      np,
      m,
      imax,
      smin,
      smax,
      amax,
    };
    params.validate()?;
    Ok(params)
  }

  /// Checks every field constraint.
  ///
  /// # Errors
  ///
  /// Returns [`FwError::InvalidParams`] naming the first violated
  /// constraint.
  pub fn validate(&self) -> Result<(), FwError> {
    if self.np < 1 {
      return Err(FwError::InvalidParams("`np` must be at least 1"));
    }
    if self.m < 1 {
      return Err(FwError::InvalidParams("`m` must be at least 1"));
    }
    if self.imax < 1 {
      return Err(FwError::InvalidParams("`imax` must be at least 1"));
    }
    if self.smin < 1 {
      return Err(FwError::InvalidParams("`smin` must be positive"));
    }
    if self.smin > self.smax {
      return Err(FwError::InvalidParams("`smin` must not exceed `smax`"));
    }
    if !(self.amax > 0.0) {
      return Err(FwError::InvalidParams("`amax` must be positive"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_valid_params() {
    let params = FwParams::new(20, 5, 50, 2, 20, 40.0).unwrap();
    assert_eq!(params.np, 20);
    assert_eq!(params.smax, 20);
  }

  #[test]
  fn test_builder_defaults_validate() {
    let params = FwParams::builder().np(1).m(1).imax(1).build();
    assert!(params.validate().is_ok());
  }

  #[test]
  fn test_invalid_params_are_rejected() {
    assert!(FwParams::new(0, 5, 50, 2, 20, 40.0).is_err());
    assert!(FwParams::new(20, 0, 50, 2, 20, 40.0).is_err());
    assert!(FwParams::new(20, 5, 0, 2, 20, 40.0).is_err());
    assert!(FwParams::new(20, 5, 50, 0, 20, 40.0).is_err());
    assert!(FwParams::new(20, 5, 50, 21, 20, 40.0).is_err());
    assert!(FwParams::new(20, 5, 50, 2, 20, 0.0).is_err());
    assert!(FwParams::new(20, 5, 50, 2, 20, -1.0).is_err());
    assert!(FwParams::new(20, 5, 50, 2, 20, f64::NAN).is_err());
  }

  #[test]
  fn test_unvalidated_builder_params_fail_validation() {
    let params = FwParams::builder().np(10).m(3).imax(5).smin(9).smax(4).build();
    assert_eq!(
      params.validate(),
      Err(FwError::InvalidParams("`smin` must not exceed `smax`"))
    );
  }
}
