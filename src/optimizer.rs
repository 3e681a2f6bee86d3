//! Abstract optimizer: the iteration drivers shared by the fireworks
//! variants.

pub mod fireworks;
pub mod mofw;

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{error::FwError, params::FwParams};

/// A snapshot of how far a run has progressed, reported once before the
/// iteration loop and once after every iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
  /// First iteration index, always `0`.
  pub start: usize,
  /// Last iteration index, `imax - 1`.
  pub end: usize,
  /// Index of the last completed iteration.
  pub current: usize,
}

/// An operator that receives progress reports.
///
/// Reporting is synchronous: the optimizer does not start the next iteration
/// until the callback returns, which gives the caller full backpressure
/// control and adds the callback's latency to the run's wall-clock time.
///
/// # Examples
/// ```
/// # use mofw::optimizer::{Progress, ProgressReporter};
/// let mut reporter = |p: Progress| println!("{} of {}", p.current, p.end);
/// reporter.report(Progress { start: 0, end: 9, current: 0 });
/// ```
///
/// **Note that you always can implement this trait instead of using closures.**
pub trait ProgressReporter {
  /// Called with the current progress snapshot.
  fn report(&mut self, progress: Progress);
}

impl<F> ProgressReporter for F
where
  F: FnMut(Progress),
{
  fn report(&mut self, progress: Progress) {
    self(progress)
  }
}

/// A cooperative cancellation flag.
///
/// Clones share the flag, so one clone can be moved to another thread and
/// cancelled there while the optimizer polls the original. Cancellation is
/// coarse-grained: the flag is checked once per iteration boundary, never
/// mid-iteration - an in-flight iteration always completes or is never
/// started.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
  cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
  /// Creates a token that is not cancelled.
  pub fn new() -> Self {
    Self::default()
  }

  /// Raises the flag. Every clone observes the cancellation.
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Relaxed);
  }

  /// Returns `true` once [`cancel`](CancellationToken::cancel) was called.
  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Relaxed)
  }
}

/// The fireworks iteration lifecycle.
///
/// An optimizer variant implements the required steps - validation and
/// sizing, initial seeding, one full iteration, cleanup - and inherits the
/// four `minimize` drivers, which all run the same loop:
/// `prepare` -> `first_step` -> `imax - 1` x `next_step` -> `finish`.
///
/// A failed run skips `finish` so that its state can be inspected; the next
/// `prepare` on the same instance recovers every resource.
pub trait FireworksHeuristic<P> {
  /// Validates `params` and sizes every internal buffer for `problem`.
  /// Nothing is mutated when validation fails.
  fn prepare(
    &mut self,
    params: &FwParams,
    problem: &P,
  ) -> Result<(), FwError>;

  /// Seeds the initial charge population and evaluates it.
  fn first_step(&mut self, problem: &P) -> Result<(), FwError>;

  /// Runs one full iteration: debris budget, explosion, evaluation,
  /// selection of the next generation.
  fn next_step(&mut self, problem: &P) -> Result<(), FwError>;

  /// Returns per-iteration scratch to the internal pool after a completed
  /// run.
  fn finish(&mut self);

  /// Number of iterations of the prepared run.
  fn iterations(&self) -> usize;

  /// Runs the whole minimization.
  ///
  /// # Errors
  ///
  /// [`FwError::InvalidParams`] before any state is mutated, or
  /// [`FwError::NonFiniteObjective`] if an evaluation produces NaN or an
  /// infinity.
  fn minimize(
    &mut self,
    params: &FwParams,
    problem: &P,
  ) -> Result<(), FwError> {
    self.prepare(params, problem)?;
    self.first_step(problem)?;
    for _ in 1..self.iterations() {
      self.next_step(problem)?;
    }
    self.finish();
    Ok(())
  }

  /// Runs the whole minimization, checking `token` once per iteration
  /// boundary.
  ///
  /// # Errors
  ///
  /// As [`minimize`](FireworksHeuristic::minimize), plus
  /// [`FwError::Cancelled`] when the token is raised - the iteration that
  /// was about to start never runs.
  fn minimize_cancellable(
    &mut self,
    params: &FwParams,
    problem: &P,
    token: &CancellationToken,
  ) -> Result<(), FwError> {
    self.prepare(params, problem)?;
    self.first_step(problem)?;
    for iteration in 1..self.iterations() {
      if token.is_cancelled() {
        return Err(FwError::Cancelled { iteration });
      }
      self.next_step(problem)?;
    }
    self.finish();
    Ok(())
  }

  /// Runs the whole minimization, reporting progress to `reporter`.
  ///
  /// # Errors
  ///
  /// As [`minimize`](FireworksHeuristic::minimize).
  fn minimize_reporting<R>(
    &mut self,
    params: &FwParams,
    problem: &P,
    reporter: &mut R,
  ) -> Result<(), FwError>
  where
    R: ProgressReporter,
  {
    self.prepare(params, problem)?;
    self.first_step(problem)?;
    let end = self.iterations() - 1;
    reporter.report(Progress {
      start: 0,
      end,
      current: 0,
    });
    for current in 1..self.iterations() {
      self.next_step(problem)?;
      reporter.report(Progress {
        start: 0,
        end,
        current,
      });
    }
    self.finish();
    Ok(())
  }

  /// Runs the whole minimization with both progress reporting and
  /// cooperative cancellation.
  ///
  /// # Errors
  ///
  /// As [`minimize_cancellable`](FireworksHeuristic::minimize_cancellable).
  fn minimize_reporting_cancellable<R>(
    &mut self,
    params: &FwParams,
    problem: &P,
    reporter: &mut R,
    token: &CancellationToken,
  ) -> Result<(), FwError>
  where
    R: ProgressReporter,
  {
    self.prepare(params, problem)?;
    self.first_step(problem)?;
    let end = self.iterations() - 1;
    reporter.report(Progress {
      start: 0,
      end,
      current: 0,
    });
    for current in 1..self.iterations() {
      if token.is_cancelled() {
        return Err(FwError::Cancelled { iteration: current });
      }
      self.next_step(problem)?;
      reporter.report(Progress {
        start: 0,
        end,
        current,
      });
    }
    self.finish();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancellation_token_is_shared_between_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!token.is_cancelled());
    clone.cancel();
    assert!(token.is_cancelled());
  }

  #[test]
  fn test_closure_as_reporter() {
    let mut seen = Vec::new();
    {
      let mut reporter = |p: Progress| seen.push(p.current);
      for current in 0..3 {
        reporter.report(Progress {
          start: 0,
          end: 2,
          current,
        });
      }
    }
    assert_eq!(seen, [0, 1, 2]);
  }
}
