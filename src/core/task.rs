//=========================================================================
// Cooperative Tasks
//=========================================================================
//
// Building blocks for work that spans several ticks.
//
// Every long-running routine (subsystem init/teardown, scene loads,
// timed waits) is polled once per tick by its owner and reports whether
// it needs another tick. Nothing here spawns threads; the tick driver in
// `Engine` is the only scheduler.
//
//   owner.update(dt) ──► routine.poll() ──► Step::Pending  (yield)
//                                       └─► Step::Complete (advance)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== Internal Dependencies ===============================================

use crate::core::lifecycle::LifecycleError;

//=== Step ================================================================

/// Outcome of polling a cooperative routine for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The routine yielded and must be polled again on a later tick.
    Pending,

    /// The routine ran to completion.
    Complete,
}

impl Step {
    /// Returns `true` if the routine finished.
    pub fn is_complete(self) -> bool {
        matches!(self, Step::Complete)
    }
}

/// Result of polling a routine that may fail.
pub type StepResult = Result<Step, LifecycleError>;

//=== Delay ===============================================================

/// Fixed-duration wait advanced by the tick delta.
///
/// ```rust
/// # use std::time::Duration;
/// # use spire_engine::core::task::{Delay, Step};
/// let mut delay = Delay::new(Duration::from_millis(20));
/// assert_eq!(delay.advance(Duration::from_millis(10)), Step::Pending);
/// assert_eq!(delay.advance(Duration::from_millis(10)), Step::Complete);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    remaining: Duration,
}

impl Delay {
    pub fn new(duration: Duration) -> Self {
        Self { remaining: duration }
    }

    /// Consumes `dt` from the remaining time.
    pub fn advance(&mut self, dt: Duration) -> Step {
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            Step::Complete
        } else {
            Step::Pending
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
