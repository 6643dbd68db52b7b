//=========================================================================
// Lifecycle
//=========================================================================
//
// Shared Initialize/Terminate contract for every engine subsystem.
//
// Architecture:
//   Subsystem (trait)          routines supplied by the implementor
//     └─ LifecycleUnit         single-shot guard + state tracking
//          └─ SubsystemRegistry  ordered bulk init / reverse teardown
//
// Subsystems come in three ordering tiers (managers, systems, services)
// and two capability sets (base, pausable). A routine is polled once per
// tick until it reports `Step::Complete` or fails.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::task::StepResult;

//=== Module Declarations =================================================

mod registry;
mod unit;

//=== Public API ==========================================================

pub use registry::{RegistryBuilder, SubsystemRegistry};
pub use unit::{LifecycleUnit, UnitState};

/// Single-threaded shared ownership used for subsystems that other
/// subsystems hold references to.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a value for shared single-threaded access.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

//=== Subsystem Kind ======================================================

/// Ordering tier of a subsystem.
///
/// Managers initialize first, then systems, then services. Teardown runs
/// in the exact reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubsystemKind {
    Manager,
    System,
    Service,
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::System => write!(f, "system"),
            Self::Service => write!(f, "service"),
        }
    }
}

//=== Phase ===============================================================

/// Lifecycle direction of a routine or bulk sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    Terminate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialize"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

//=== LifecycleError ======================================================

/// Failures raised by lifecycle routines and bulk sequences.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A subsystem routine reported a failure.
    #[error("[{name}] {phase} routine failed: {source}")]
    Routine {
        name: String,
        phase: Phase,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// The unit failed earlier and must be terminated before reuse.
    #[error("[{name}] failed during an earlier run and must be terminated before it can initialize again")]
    Poisoned { name: String },

    /// A bulk sequence was requested while another one is still running.
    #[error("a bulk {0} sequence is already running")]
    SequenceInProgress(Phase),
}

impl LifecycleError {
    /// Builds a routine failure for the named subsystem.
    pub fn routine(
        name: impl Into<String>,
        phase: Phase,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Routine {
            name: name.into(),
            phase,
            source: source.into(),
        }
    }
}

//=== Subsystem Trait =====================================================

/// Routines and capabilities supplied by a concrete subsystem.
///
/// Implementors never track their own initialized flag; the owning
/// [`LifecycleUnit`] guards against double initialization and teardown.
///
/// # Minimal Implementation
///
/// ```rust
/// # use spire_engine::core::lifecycle::{Subsystem, SubsystemKind};
/// # use spire_engine::core::task::{Step, StepResult};
/// struct AudioManager;
///
/// impl Subsystem for AudioManager {
///     fn name(&self) -> &str { "AudioManager" }
///     fn kind(&self) -> SubsystemKind { SubsystemKind::Manager }
///     fn on_initialize(&mut self) -> StepResult { Ok(Step::Complete) }
///     fn on_terminate(&mut self) -> StepResult { Ok(Step::Complete) }
/// }
/// ```
pub trait Subsystem {
    /// Identity used in log lines and lookups.
    fn name(&self) -> &str;

    /// Ordering tier.
    fn kind(&self) -> SubsystemKind;

    /// Initialization routine, polled once per tick until complete.
    fn on_initialize(&mut self) -> StepResult;

    /// Teardown routine, polled once per tick until complete.
    ///
    /// Also runs after a failed initialization, so it must tolerate
    /// partially applied setup.
    fn on_terminate(&mut self) -> StepResult;

    /// Per-tick work while initialized and not paused.
    fn update(&mut self, _dt: Duration) {}

    /// Pause/resume capability, if this subsystem supports it.
    fn pausable(&mut self) -> Option<&mut dyn Pausable> {
        None
    }
}

/// Optional capability for subsystems that can be suspended while the
/// application is paused.
pub trait Pausable {
    fn on_pause(&mut self);
    fn on_resume(&mut self);
}
