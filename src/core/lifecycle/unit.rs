//=========================================================================
// Lifecycle Unit
//=========================================================================
//
// Single-shot guard around a subsystem's routines.
//
// State flow:
//   Cold ──initialize()──► Initializing ──► Ready
//   Ready/Failed ──terminate()──► Terminating ──► Cold
//   Initializing/Terminating ──routine error──► Failed
//
// Requests in the direction the unit already sits in are logged as
// warnings and ignored.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::{LifecycleError, Subsystem, SubsystemKind};
use crate::core::task::{Step, StepResult};

//=== UnitState ===========================================================

/// Lifecycle position of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Never initialized, or torn down.
    Cold,

    /// Initialization routine in flight.
    Initializing,

    /// Initialized and usable.
    Ready,

    /// Teardown routine in flight.
    Terminating,

    /// A routine failed; only `terminate()` is accepted.
    Failed,
}

//=== LifecycleUnit =======================================================

/// A registered subsystem together with its lifecycle state.
pub struct LifecycleUnit {
    subsystem: Rc<RefCell<dyn Subsystem>>,
    name: String,
    kind: SubsystemKind,
    state: UnitState,
    paused: bool,
}

impl LifecycleUnit {
    pub fn new(subsystem: Rc<RefCell<dyn Subsystem>>) -> Self {
        let (name, kind) = {
            let inner = subsystem.borrow();
            (inner.name().to_string(), inner.kind())
        };

        Self {
            subsystem,
            name,
            kind,
            state: UnitState::Cold,
            paused: false,
        }
    }

    //--- Accessors --------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SubsystemKind {
        self.kind
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == UnitState::Ready
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    //--- Initialize / Terminate -------------------------------------------

    /// Starts or continues the initialization routine.
    ///
    /// Returns `Ok(Step::Pending)` while the routine yields. Calling this
    /// on a ready unit logs a warning and completes without effect.
    pub fn initialize(&mut self) -> StepResult {
        match self.state {
            UnitState::Ready => {
                warn!("[{}] already initialized", self.name);
                return Ok(Step::Complete);
            }
            UnitState::Failed => {
                warn!("[{}] initialize refused: unit failed earlier", self.name);
                return Err(LifecycleError::Poisoned {
                    name: self.name.clone(),
                });
            }
            UnitState::Terminating => {
                warn!("[{}] initialize requested while terminating, ignoring", self.name);
                return Ok(Step::Complete);
            }
            UnitState::Cold => {
                info!("[{}] initialize started", self.name);
                self.state = UnitState::Initializing;
            }
            UnitState::Initializing => {}
        }

        let outcome = self.subsystem.borrow_mut().on_initialize();
        match outcome {
            Ok(Step::Pending) => Ok(Step::Pending),
            Ok(Step::Complete) => {
                self.state = UnitState::Ready;
                info!("[{}] initialize complete", self.name);
                Ok(Step::Complete)
            }
            Err(e) => {
                self.state = UnitState::Failed;
                error!("[{}] initialize failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    /// Starts or continues the teardown routine.
    ///
    /// Calling this on a cold unit logs a warning and completes without
    /// effect. A failed unit runs its teardown to clean up partial work.
    pub fn terminate(&mut self) -> StepResult {
        match self.state {
            UnitState::Cold => {
                warn!("[{}] not initialized", self.name);
                return Ok(Step::Complete);
            }
            UnitState::Initializing => {
                warn!("[{}] terminate requested mid-initialize, ignoring", self.name);
                return Ok(Step::Complete);
            }
            UnitState::Ready => {
                info!("[{}] terminate started", self.name);
                self.state = UnitState::Terminating;
            }
            UnitState::Failed => {
                info!("[{}] terminate started (cleaning up after failure)", self.name);
                self.state = UnitState::Terminating;
            }
            UnitState::Terminating => {}
        }

        let outcome = self.subsystem.borrow_mut().on_terminate();
        match outcome {
            Ok(Step::Pending) => Ok(Step::Pending),
            Ok(Step::Complete) => {
                self.state = UnitState::Cold;
                self.paused = false;
                info!("[{}] terminate complete", self.name);
                Ok(Step::Complete)
            }
            Err(e) => {
                self.state = UnitState::Failed;
                error!("[{}] terminate failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    //--- Pause / Resume ---------------------------------------------------

    /// Pauses a pausable unit. Returns whether the request was accepted.
    pub fn pause(&mut self) -> bool {
        if !self.is_initialized() {
            warn!("[{}] pause refused: not initialized", self.name);
            return false;
        }
        if self.paused {
            warn!("[{}] already paused", self.name);
            return false;
        }

        let mut inner = self.subsystem.borrow_mut();
        let Some(pausable) = inner.pausable() else {
            debug!("[{}] is not pausable", self.name);
            return false;
        };

        pausable.on_pause();
        self.paused = true;
        info!("[{}] paused", self.name);
        true
    }

    /// Resumes a paused unit. Returns whether the request was accepted.
    pub fn resume(&mut self) -> bool {
        if !self.is_initialized() {
            warn!("[{}] resume refused: not initialized", self.name);
            return false;
        }
        if !self.paused {
            warn!("[{}] not paused", self.name);
            return false;
        }

        let mut inner = self.subsystem.borrow_mut();
        let Some(pausable) = inner.pausable() else {
            return false;
        };

        pausable.on_resume();
        self.paused = false;
        info!("[{}] resumed", self.name);
        true
    }

    /// Returns `true` if the subsystem exposes the pausable capability.
    pub fn is_pausable(&self) -> bool {
        self.subsystem.borrow_mut().pausable().is_some()
    }

    //--- Update -----------------------------------------------------------

    /// Runs the per-tick update if the unit is ready and not paused.
    pub fn update(&mut self, dt: Duration) {
        if self.state == UnitState::Ready && !self.paused {
            self.subsystem.borrow_mut().update(dt);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
