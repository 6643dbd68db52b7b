//=========================================================================
// Subsystem Registry
//=========================================================================
//
// Fixed, ordered set of lifecycle units with bulk phase transitions.
//
// Architecture:
//   RegistryBuilder ──build()──► SubsystemRegistry
//                                  ├─ units: [managers.., systems.., services..]
//                                  └─ sequence: Option<Sequence>
//
// Bulk initialization walks the units front to back, teardown walks them
// back to front. A unit only starts once the previous one completed its
// full routine; the first failure aborts the remaining sequence.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::{error, info, warn};

//=== Internal Dependencies ===============================================

use super::{LifecycleError, LifecycleUnit, Phase, Subsystem, SubsystemKind};
use crate::core::task::{Step, StepResult};

//=== RegistryBuilder =====================================================

/// Collects subsystems before the registry is frozen.
///
/// Units are grouped by [`SubsystemKind`]; within a group they keep
/// declaration order.
///
/// ```rust
/// # use spire_engine::core::lifecycle::{shared, SubsystemRegistry, Subsystem, SubsystemKind};
/// # use spire_engine::core::task::{Step, StepResult};
/// # struct Noop(&'static str, SubsystemKind);
/// # impl Subsystem for Noop {
/// #     fn name(&self) -> &str { self.0 }
/// #     fn kind(&self) -> SubsystemKind { self.1 }
/// #     fn on_initialize(&mut self) -> StepResult { Ok(Step::Complete) }
/// #     fn on_terminate(&mut self) -> StepResult { Ok(Step::Complete) }
/// # }
/// let registry = SubsystemRegistry::builder()
///     .register(shared(Noop("Combat", SubsystemKind::System)))
///     .register(shared(Noop("Scenes", SubsystemKind::Manager)))
///     .build();
///
/// assert_eq!(registry.names(), vec!["Scenes", "Combat"]);
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    units: Vec<LifecycleUnit>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a subsystem. Its group comes from [`Subsystem::kind`].
    pub fn register<T>(mut self, subsystem: Rc<RefCell<T>>) -> Self
    where
        T: Subsystem + 'static,
    {
        let subsystem: Rc<RefCell<dyn Subsystem>> = subsystem;
        let unit = LifecycleUnit::new(subsystem);

        if self.units.iter().any(|u| u.name() == unit.name()) {
            warn!("Subsystem {} registered twice", unit.name());
        }

        self.units.push(unit);
        self
    }

    /// Freezes the declared set into group order.
    pub fn build(mut self) -> SubsystemRegistry {
        // Stable: declaration order survives within each group.
        self.units.sort_by_key(|u| u.kind());

        info!("Subsystem registry built with {} unit(s)", self.units.len());
        SubsystemRegistry {
            units: self.units,
            sequence: None,
        }
    }
}

//=== Sequence ============================================================

/// Cursor over a bulk phase transition in progress.
struct Sequence {
    phase: Phase,
    order: Vec<usize>,
    cursor: usize,
}

//=== SubsystemRegistry ===================================================

/// Ordered collection of lifecycle units driving bulk init/teardown.
pub struct SubsystemRegistry {
    units: Vec<LifecycleUnit>,
    sequence: Option<Sequence>,
}

impl SubsystemRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    //--- Bulk Sequences ---------------------------------------------------

    /// Starts initializing every unit: managers, then systems, then
    /// services, each group in declaration order.
    ///
    /// The sequence advances through [`SubsystemRegistry::poll`].
    pub fn initialize_all(&mut self) -> Result<(), LifecycleError> {
        let order = (0..self.units.len()).collect();
        self.begin(Phase::Initialize, order)
    }

    /// Starts tearing down every unit in the exact reverse of
    /// initialization order.
    pub fn terminate_all(&mut self) -> Result<(), LifecycleError> {
        let order = (0..self.units.len()).rev().collect();
        self.begin(Phase::Terminate, order)
    }

    fn begin(&mut self, phase: Phase, order: Vec<usize>) -> Result<(), LifecycleError> {
        if let Some(running) = &self.sequence {
            warn!("Bulk {} requested while {} is running", phase, running.phase);
            return Err(LifecycleError::SequenceInProgress(running.phase));
        }

        info!("Bulk {} started ({} unit(s))", phase, order.len());
        self.sequence = Some(Sequence {
            phase,
            order,
            cursor: 0,
        });
        Ok(())
    }

    /// Advances the running bulk sequence.
    ///
    /// Units that complete synchronously are chained within the same
    /// call; the first unit that yields ends the call with
    /// `Step::Pending`. Returns `Step::Complete` once the sequence has
    /// finished, or immediately if none is running.
    pub fn poll(&mut self) -> StepResult {
        let Self { units, sequence } = self;

        loop {
            let Some(seq) = sequence.as_mut() else {
                return Ok(Step::Complete);
            };

            let Some(&index) = seq.order.get(seq.cursor) else {
                info!("Bulk {} complete", seq.phase);
                *sequence = None;
                return Ok(Step::Complete);
            };

            let unit = &mut units[index];
            let outcome = match seq.phase {
                Phase::Initialize => unit.initialize(),
                Phase::Terminate => unit.terminate(),
            };

            match outcome {
                Ok(Step::Pending) => return Ok(Step::Pending),
                Ok(Step::Complete) => seq.cursor += 1,
                Err(e) => {
                    error!(
                        "Bulk {} aborted at {} ({} unit(s) skipped)",
                        seq.phase,
                        unit.name(),
                        seq.order.len() - seq.cursor - 1
                    );
                    *sequence = None;
                    return Err(e);
                }
            }
        }
    }

    /// Returns the phase of the running bulk sequence, if any.
    pub fn running_phase(&self) -> Option<Phase> {
        self.sequence.as_ref().map(|s| s.phase)
    }

    //--- Pause / Resume / Update ------------------------------------------

    /// Pauses every pausable unit. Returns how many accepted.
    pub fn pause_all(&mut self) -> usize {
        self.units
            .iter_mut()
            .filter(|u| u.is_pausable())
            .map(|u| u.pause())
            .filter(|accepted| *accepted)
            .count()
    }

    /// Resumes every paused unit. Returns how many accepted.
    pub fn resume_all(&mut self) -> usize {
        self.units
            .iter_mut()
            .filter(|u| u.is_paused())
            .map(|u| u.resume())
            .filter(|accepted| *accepted)
            .count()
    }

    /// Runs per-tick updates on ready, unpaused units in group order.
    pub fn update_all(&mut self, dt: Duration) {
        for unit in &mut self.units {
            unit.update(dt);
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit names in initialization order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&LifecycleUnit> {
        self.units.iter().find(|u| u.name() == name)
    }

    pub fn units(&self) -> impl Iterator<Item = &LifecycleUnit> {
        self.units.iter()
    }

    /// Units of a single group, in declaration order.
    pub fn group(&self, kind: SubsystemKind) -> impl Iterator<Item = &LifecycleUnit> {
        self.units.iter().filter(move |u| u.kind() == kind)
    }

    /// Returns `true` if every unit is initialized.
    pub fn all_initialized(&self) -> bool {
        self.units.iter().all(|u| u.is_initialized())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::{shared, Pausable, UnitState};

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        kind: SubsystemKind,
        journal: Journal,
        yields: u32,
        polls: u32,
        fail_on_init: bool,
    }

    impl Recorder {
        fn new(name: &'static str, kind: SubsystemKind, journal: &Journal) -> Self {
            Self {
                name,
                kind,
                journal: journal.clone(),
                yields: 0,
                polls: 0,
                fail_on_init: false,
            }
        }
    }

    impl Subsystem for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SubsystemKind {
            self.kind
        }

        fn on_initialize(&mut self) -> StepResult {
            if self.fail_on_init {
                return Err(LifecycleError::routine(self.name, Phase::Initialize, "broken"));
            }
            self.polls += 1;
            if self.polls <= self.yields {
                return Ok(Step::Pending);
            }
            self.polls = 0;
            self.journal.borrow_mut().push(format!("init {}", self.name));
            Ok(Step::Complete)
        }

        fn on_terminate(&mut self) -> StepResult {
            self.journal.borrow_mut().push(format!("term {}", self.name));
            Ok(Step::Complete)
        }

        fn pausable(&mut self) -> Option<&mut dyn Pausable> {
            if self.kind == SubsystemKind::System {
                Some(self)
            } else {
                None
            }
        }
    }

    impl Pausable for Recorder {
        fn on_pause(&mut self) {}
        fn on_resume(&mut self) {}
    }

    fn drive(registry: &mut SubsystemRegistry) -> Result<u32, LifecycleError> {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if registry.poll()?.is_complete() {
                return Ok(ticks);
            }
        }
    }

    #[test]
    fn groups_are_ordered_by_kind() {
        let journal = Journal::default();
        let registry = SubsystemRegistry::builder()
            .register(shared(Recorder::new("Svc", SubsystemKind::Service, &journal)))
            .register(shared(Recorder::new("SysA", SubsystemKind::System, &journal)))
            .register(shared(Recorder::new("Mgr", SubsystemKind::Manager, &journal)))
            .register(shared(Recorder::new("SysB", SubsystemKind::System, &journal)))
            .build();

        assert_eq!(registry.names(), vec!["Mgr", "SysA", "SysB", "Svc"]);
        assert_eq!(registry.group(SubsystemKind::System).count(), 2);
    }

    #[test]
    fn terminate_all_reverses_initialize_all() {
        let journal = Journal::default();
        let mut registry = SubsystemRegistry::builder()
            .register(shared(Recorder::new("A", SubsystemKind::Manager, &journal)))
            .register(shared(Recorder::new("B", SubsystemKind::System, &journal)))
            .register(shared(Recorder::new("C", SubsystemKind::Service, &journal)))
            .build();

        registry.initialize_all().unwrap();
        drive(&mut registry).unwrap();
        assert!(registry.all_initialized());

        registry.terminate_all().unwrap();
        drive(&mut registry).unwrap();

        assert_eq!(
            *journal.borrow(),
            vec!["init A", "init B", "init C", "term C", "term B", "term A"]
        );
        assert!(registry.units().all(|u| u.state() == UnitState::Cold));
    }

    #[test]
    fn yielding_unit_blocks_its_successors() {
        let journal = Journal::default();
        let slow = Recorder {
            yields: 2,
            ..Recorder::new("Slow", SubsystemKind::Manager, &journal)
        };
        let mut registry = SubsystemRegistry::builder()
            .register(shared(slow))
            .register(shared(Recorder::new("Next", SubsystemKind::System, &journal)))
            .build();

        registry.initialize_all().unwrap();
        assert_eq!(registry.poll().unwrap(), Step::Pending);
        assert!(journal.borrow().is_empty());
        assert_eq!(registry.poll().unwrap(), Step::Pending);
        assert_eq!(registry.poll().unwrap(), Step::Complete);
        assert_eq!(*journal.borrow(), vec!["init Slow", "init Next"]);
    }

    #[test]
    fn failure_aborts_remaining_units() {
        let journal = Journal::default();
        let broken = Recorder {
            fail_on_init: true,
            ..Recorder::new("Broken", SubsystemKind::System, &journal)
        };
        let mut registry = SubsystemRegistry::builder()
            .register(shared(Recorder::new("First", SubsystemKind::Manager, &journal)))
            .register(shared(broken))
            .register(shared(Recorder::new("Never", SubsystemKind::Service, &journal)))
            .build();

        registry.initialize_all().unwrap();
        assert!(drive(&mut registry).is_err());

        assert_eq!(*journal.borrow(), vec!["init First"]);
        assert_eq!(registry.get("Broken").unwrap().state(), UnitState::Failed);
        assert_eq!(registry.get("Never").unwrap().state(), UnitState::Cold);
        assert_eq!(registry.running_phase(), None);
    }

    #[test]
    fn overlapping_sequences_are_refused() {
        let journal = Journal::default();
        let slow = Recorder {
            yields: 5,
            ..Recorder::new("Slow", SubsystemKind::Manager, &journal)
        };
        let mut registry = SubsystemRegistry::builder().register(shared(slow)).build();

        registry.initialize_all().unwrap();
        registry.poll().unwrap();

        assert!(matches!(
            registry.terminate_all(),
            Err(LifecycleError::SequenceInProgress(Phase::Initialize))
        ));
        assert_eq!(registry.running_phase(), Some(Phase::Initialize));
    }

    #[test]
    fn pause_all_only_touches_pausable_units() {
        let journal = Journal::default();
        let mut registry = SubsystemRegistry::builder()
            .register(shared(Recorder::new("Mgr", SubsystemKind::Manager, &journal)))
            .register(shared(Recorder::new("Sys", SubsystemKind::System, &journal)))
            .build();

        registry.initialize_all().unwrap();
        drive(&mut registry).unwrap();

        assert_eq!(registry.pause_all(), 1);
        assert!(registry.get("Sys").unwrap().is_paused());
        assert!(!registry.get("Mgr").unwrap().is_paused());
        assert_eq!(registry.resume_all(), 1);
        assert!(!registry.get("Sys").unwrap().is_paused());
    }

    #[test]
    fn empty_registry_completes_immediately() {
        let mut registry = SubsystemRegistry::builder().build();
        assert!(registry.is_empty());
        registry.initialize_all().unwrap();
        assert_eq!(drive(&mut registry).unwrap(), 1);
    }
}
