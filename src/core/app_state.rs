//=========================================================================
// Application State Machine
//=========================================================================
//
// Top-level lifecycle of the whole application.
//
// Transitions:
// ```text
//   None ──initialize()──► Initializing ──(registry init done)──► Running
//   Running ──pause()──► Paused ──resume()──► Running
//   Running/Paused ──terminate()──► Terminating ──(registry term done)──► exit
//   Initializing (boot failed) ──terminate()──► Terminating
// ```
//
// Requests that are not in the table are refused with a warning. The Initializing →
// Running and Terminating → exit edges only fire once the registry's
// bulk sequence has fully completed on a later tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::lifecycle::{LifecycleError, Phase, SubsystemRegistry};
use crate::core::notify::Notifier;
use crate::core::task::Step;

//=== ApplicationState ====================================================

/// Process-wide application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplicationState {
    #[default]
    None,
    Initializing,
    Running,
    Paused,
    Terminating,
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

//=== ApplicationStateMachine =============================================

/// Owns the subsystem registry and sequences its bulk phases.
pub struct ApplicationStateMachine {
    state: ApplicationState,
    registry: SubsystemRegistry,
    notifier: Notifier<ApplicationState>,
    boot_failure: Option<String>,
    exited: bool,
}

impl ApplicationStateMachine {
    //--- Construction -----------------------------------------------------

    pub fn new(registry: SubsystemRegistry) -> Self {
        Self {
            state: ApplicationState::None,
            registry,
            notifier: Notifier::new(),
            boot_failure: None,
            exited: false,
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    /// Returns `true` once the terminate sequence has finished.
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Reason the last initialization sequence failed, if it did.
    pub fn boot_failure(&self) -> Option<&str> {
        self.boot_failure.as_deref()
    }

    pub fn registry(&self) -> &SubsystemRegistry {
        &self.registry
    }

    /// Subscribes to state changes.
    ///
    /// Every accepted transition is delivered after `state` has already
    /// been updated. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<ApplicationState> {
        self.notifier.subscribe()
    }

    //--- Requests ---------------------------------------------------------

    /// Starts bringing every subsystem up. Only accepted from `None`.
    pub fn initialize(&mut self) -> bool {
        if self.state != ApplicationState::None {
            warn!("Initialize refused in state {}", self.state);
            return false;
        }

        if let Err(e) = self.registry.initialize_all() {
            warn!("Initialize refused: {}", e);
            return false;
        }

        info!("Application initialization started");
        self.boot_failure = None;
        self.change_state(ApplicationState::Initializing);
        true
    }

    /// Pauses the application and every pausable subsystem.
    pub fn pause(&mut self) -> bool {
        if self.state != ApplicationState::Running {
            warn!("Pause refused in state {}", self.state);
            return false;
        }

        let paused = self.registry.pause_all();
        debug!("Paused {} subsystem(s)", paused);
        self.change_state(ApplicationState::Paused);
        true
    }

    /// Resumes a paused application.
    pub fn resume(&mut self) -> bool {
        if self.state != ApplicationState::Paused {
            warn!("Resume refused in state {}", self.state);
            return false;
        }

        let resumed = self.registry.resume_all();
        debug!("Resumed {} subsystem(s)", resumed);
        self.change_state(ApplicationState::Running);
        true
    }

    /// Starts tearing every subsystem down.
    ///
    /// Accepted from `Running`, `Paused`, and from `Initializing` after
    /// the boot sequence failed. An in-flight boot cannot be cancelled.
    pub fn terminate(&mut self) -> bool {
        match self.state {
            ApplicationState::Running | ApplicationState::Paused => {}
            ApplicationState::Initializing if self.boot_failure.is_some() => {}
            ApplicationState::Initializing => {
                warn!("Terminate refused: initialization still in progress");
                return false;
            }
            ApplicationState::None | ApplicationState::Terminating => {
                warn!("Terminate refused in state {}", self.state);
                return false;
            }
        }

        if let Err(e) = self.registry.terminate_all() {
            warn!("Terminate refused: {}", e);
            return false;
        }

        info!("Application termination started");
        self.change_state(ApplicationState::Terminating);
        true
    }

    //--- Update -----------------------------------------------------------

    /// Advances pending bulk sequences and ticks running subsystems.
    ///
    /// A failing boot leaves the application in `Initializing`; a failing
    /// teardown still ends the process. Both failures are returned.
    pub fn update(&mut self, dt: Duration) -> Result<(), LifecycleError> {
        match self.state {
            ApplicationState::Initializing => {
                if self.registry.running_phase() != Some(Phase::Initialize) {
                    return Ok(());
                }
                match self.registry.poll() {
                    Ok(Step::Pending) => Ok(()),
                    Ok(Step::Complete) => {
                        info!("Application initialization complete");
                        self.change_state(ApplicationState::Running);
                        Ok(())
                    }
                    Err(e) => {
                        error!("Application initialization failed: {}", e);
                        self.boot_failure = Some(e.to_string());
                        Err(e)
                    }
                }
            }
            ApplicationState::Terminating => {
                if self.exited {
                    return Ok(());
                }
                match self.registry.poll() {
                    Ok(Step::Pending) => Ok(()),
                    Ok(Step::Complete) => {
                        info!("Application termination complete");
                        self.exited = true;
                        Ok(())
                    }
                    Err(e) => {
                        error!("Application termination failed: {}", e);
                        self.exited = true;
                        Err(e)
                    }
                }
            }
            ApplicationState::Running | ApplicationState::Paused => {
                self.registry.update_all(dt);
                Ok(())
            }
            ApplicationState::None => Ok(()),
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn change_state(&mut self, new_state: ApplicationState) {
        if self.state == new_state {
            return;
        }

        info!("Application state: {} -> {}", self.state, new_state);
        self.state = new_state;
        self.notifier.publish(new_state);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::{shared, Pausable, Subsystem, SubsystemKind};
    use crate::core::task::StepResult;

    const DT: Duration = Duration::from_millis(16);

    struct Boot {
        name: &'static str,
        kind: SubsystemKind,
        init_ticks: u32,
        polls: u32,
        fail: bool,
    }

    impl Boot {
        fn new(name: &'static str, kind: SubsystemKind) -> Self {
            Self {
                name,
                kind,
                init_ticks: 0,
                polls: 0,
                fail: false,
            }
        }
    }

    impl Subsystem for Boot {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SubsystemKind {
            self.kind
        }

        fn on_initialize(&mut self) -> StepResult {
            if self.fail {
                return Err(LifecycleError::routine(self.name, Phase::Initialize, "no device"));
            }
            self.polls += 1;
            if self.polls <= self.init_ticks {
                Ok(Step::Pending)
            } else {
                Ok(Step::Complete)
            }
        }

        fn on_terminate(&mut self) -> StepResult {
            Ok(Step::Complete)
        }

        fn pausable(&mut self) -> Option<&mut dyn Pausable> {
            Some(self)
        }
    }

    impl Pausable for Boot {
        fn on_pause(&mut self) {}
        fn on_resume(&mut self) {}
    }

    fn machine_with(units: Vec<Boot>) -> ApplicationStateMachine {
        let mut builder = SubsystemRegistry::builder();
        for unit in units {
            builder = builder.register(shared(unit));
        }
        ApplicationStateMachine::new(builder.build())
    }

    fn running_machine() -> ApplicationStateMachine {
        let mut app = machine_with(vec![Boot::new("Sys", SubsystemKind::System)]);
        app.initialize();
        app.update(DT).unwrap();
        assert_eq!(app.state(), ApplicationState::Running);
        app
    }

    #[test]
    fn starts_in_none() {
        let app = machine_with(vec![]);
        assert_eq!(app.state(), ApplicationState::None);
        assert!(!app.has_exited());
    }

    #[test]
    fn running_waits_for_subsystem_init() {
        let slow = Boot {
            init_ticks: 2,
            ..Boot::new("Slow", SubsystemKind::Manager)
        };
        let mut app = machine_with(vec![slow]);

        assert!(app.initialize());
        assert_eq!(app.state(), ApplicationState::Initializing);

        app.update(DT).unwrap();
        app.update(DT).unwrap();
        assert_eq!(app.state(), ApplicationState::Initializing);

        app.update(DT).unwrap();
        assert_eq!(app.state(), ApplicationState::Running);
    }

    #[test]
    fn full_lifecycle_notifies_subscribers_in_order() {
        let mut app = machine_with(vec![Boot::new("Mgr", SubsystemKind::Manager)]);
        let rx = app.subscribe();

        app.initialize();
        app.update(DT).unwrap();
        app.pause();
        app.resume();
        app.terminate();
        app.update(DT).unwrap();

        assert!(app.has_exited());
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![
                ApplicationState::Initializing,
                ApplicationState::Running,
                ApplicationState::Paused,
                ApplicationState::Running,
                ApplicationState::Terminating,
            ]
        );
    }

    #[test]
    fn dropped_subscriber_does_not_block_transitions() {
        let mut app = machine_with(vec![]);
        drop(app.subscribe());
        let live = app.subscribe();

        assert!(app.initialize());
        assert_eq!(live.try_recv(), Ok(ApplicationState::Initializing));
    }

    #[test]
    fn requests_outside_the_table_are_ignored() {
        // None: only initialize is accepted.
        let mut app = machine_with(vec![]);
        assert!(!app.pause());
        assert!(!app.resume());
        assert!(!app.terminate());
        assert_eq!(app.state(), ApplicationState::None);

        // Running: initialize and resume are ignored.
        let mut app = running_machine();
        assert!(!app.initialize());
        assert!(!app.resume());
        assert_eq!(app.state(), ApplicationState::Running);

        // Paused: initialize and pause are ignored.
        assert!(app.pause());
        assert!(!app.initialize());
        assert!(!app.pause());
        assert_eq!(app.state(), ApplicationState::Paused);

        // Terminating: nothing is accepted.
        assert!(app.terminate());
        assert!(!app.initialize());
        assert!(!app.pause());
        assert!(!app.resume());
        assert!(!app.terminate());
        assert_eq!(app.state(), ApplicationState::Terminating);
    }

    //--- Log capture ------------------------------------------------------

    thread_local! {
        static CAPTURED: std::cell::RefCell<Vec<(log::Level, String)>> =
            std::cell::RefCell::new(Vec::new());
    }

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    fn capture_logs() {
        static INSTALL: std::sync::Once = std::sync::Once::new();
        INSTALL.call_once(|| {
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(log::LevelFilter::Trace);
        });
        CAPTURED.with(|c| c.borrow_mut().clear());
    }

    fn captured_warnings() -> Vec<String> {
        CAPTURED.with(|c| {
            c.borrow()
                .iter()
                .filter(|(level, _)| *level == log::Level::Warn)
                .map(|(_, message)| message.clone())
                .collect()
        })
    }

    #[test]
    fn refused_requests_log_warnings() {
        capture_logs();

        let mut app = machine_with(vec![]);
        app.pause();
        app.resume();
        app.terminate();

        let mut app = running_machine();
        app.initialize();

        let warnings: Vec<String> = captured_warnings()
            .into_iter()
            .filter(|m| m.contains("refused in state"))
            .collect();
        assert_eq!(
            warnings,
            vec![
                "Pause refused in state None".to_string(),
                "Resume refused in state None".to_string(),
                "Terminate refused in state None".to_string(),
                "Initialize refused in state Running".to_string(),
            ]
        );
    }

    #[test]
    fn initializing_ignores_pause_resume_and_terminate() {
        let slow = Boot {
            init_ticks: 10,
            ..Boot::new("Slow", SubsystemKind::Manager)
        };
        let mut app = machine_with(vec![slow]);
        app.initialize();

        assert!(!app.initialize());
        assert!(!app.pause());
        assert!(!app.resume());
        assert!(!app.terminate());
        assert_eq!(app.state(), ApplicationState::Initializing);
    }

    #[test]
    fn failed_boot_stays_initializing_until_terminated() {
        let broken = Boot {
            fail: true,
            ..Boot::new("Broken", SubsystemKind::System)
        };
        let mut app = machine_with(vec![Boot::new("Mgr", SubsystemKind::Manager), broken]);

        app.initialize();
        assert!(app.update(DT).is_err());
        assert_eq!(app.state(), ApplicationState::Initializing);
        assert!(app.boot_failure().is_some());

        // Further ticks do not retry the boot.
        app.update(DT).unwrap();
        assert_eq!(app.state(), ApplicationState::Initializing);

        assert!(app.terminate());
        app.update(DT).unwrap();
        assert!(app.has_exited());
        assert!(app.registry().units().all(|u| !u.is_initialized()));
    }

    #[test]
    fn pause_suspends_pausable_subsystems() {
        let mut app = running_machine();
        app.pause();
        assert!(app.registry().get("Sys").unwrap().is_paused());
        app.resume();
        assert!(!app.registry().get("Sys").unwrap().is_paused());
    }

    #[test]
    fn terminate_from_paused_exits() {
        let mut app = running_machine();
        app.pause();
        assert!(app.terminate());
        app.update(DT).unwrap();
        assert!(app.has_exited());
    }
}
