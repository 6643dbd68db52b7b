//=========================================================================
// Spire Engine
//
// Main entry point and tick driver.
//
// Architecture:
// ```text
//     EngineBuilder  ──build(registry)──>  Engine  ──run()──>  [Tick Loop]
//         │                                  │
//         ├─ with_tps()                      ├─ drains EngineCommand
//         ├─ with_channel_capacity()         ├─ advances ApplicationStateMachine
//         └─ with_config()                   └─ stops once termination completes
// ```
//
// Any thread may steer the engine through a cloned [`EngineHandle`];
// the subsystems themselves only ever run on the thread calling `run`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::config::EngineConfig;
use crate::core::app_state::{ApplicationState, ApplicationStateMachine};
use crate::core::lifecycle::{LifecycleError, SubsystemRegistry};

//=== EngineCommand =======================================================

/// Requests accepted from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Pause,
    Resume,
    Terminate,
}

//=== EngineHandle ========================================================

/// Cloneable, thread-safe remote control for a running [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: Sender<EngineCommand>,
}

impl EngineHandle {
    /// Queues `command` for the next tick.
    ///
    /// Returns `false` if the queue is full or the engine is gone.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                warn!("Engine command queue full, dropping {:?}", command);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn pause(&self) -> bool {
        self.send(EngineCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(EngineCommand::Resume)
    }

    pub fn terminate(&self) -> bool {
        self.send(EngineCommand::Terminate)
    }
}

//=== TickControl =========================================================

/// Outcome of a single engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (logic updates per second)
/// - **Channel capacity**: 128 commands
/// - **Commands per tick**: 32
///
/// # Examples
///
/// ```no_run
/// use spire_engine::EngineBuilder;
/// use spire_engine::core::lifecycle::SubsystemRegistry;
///
/// let registry = SubsystemRegistry::builder().build();
/// EngineBuilder::new()
///     .with_tps(120.0)
///     .with_channel_capacity(256)
///     .build(registry)
///     .run()
///     .unwrap();
/// ```
pub struct EngineBuilder {
    tps: f64,
    channel_capacity: usize,
    commands_per_tick: usize,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        let defaults = EngineConfig::default();
        Self {
            tps: defaults.tps,
            channel_capacity: defaults.channel_capacity,
            commands_per_tick: defaults.commands_per_tick,
        }
    }

    /// Sets the target ticks per second of [`Engine::run`].
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the capacity of the command channel behind [`EngineHandle`].
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Applies every setting from a loaded [`EngineConfig`].
    ///
    /// # Panics
    ///
    /// Panics on the same values the individual setters reject.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        assert!(config.commands_per_tick > 0, "Commands per tick must be positive");
        let mut builder = self
            .with_tps(config.tps)
            .with_channel_capacity(config.channel_capacity);
        builder.commands_per_tick = config.commands_per_tick;
        builder
    }

    /// Builds the engine around `registry`.
    pub fn build(self, registry: SubsystemRegistry) -> Engine {
        info!(
            "Building engine (TPS: {}, channel: {}, {} subsystem(s))",
            self.tps,
            self.channel_capacity,
            registry.len()
        );

        let (tx, rx) = bounded(self.channel_capacity);

        Engine {
            app: ApplicationStateMachine::new(registry),
            tps: self.tps,
            channel_capacity: self.channel_capacity,
            commands_per_tick: self.commands_per_tick,
            tx,
            rx,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Spire Engine runtime.
///
/// Owns the application state machine and advances it once per tick.
/// Create via [`EngineBuilder`].
pub struct Engine {
    app: ApplicationStateMachine,
    tps: f64,
    channel_capacity: usize,
    commands_per_tick: usize,
    tx: Sender<EngineCommand>,
    rx: Receiver<EngineCommand>,
}

impl Engine {
    //--- Accessors --------------------------------------------------------

    pub fn handle(&self) -> EngineHandle {
        EngineHandle { tx: self.tx.clone() }
    }

    pub fn app(&self) -> &ApplicationStateMachine {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut ApplicationStateMachine {
        &mut self.app
    }

    pub fn tps(&self) -> f64 {
        self.tps
    }

    //--- Execution --------------------------------------------------------

    /// Starts initializing every subsystem.
    pub fn start(&mut self) -> bool {
        self.app.initialize()
    }

    /// Runs one tick: queued commands first, then the application.
    ///
    /// Lifecycle failures are logged and returned; the engine stays
    /// usable afterwards so the caller may still terminate it.
    pub fn tick(&mut self, dt: Duration) -> Result<TickControl, LifecycleError> {
        self.drain_commands();

        if let Err(e) = self.app.update(dt) {
            error!("Tick failed: {}", e);
            return Err(e);
        }

        if self.app.has_exited() {
            Ok(TickControl::Exit)
        } else {
            Ok(TickControl::Continue)
        }
    }

    /// Drives the engine at the configured TPS until termination completes.
    ///
    /// # Lifecycle
    ///
    /// 1. Starts initialization if it has not been started yet
    /// 2. Ticks at a fixed timestep, applying [`EngineHandle`] commands
    /// 3. On a failed boot, tears down whatever came up
    /// 4. Returns once the terminate sequence has finished
    ///
    /// Returns the first lifecycle failure, if any.
    pub fn run(mut self) -> Result<(), LifecycleError> {
        info!(
            "Starting engine runtime (TPS: {}, command queue: {})",
            self.tps, self.channel_capacity
        );

        if self.app.state() == ApplicationState::None {
            self.start();
        }

        let frame_duration = Duration::from_secs_f64(1.0 / self.tps);
        let mut first_error = None;

        loop {
            let frame_start = Instant::now();

            match self.tick(frame_duration) {
                Ok(TickControl::Exit) => break,
                Ok(TickControl::Continue) => {}
                Err(e) => {
                    if self.app.state() == ApplicationState::Initializing {
                        warn!("Boot failed, shutting down");
                        self.app.terminate();
                    }
                    first_error.get_or_insert(e);
                    if self.app.has_exited() {
                        break;
                    }
                }
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }

        info!("Engine shutdown complete");
        first_error.map_or(Ok(()), Err)
    }

    //--- Internal Helpers -------------------------------------------------

    fn drain_commands(&mut self) {
        for command in self.rx.try_iter().take(self.commands_per_tick) {
            let accepted = match command {
                EngineCommand::Pause => self.app.pause(),
                EngineCommand::Resume => self.app.resume(),
                EngineCommand::Terminate => self.app.terminate(),
            };
            debug!("Command {:?} {}", command, if accepted { "applied" } else { "ignored" });
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::{shared, Phase, Shared, Subsystem, SubsystemKind};
    use crate::core::task::{Step, StepResult};

    const DT: Duration = Duration::from_millis(1);

    struct Counter {
        updates: u32,
        fail_init: bool,
    }

    impl Subsystem for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn kind(&self) -> SubsystemKind {
            SubsystemKind::System
        }

        fn on_initialize(&mut self) -> StepResult {
            if self.fail_init {
                return Err(LifecycleError::routine("Counter", Phase::Initialize, "boom"));
            }
            Ok(Step::Complete)
        }

        fn on_terminate(&mut self) -> StepResult {
            Ok(Step::Complete)
        }

        fn update(&mut self, _dt: Duration) {
            self.updates += 1;
        }
    }

    fn engine_with(fail_init: bool) -> (Engine, Shared<Counter>) {
        let counter = shared(Counter {
            updates: 0,
            fail_init,
        });
        let registry = SubsystemRegistry::builder().register(counter.clone()).build();
        (EngineBuilder::new().with_tps(1000.0).build(registry), counter)
    }

    //=====================================================================
    // EngineBuilder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.tps, 60.0);
        assert_eq!(builder.channel_capacity, 128);
        assert_eq!(builder.commands_per_tick, 32);
    }

    #[test]
    fn builder_with_tps() {
        let builder = EngineBuilder::new().with_tps(120.0);
        assert_eq!(builder.tps, 120.0);
    }

    #[test]
    #[should_panic(expected = "TPS must be positive")]
    fn builder_with_tps_panics_on_zero() {
        EngineBuilder::new().with_tps(0.0);
    }

    #[test]
    #[should_panic(expected = "TPS must be positive")]
    fn builder_with_tps_panics_on_negative() {
        EngineBuilder::new().with_tps(-60.0);
    }

    #[test]
    #[should_panic(expected = "Channel capacity must be positive")]
    fn builder_with_channel_capacity_panics_on_zero() {
        EngineBuilder::new().with_channel_capacity(0);
    }

    #[test]
    fn builder_with_config() {
        let config = EngineConfig {
            tps: 30.0,
            channel_capacity: 8,
            commands_per_tick: 2,
        };
        let engine = EngineBuilder::new()
            .with_config(&config)
            .build(SubsystemRegistry::builder().build());

        assert_eq!(engine.tps, 30.0);
        assert_eq!(engine.channel_capacity, 8);
        assert_eq!(engine.commands_per_tick, 2);
    }

    //=====================================================================
    // Engine Tests
    //=====================================================================

    #[test]
    fn commands_steer_the_application() {
        let (mut engine, counter) = engine_with(false);
        let handle = engine.handle();

        assert!(engine.start());
        assert_eq!(engine.tick(DT).unwrap(), TickControl::Continue);
        assert_eq!(engine.app().state(), ApplicationState::Running);

        engine.tick(DT).unwrap();
        assert_eq!(counter.borrow().updates, 1);

        handle.pause();
        engine.tick(DT).unwrap();
        assert_eq!(engine.app().state(), ApplicationState::Paused);

        handle.resume();
        handle.terminate();
        engine.tick(DT).unwrap();
        assert_eq!(engine.app().state(), ApplicationState::Terminating);
        assert_eq!(engine.tick(DT).unwrap(), TickControl::Exit);
    }

    #[test]
    fn commands_are_bounded_per_tick() {
        let counter = shared(Counter {
            updates: 0,
            fail_init: false,
        });
        let registry = SubsystemRegistry::builder().register(counter).build();
        let config = EngineConfig {
            commands_per_tick: 1,
            ..EngineConfig::default()
        };
        let mut engine = EngineBuilder::new().with_config(&config).build(registry);
        let handle = engine.handle();

        engine.start();
        engine.tick(DT).unwrap();

        handle.pause();
        handle.resume();
        engine.tick(DT).unwrap();
        assert_eq!(engine.app().state(), ApplicationState::Paused);
        engine.tick(DT).unwrap();
        assert_eq!(engine.app().state(), ApplicationState::Running);
    }

    #[test]
    fn full_queue_rejects_commands() {
        let engine = EngineBuilder::new()
            .with_channel_capacity(1)
            .build(SubsystemRegistry::builder().build());
        let handle = engine.handle();
        assert!(handle.pause());
        assert!(!handle.pause());

        drop(engine);
        assert!(!handle.terminate());
    }

    #[test]
    fn run_exits_after_remote_terminate() {
        let (engine, _) = engine_with(false);
        let handle = engine.handle();

        let remote = thread::spawn(move || {
            // Terminate is refused until boot finishes, so keep asking.
            while handle.terminate() {
                thread::sleep(Duration::from_millis(5));
            }
        });

        assert!(engine.run().is_ok());
        remote.join().unwrap();
    }

    #[test]
    fn run_reports_boot_failure_and_shuts_down() {
        let (engine, _) = engine_with(true);
        let result = engine.run();
        assert!(matches!(result, Err(LifecycleError::Routine { .. })));
    }
}
