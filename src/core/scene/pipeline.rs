//=========================================================================
// Scene Pipeline
//=========================================================================
//
// State machine for scene transitions.
//
// Legs:
//   direct:        [target]
//   via loading:   [loading scene, target]
//
// Each leg starts an engine load, samples its progress once per tick,
// and on completion makes the leg's scene current. Only one transition
// may run at a time; a running transition cannot be cancelled.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::{
    LoadStatus, SceneCatalog, SceneError, SceneEvent, SceneKey, SceneLoader, TransitionGate,
    TransitionState,
};
use crate::core::lifecycle::{Subsystem, SubsystemKind};
use crate::core::notify::Notifier;
use crate::core::task::{Step, StepResult};

//=== ScenePipeline =======================================================

/// Scene manager driving engine loads through an optional loading scene.
pub struct ScenePipeline<S: SceneKey> {
    catalog: SceneCatalog<S>,
    loader: Box<dyn SceneLoader>,
    loading_scene: S,
    state: TransitionState<S>,
    active_leg: Option<S>,
    pending_legs: VecDeque<S>,
    last_error: Option<SceneError>,
    gate: TransitionGate,
    events: Notifier<SceneEvent<S>>,
}

impl<S: SceneKey> ScenePipeline<S> {
    //--- Construction -----------------------------------------------------

    /// Creates a pipeline over `loader`.
    ///
    /// `loading_scene` is the reserved intermediate scene used when a
    /// load asks for the loading-scene path.
    pub fn new(catalog: SceneCatalog<S>, loader: Box<dyn SceneLoader>, loading_scene: S) -> Self {
        if !catalog.contains(loading_scene) {
            warn!("[SceneManager] Loading scene {:?} is not in the scene catalog", loading_scene);
        }

        Self {
            catalog,
            loader,
            loading_scene,
            state: TransitionState::default(),
            active_leg: None,
            pending_legs: VecDeque::new(),
            last_error: None,
            gate: TransitionGate::new(),
            events: Notifier::new(),
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn current_scene(&self) -> Option<S> {
        self.state.current_scene
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn progress(&self) -> f32 {
        self.state.progress
    }

    pub fn transition_state(&self) -> TransitionState<S> {
        self.state
    }

    /// Error that ended the most recent transition, if it failed.
    pub fn last_error(&self) -> Option<&SceneError> {
        self.last_error.as_ref()
    }

    /// Busy flag for components that must stay idle during transitions.
    pub fn gate(&self) -> TransitionGate {
        self.gate.clone()
    }

    pub fn catalog(&self) -> &SceneCatalog<S> {
        &self.catalog
    }

    pub fn subscribe(&mut self) -> Receiver<SceneEvent<S>> {
        self.events.subscribe()
    }

    //--- Requests ---------------------------------------------------------

    /// Requests a transition to `target`.
    ///
    /// Returns `Ok(false)` (with a warning) if a transition is already
    /// running or `target` is already current. Unknown scenes and
    /// engine refusals are returned as errors and leave the state as it
    /// was.
    pub fn load_scene(&mut self, target: S, use_loading_scene: bool) -> Result<bool, SceneError> {
        if self.state.is_loading {
            warn!("[SceneManager] Scene load to {:?} refused: a transition is already running", target);
            return Ok(false);
        }

        if self.state.current_scene == Some(target) {
            warn!("[SceneManager] Scene load refused: already in {:?}", target);
            return Ok(false);
        }

        self.start_transition(target, use_loading_scene)
    }

    /// Reloads the current scene.
    ///
    /// Unlike [`ScenePipeline::load_scene`], targeting the current scene
    /// is the whole point here, so only the busy guard applies.
    pub fn reload_scene(&mut self, use_loading_scene: bool) -> Result<bool, SceneError> {
        if self.state.is_loading {
            warn!("[SceneManager] Scene reload refused: a transition is already running");
            return Ok(false);
        }

        let Some(current) = self.state.current_scene else {
            warn!("[SceneManager] Scene reload refused: no scene is loaded");
            return Ok(false);
        };

        self.start_transition(current, use_loading_scene)
    }

    //--- Transition Processing --------------------------------------------

    /// Samples the active leg and advances the transition.
    pub fn poll_transition(&mut self) {
        let Some(leg) = self.active_leg else {
            return;
        };

        match self.loader.poll_load() {
            LoadStatus::Idle => debug!("[SceneManager] Engine reports no load for {:?} yet", leg),
            LoadStatus::InProgress(fraction) => {
                let fraction = fraction.clamp(0.0, 1.0);
                if fraction > self.state.progress {
                    self.state.progress = fraction;
                }
            }
            LoadStatus::Complete => self.complete_leg(leg),
            LoadStatus::Failed(reason) => {
                let scene = self.catalog.id_of(leg).unwrap_or("?").to_string();
                self.abort(leg, SceneError::LoadFailed { scene, reason });
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn start_transition(&mut self, target: S, use_loading_scene: bool) -> Result<bool, SceneError> {
        // Resolve every leg before touching any state.
        self.catalog.resolve(target)?;
        if use_loading_scene {
            self.catalog.resolve(self.loading_scene)?;
        }

        let mut legs = VecDeque::with_capacity(2);
        if use_loading_scene && target != self.loading_scene {
            legs.push_back(self.loading_scene);
        }
        legs.push_back(target);

        let first = legs.pop_front().unwrap_or(target);
        self.begin_leg(first)?;

        info!(
            "[SceneManager] Scene transition {:?} -> {:?} started{}",
            self.state.current_scene,
            target,
            if legs.is_empty() { "" } else { " via loading scene" }
        );

        self.pending_legs = legs;
        self.last_error = None;
        self.state.is_loading = true;
        self.gate.open();

        if let Some(outgoing) = self.state.current_scene {
            self.events.publish(SceneEvent::Unloading(outgoing));
        }

        Ok(true)
    }

    fn begin_leg(&mut self, scene: S) -> Result<(), SceneError> {
        let id = self.catalog.resolve(scene)?.to_string();
        self.loader.begin_load(&id)?;

        debug!("[SceneManager] Scene leg {:?} ('{}') started", scene, id);
        self.state.progress = 0.0;
        self.active_leg = Some(scene);
        Ok(())
    }

    fn complete_leg(&mut self, scene: S) {
        self.state.progress = 1.0;
        self.state.current_scene = Some(scene);
        self.active_leg = None;
        info!("[SceneManager] Scene {:?} loaded", scene);
        self.events.publish(SceneEvent::Loaded(scene));

        let Some(next) = self.pending_legs.pop_front() else {
            self.finish(scene);
            return;
        };

        self.events.publish(SceneEvent::Unloading(scene));
        if let Err(e) = self.begin_leg(next) {
            self.abort(next, e);
        }
    }

    fn finish(&mut self, scene: S) {
        self.state.is_loading = false;
        self.gate.close();
        info!("[SceneManager] Scene transition finished at {:?}", scene);
        self.events.publish(SceneEvent::TransitionFinished(scene));
    }

    fn abort(&mut self, target: S, error: SceneError) {
        error!("[SceneManager] Scene transition to {:?} failed: {}", target, error);

        self.active_leg = None;
        self.pending_legs.clear();
        self.state.is_loading = false;
        self.state.progress = 0.0;
        self.gate.close();

        self.events.publish(SceneEvent::LoadFailed {
            target,
            reason: error.to_string(),
        });
        self.last_error = Some(error);
    }
}

//=== Subsystem ===========================================================

impl<S: SceneKey> Subsystem for ScenePipeline<S> {
    fn name(&self) -> &str {
        "SceneManager"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Manager
    }

    fn on_initialize(&mut self) -> StepResult {
        let active = self.loader.active_scene();
        self.state.current_scene = active.as_deref().and_then(|id| self.catalog.key_of(id));

        match (&active, self.state.current_scene) {
            (Some(id), None) => warn!("[SceneManager] active scene '{}' is not in the catalog", id),
            (_, current) => debug!("[SceneManager] current scene {:?}", current),
        }
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        // Loads cannot be cancelled; wait for the running one to settle.
        if self.state.is_loading {
            self.poll_transition();
            return Ok(Step::Pending);
        }
        Ok(Step::Complete)
    }

    fn update(&mut self, _dt: Duration) {
        self.poll_transition();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
