//=========================================================================
// Scene System
//=========================================================================
//
// Moves the application between declared scenes, optionally through an
// intermediate loading scene, while publishing fractional progress.
//
// Architecture:
//   ScenePipeline
//     ├─ catalog: SceneCatalog<S>   (key <-> engine scene id)
//     ├─ loader: Box<dyn SceneLoader> (engine async-load primitive)
//     ├─ state: TransitionState<S>
//     └─ events: Notifier<SceneEvent<S>>
//
// Flow:
//   load_scene() ──accept──► [Loading leg] ──► target leg ──► finished
//   update() polls the active leg once per tick
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use thiserror::Error;

//=== Module Declarations =================================================

mod catalog;
mod loader;
mod pipeline;

//=== Public API ==========================================================

pub use catalog::SceneCatalog;
pub use loader::{LoadStatus, SceneLoader, SimulatedSceneLoader};
pub use pipeline::ScenePipeline;

//=== Scene Key Trait =====================================================

/// Marker trait for scene identifiers.
///
/// Scene keys are symbolic handles mapped to engine scene identifiers by
/// a [`SceneCatalog`]. Typically implemented by game-specific enums.
pub trait SceneKey: Clone + Copy + Eq + Hash + Debug + Send + 'static {}

//=== Transition State ====================================================

/// Snapshot of the pipeline's observable state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionState<S: SceneKey> {
    /// Scene that finished loading most recently.
    pub current_scene: Option<S>,

    /// `true` from the moment a load is accepted until its final leg
    /// completes or fails.
    pub is_loading: bool,

    /// Completion of the active leg in `[0, 1]`.
    pub progress: f32,
}

impl<S: SceneKey> Default for TransitionState<S> {
    fn default() -> Self {
        Self {
            current_scene: None,
            is_loading: false,
            progress: 0.0,
        }
    }
}

//=== Scene Events ========================================================

/// Notifications published by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent<S: SceneKey> {
    /// The given scene is about to be replaced.
    Unloading(S),

    /// A leg finished and the given scene is now current.
    Loaded(S),

    /// The whole transition finished at the given scene.
    TransitionFinished(S),

    /// The transition towards `target` was abandoned.
    LoadFailed { target: S, reason: String },
}

//=== Scene Errors ========================================================

/// Scene resolution and engine load failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The scene key has no engine identifier in the catalog.
    #[error("scene {0} is not registered in the scene catalog")]
    Unresolved(String),

    /// The engine refused or aborted the load.
    #[error("engine failed to load scene '{scene}': {reason}")]
    LoadFailed { scene: String, reason: String },
}

//=== Transition Gate =====================================================

/// Read-only view of whether a scene transition is running.
///
/// Handed to components that must not start exclusive actions (such as
/// opening a modal popup) while the scene is being swapped. The start
/// counter lets holders notice transitions that began and ended between
/// two of their own ticks.
#[derive(Debug, Clone, Default)]
pub struct TransitionGate {
    inner: Rc<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    busy: Cell<bool>,
    started: Cell<u64>,
}

impl TransitionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a transition is in progress.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.get()
    }

    /// Number of transitions started so far.
    pub fn transitions_started(&self) -> u64 {
        self.inner.started.get()
    }

    pub(crate) fn open(&self) {
        self.inner.busy.set(true);
        self.inner.started.set(self.inner.started.get() + 1);
    }

    pub(crate) fn close(&self) {
        self.inner.busy.set(false);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
