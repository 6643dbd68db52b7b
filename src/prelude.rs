//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use spire_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder, EngineCommand, EngineHandle};

// Configuration
pub use crate::config::{Config, EngineConfig, TowerConfig};

// Lifecycle
pub use crate::core::app_state::{ApplicationState, ApplicationStateMachine};
pub use crate::core::lifecycle::{
    shared, LifecycleError, Pausable, Shared, Subsystem, SubsystemKind, SubsystemRegistry,
};
pub use crate::core::task::{Delay, Step, StepResult};

// Scene system
pub use crate::core::scene::{SceneEvent, SceneKey, SceneLoader, ScenePipeline, SimulatedSceneLoader};

// UI, resources and storage
pub use crate::core::resources::{AssetKind, DirectoryAssetSource, MemoryAssetSource, ResourceManager};
pub use crate::core::storage::{KeyValueStore, MemoryStore, RonFileStore};
pub use crate::core::ui::{PopupHandle, UiManager};

// Tower game
pub use crate::tower::{ProgressionEvent, TowerGame, TowerScene};
