//=========================================================================
// Tower Climb
//=========================================================================
//
// Game layer: scenes, floor maps, progression and the startup splash,
// wired together over the core lifecycle and scene pipeline.
//
// Assembly (initialization order):
//   managers: ResourceManager, SceneManager, UIManager
//   systems:  MapSystem, ProgressionSystem
//   services: BootSequence
//
//=========================================================================

//=== Module Declarations =================================================

pub mod boot;
pub mod map;
pub mod progression;

//=== Public API ==========================================================

pub use boot::{BootSequence, BootStage};
pub use map::{MapError, MapKind, MapSystem, Tile, TileGrid};
pub use progression::{ProgressionEvent, ProgressionSystem, MAX_REACHED_FLOOR_KEY};

//=== Internal Dependencies ===============================================

use crate::config::TowerConfig;
use crate::core::lifecycle::{shared, Shared, SubsystemRegistry};
use crate::core::resources::{AssetSource, ResourceManager};
use crate::core::scene::{SceneCatalog, SceneKey, SceneLoader, ScenePipeline};
use crate::core::storage::KeyValueStore;
use crate::core::ui::UiManager;

//=== TowerScene ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TowerScene {
    StartUp,
    MainMenu,
    Game,
    Loading,
}

impl SceneKey for TowerScene {}

impl TowerScene {
    pub const ALL: [TowerScene; 4] = [
        TowerScene::StartUp,
        TowerScene::MainMenu,
        TowerScene::Game,
        TowerScene::Loading,
    ];

    /// Engine scene identifier.
    pub fn scene_id(self) -> &'static str {
        match self {
            TowerScene::StartUp => "StartUp",
            TowerScene::MainMenu => "MainMenu",
            TowerScene::Game => "Game",
            TowerScene::Loading => "Loading",
        }
    }
}

/// Catalog mapping every tower scene to its engine identifier.
pub fn catalog() -> SceneCatalog<TowerScene> {
    TowerScene::ALL
        .into_iter()
        .fold(SceneCatalog::new(), |catalog, scene| catalog.with(scene, scene.scene_id()))
}

//=== TowerGame ===========================================================

/// Typed handles to every tower subsystem.
///
/// The registry built by [`TowerGame::registry`] shares these same
/// instances, so game code can drive them while the lifecycle runs.
pub struct TowerGame {
    pub resources: Shared<ResourceManager>,
    pub scenes: Shared<ScenePipeline<TowerScene>>,
    pub ui: Shared<UiManager>,
    pub maps: Shared<MapSystem>,
    pub progression: Shared<ProgressionSystem>,
    pub boot: Shared<BootSequence>,
}

impl TowerGame {
    /// Builds every subsystem, injecting each one's collaborators.
    pub fn assemble(
        config: &TowerConfig,
        loader: Box<dyn SceneLoader>,
        assets: Box<dyn AssetSource>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let resources = shared(ResourceManager::new(assets));
        let scenes = shared(ScenePipeline::new(catalog(), loader, TowerScene::Loading));
        let gate = scenes.borrow().gate();
        let ui = shared(UiManager::new(resources.clone(), gate));

        let maps = shared(MapSystem::new(resources.clone(), config.map_seed));
        let progression = shared(ProgressionSystem::new(
            config.clone(),
            scenes.clone(),
            maps.clone(),
            store,
        ));

        let boot = shared(BootSequence::new(scenes.clone(), config));

        Self {
            resources,
            scenes,
            ui,
            maps,
            progression,
            boot,
        }
    }

    /// Registry over the assembled subsystems.
    pub fn registry(&self) -> SubsystemRegistry {
        SubsystemRegistry::builder()
            .register(self.resources.clone())
            .register(self.scenes.clone())
            .register(self.ui.clone())
            .register(self.maps.clone())
            .register(self.progression.clone())
            .register(self.boot.clone())
            .build()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resources::MemoryAssetSource;
    use crate::core::scene::SimulatedSceneLoader;
    use crate::core::storage::MemoryStore;

    #[test]
    fn catalog_covers_every_scene() {
        let catalog = catalog();
        assert_eq!(catalog.len(), TowerScene::ALL.len());
        assert_eq!(catalog.key_of("MainMenu"), Some(TowerScene::MainMenu));
    }

    #[test]
    fn registry_follows_declared_order() {
        let game = TowerGame::assemble(
            &TowerConfig::default(),
            Box::new(SimulatedSceneLoader::new(["StartUp"])),
            Box::new(MemoryAssetSource::new()),
            Box::new(MemoryStore::new()),
        );

        assert_eq!(
            game.registry().names(),
            vec![
                "ResourceManager",
                "SceneManager",
                "UIManager",
                "MapSystem",
                "ProgressionSystem",
                "BootSequence",
            ]
        );
    }
}
