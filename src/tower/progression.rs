//=========================================================================
// Progression System
//=========================================================================
//
// Floor-by-floor progress through the tower.
//
// Architecture:
//   ProgressionSystem
//     ├─ scenes: Shared<ScenePipeline<TowerScene>>  (enter the game scene)
//     ├─ maps: Shared<MapSystem>                    (regenerate per floor)
//     └─ store: Box<dyn KeyValueStore>              (best floor reached)
//
// Floors start at 1. The best floor ever reached bounds where a new run
// may start and which floors can be revisited directly.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::map::{MapKind, MapSystem};
use super::TowerScene;
use crate::config::TowerConfig;
use crate::core::lifecycle::{LifecycleError, Pausable, Phase, Shared, Subsystem, SubsystemKind};
use crate::core::notify::Notifier;
use crate::core::scene::{SceneError, ScenePipeline};
use crate::core::storage::KeyValueStore;
use crate::core::task::{Step, StepResult};

/// Store key holding the best floor reached.
pub const MAX_REACHED_FLOOR_KEY: &str = "MaxReachedFloor";

//=== ProgressionEvent ====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionEvent {
    FloorChanged(u32),
    FloorCleared(u32),
    GameCleared,
}

//=== ProgressionSystem ===================================================

pub struct ProgressionSystem {
    config: TowerConfig,
    scenes: Shared<ScenePipeline<TowerScene>>,
    maps: Shared<MapSystem>,
    store: Box<dyn KeyValueStore>,
    current_floor: u32,
    max_reached_floor: u32,
    paused: bool,
    events: Notifier<ProgressionEvent>,
}

impl ProgressionSystem {
    pub fn new(
        config: TowerConfig,
        scenes: Shared<ScenePipeline<TowerScene>>,
        maps: Shared<MapSystem>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            scenes,
            maps,
            store,
            current_floor: 1,
            max_reached_floor: 0,
            paused: false,
            events: Notifier::new(),
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn current_floor(&self) -> u32 {
        self.current_floor
    }

    pub fn max_reached_floor(&self) -> u32 {
        self.max_reached_floor
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn subscribe(&mut self) -> Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    //--- Navigation -------------------------------------------------------

    /// Starts a run at `start_floor`, clamped to `[1, max reached + 1]`,
    /// and enters the game scene through the loading scene.
    pub fn start_game(&mut self, start_floor: u32) -> Result<bool, SceneError> {
        if self.refuse_while_paused("start game") {
            return Ok(false);
        }

        let floor = start_floor.clamp(1, self.max_reached_floor + 1);
        let accepted = self.scenes.borrow_mut().load_scene(TowerScene::Game, true)?;

        if accepted {
            self.current_floor = floor;
            info!("[ProgressionSystem] Game started on floor {}", floor);
        }
        Ok(accepted)
    }

    /// Clears the current floor and climbs to the next one.
    pub fn go_to_next_floor(&mut self) -> bool {
        if self.refuse_while_paused("next floor") {
            return false;
        }

        self.floor_cleared();
        self.current_floor += 1;

        if self.current_floor > self.max_reached_floor {
            self.max_reached_floor = self.current_floor;
            self.save_progress();
        }

        self.enter_floor();
        true
    }

    pub fn go_to_previous_floor(&mut self) -> bool {
        if self.refuse_while_paused("previous floor") {
            return false;
        }
        if self.current_floor <= 1 {
            warn!("[ProgressionSystem] Already on the first floor");
            return false;
        }

        self.current_floor -= 1;
        self.enter_floor();
        true
    }

    /// Jumps to `floor`, which must be between 1 and the best floor
    /// reached so far.
    pub fn go_to_floor(&mut self, floor: u32) -> bool {
        if self.refuse_while_paused("go to floor") {
            return false;
        }
        if floor < 1 || floor > self.max_reached_floor {
            warn!(
                "[ProgressionSystem] Floor {} is out of reach (best: {})",
                floor, self.max_reached_floor
            );
            return false;
        }

        self.current_floor = floor;
        self.enter_floor();
        true
    }

    //--- Internal Helpers -------------------------------------------------

    fn refuse_while_paused(&self, request: &str) -> bool {
        if self.paused {
            warn!("[ProgressionSystem] {} refused: paused", request);
        }
        self.paused
    }

    fn floor_cleared(&mut self) {
        info!("[ProgressionSystem] Floor {} cleared", self.current_floor);
        self.events.publish(ProgressionEvent::FloorCleared(self.current_floor));

        if self.current_floor >= self.config.max_floor {
            info!("[ProgressionSystem] Tower cleared");
            self.events.publish(ProgressionEvent::GameCleared);
        }
    }

    fn enter_floor(&mut self) {
        let floor = self.current_floor;
        self.events.publish(ProgressionEvent::FloorChanged(floor));

        let kind = if self.config.is_boss_floor(floor) {
            MapKind::Boss
        } else {
            MapKind::Tower
        };
        let size = self.config.map_size_for(floor);

        match self.maps.borrow_mut().generate(kind, size, size) {
            Ok(_) => debug!("[ProgressionSystem] Floor {} map: {:?} {}x{}", floor, kind, size, size),
            Err(e) => error!("[ProgressionSystem] Floor {} map generation failed: {}", floor, e),
        }
    }

    fn save_progress(&mut self) {
        self.store.set_int(MAX_REACHED_FLOOR_KEY, i64::from(self.max_reached_floor));
        if let Err(e) = self.store.save() {
            error!("[ProgressionSystem] Failed to save progress: {}", e);
        }
    }
}

impl Subsystem for ProgressionSystem {
    fn name(&self) -> &str {
        "ProgressionSystem"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::System
    }

    fn on_initialize(&mut self) -> StepResult {
        let stored = self.store.get_int(MAX_REACHED_FLOOR_KEY, 0);
        self.max_reached_floor = u32::try_from(stored).unwrap_or(0);
        self.current_floor = 1;
        self.paused = false;

        info!("[ProgressionSystem] Best floor reached: {}", self.max_reached_floor);
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        self.store.set_int(MAX_REACHED_FLOOR_KEY, i64::from(self.max_reached_floor));
        self.store
            .save()
            .map_err(|e| LifecycleError::routine(self.name(), Phase::Terminate, e))?;
        Ok(Step::Complete)
    }

    fn pausable(&mut self) -> Option<&mut dyn Pausable> {
        Some(self)
    }
}

impl Pausable for ProgressionSystem {
    fn on_pause(&mut self) {
        self.paused = true;
    }

    fn on_resume(&mut self) {
        self.paused = false;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
