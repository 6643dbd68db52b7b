//=========================================================================
// Boot Sequence
//=========================================================================
//
// Startup splash shown once every subsystem is up.
//
// Stages:
//   Splash ──progress reaches 1──► Holding ──delay elapsed──► Launching
//   Launching ──main menu load accepted──► Finished
//
// Runs as a pausable service: it only ticks while the application is
// running, and pausing the application freezes the splash and the hold.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use log::{debug, error, info};

//=== Internal Dependencies ===============================================

use super::TowerScene;
use crate::config::TowerConfig;
use crate::core::lifecycle::{Pausable, Shared, Subsystem, SubsystemKind};
use crate::core::scene::ScenePipeline;
use crate::core::task::{Delay, Step, StepResult};

//=== BootStage ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    Splash,
    Holding,
    Launching,
    Finished,
    Failed,
}

//=== BootSequence ========================================================

pub struct BootSequence {
    scenes: Shared<ScenePipeline<TowerScene>>,
    speed: f32,
    hold: Duration,
    delay: Delay,
    stage: BootStage,
    elapsed: Duration,
    progress: f32,
    paused: bool,
}

impl BootSequence {
    pub fn new(scenes: Shared<ScenePipeline<TowerScene>>, config: &TowerConfig) -> Self {
        let hold = config.post_splash_delay();
        Self {
            scenes,
            speed: config.splash_speed,
            hold,
            delay: Delay::new(hold),
            stage: BootStage::Splash,
            elapsed: Duration::ZERO,
            progress: 0.0,
            paused: false,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    /// Splash progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Status line shown under the splash progress bar.
    pub fn label(&self) -> &'static str {
        splash_label(self.progress)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn launch_main_menu(&mut self) {
        let requested = self.scenes.borrow_mut().load_scene(TowerScene::MainMenu, true);
        match requested {
            Ok(true) => {
                info!("[BootSequence] Entering main menu");
                self.stage = BootStage::Finished;
            }
            Ok(false) if self.main_menu_active() => {
                info!("[BootSequence] Main menu already active");
                self.stage = BootStage::Finished;
            }
            Ok(false) => debug!("[BootSequence] Scene pipeline busy, retrying next tick"),
            Err(e) => {
                error!("[BootSequence] Cannot enter main menu: {}", e);
                self.stage = BootStage::Failed;
            }
        }
    }

    fn main_menu_active(&self) -> bool {
        let scenes = self.scenes.borrow();
        !scenes.is_loading() && scenes.current_scene() == Some(TowerScene::MainMenu)
    }
}

/// Label for a given splash progress.
pub fn splash_label(progress: f32) -> &'static str {
    if progress < 0.3 {
        "Initializing game..."
    } else if progress < 0.6 {
        "Loading resources..."
    } else {
        "Ready!"
    }
}

impl Subsystem for BootSequence {
    fn name(&self) -> &str {
        "BootSequence"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Service
    }

    fn on_initialize(&mut self) -> StepResult {
        self.stage = BootStage::Splash;
        self.elapsed = Duration::ZERO;
        self.progress = 0.0;
        self.delay = Delay::new(self.hold);
        self.paused = false;
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        Ok(Step::Complete)
    }

    fn update(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        match self.stage {
            BootStage::Splash => {
                self.elapsed += dt;
                self.progress = (self.elapsed.as_secs_f32() * self.speed).min(1.0);
                if self.progress >= 1.0 {
                    debug!("[BootSequence] Splash complete");
                    self.stage = BootStage::Holding;
                }
            }
            BootStage::Holding => {
                if self.delay.advance(dt).is_complete() {
                    self.stage = BootStage::Launching;
                    self.launch_main_menu();
                }
            }
            BootStage::Launching => self.launch_main_menu(),
            BootStage::Finished | BootStage::Failed => {}
        }
    }

    fn pausable(&mut self) -> Option<&mut dyn Pausable> {
        Some(self)
    }
}

impl Pausable for BootSequence {
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
