//=========================================================================
// Tower Climb Demo
//
// Boots the full subsystem stack against a simulated scene loader,
// walks through the splash, opens a popup, climbs ten floors and shuts
// down. Pass a RON config path as the first argument to override the
// defaults.
//
//   RUST_LOG=debug cargo run --example tower_climb
//
//=========================================================================

use std::error::Error;
use std::time::Duration;

use log::info;

use spire_engine::config::Config;
use spire_engine::core::app_state::ApplicationState;
use spire_engine::prelude::*;
use spire_engine::tower::BootStage;
use spire_engine::TickControl;

const DT: Duration = Duration::from_millis(50);
const MAX_TICKS: u32 = 10_000;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    //--- Assemble ---------------------------------------------------------
    let loader = SimulatedSceneLoader::new(TowerScene::ALL.map(TowerScene::scene_id))
        .with_active(TowerScene::StartUp.scene_id())
        .with_ticks_per_load(6);

    let assets = MemoryAssetSource::new()
        .with("UI/Scene/MainMenu", AssetKind::Prefab)
        .with("UI/Popup/Settings", AssetKind::Prefab)
        .with("Tiles/GroundTile", AssetKind::Sprite)
        .with("Tiles/WallTile", AssetKind::Sprite);

    let save_path = std::env::temp_dir().join("spire_engine_demo").join("progress.ron");
    let store = RonFileStore::open(&save_path)?;

    let game = TowerGame::assemble(&config.tower, Box::new(loader), Box::new(assets), Box::new(store));
    let mut engine = EngineBuilder::new()
        .with_config(&config.engine)
        .build(game.registry());
    let handle = engine.handle();

    //--- Boot -------------------------------------------------------------
    engine.start();
    run_until(&mut engine, |_| {
        game.boot.borrow().stage() == BootStage::Finished && !game.scenes.borrow().is_loading()
    })?;
    info!("Main menu reached: {:?}", game.scenes.borrow().current_scene());

    //--- Main menu --------------------------------------------------------
    game.ui.borrow_mut().show_scene_ui("MainMenu");
    if let Some(settings) = game.ui.borrow_mut().show_popup("Settings") {
        info!("Settings popup opened");
        settings.close();
    }

    //--- Climb ------------------------------------------------------------
    game.progression.borrow_mut().start_game(1)?;
    run_until(&mut engine, |_| !game.scenes.borrow().is_loading())?;

    let floors = game.progression.borrow_mut().subscribe();
    for _ in 0..10 {
        game.progression.borrow_mut().go_to_next_floor();
    }
    for event in floors.try_iter() {
        info!("Progression: {:?}", event);
    }
    info!(
        "Best floor reached: {}",
        game.progression.borrow().max_reached_floor()
    );

    //--- Shutdown ---------------------------------------------------------
    handle.terminate();
    run_until(&mut engine, |engine| engine.app().has_exited())?;
    info!("Final state: {}", engine.app().state());
    debug_assert_eq!(engine.app().state(), ApplicationState::Terminating);

    Ok(())
}

/// Ticks the engine with a fixed step until `done` holds.
fn run_until(engine: &mut Engine, done: impl Fn(&Engine) -> bool) -> Result<(), Box<dyn Error>> {
    for _ in 0..MAX_TICKS {
        if done(engine) {
            return Ok(());
        }
        if engine.tick(DT)? == TickControl::Exit {
            return Ok(());
        }
    }
    Err("engine did not reach the expected state in time".into())
}
