//=========================================================================
// Spire Engine: Library Root
//
// Lifecycle and scene orchestration core for a tower-climb game.
//
// Responsibilities:
// - Expose the tick-driven engine facade (`Engine`, `EngineBuilder`)
// - Provide the subsystem lifecycle, application state machine, scene
//   pipeline and popup stack under `core`
// - Ship the tower-climb game layer (maps, progression, boot splash)
//
// Typical usage:
// ```no_run
// use spire_engine::prelude::*;
//
// let game = TowerGame::assemble(
//     &TowerConfig::default(),
//     Box::new(SimulatedSceneLoader::new(["StartUp", "MainMenu", "Game", "Loading"])),
//     Box::new(MemoryAssetSource::new()),
//     Box::new(MemoryStore::new()),
// );
// EngineBuilder::new().build(game.registry()).run().unwrap();
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the engine-agnostic orchestration machinery. `tower` is
// the game layer built on top of it. `config` loads both from RON.
//
pub mod config;
pub mod core;
pub mod prelude;
pub mod tower;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the main entry point and tick loop.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder, EngineCommand, EngineHandle, TickControl};
