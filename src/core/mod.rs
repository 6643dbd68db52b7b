//=========================================================================
// Core Systems
//
// Lifecycle and state orchestration shared by every game built on the
// engine.
//
// Layers (bottom to top):
//   task, notify        cooperative steps and event fan-out
//   lifecycle           subsystem contract, units and registry
//   app_state           application state machine over the registry
//   scene, ui           scene transitions and the popup stack
//   resources, storage  asset lookup and key-value persistence
//
// Everything here runs on the thread that ticks the engine.
//
//=========================================================================

pub mod app_state;
pub mod lifecycle;
pub mod notify;
pub mod resources;
pub mod scene;
pub mod storage;
pub mod task;
pub mod ui;
