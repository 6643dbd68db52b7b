//=========================================================================
// Scene Loader
//=========================================================================
//
// Contract for the engine's asynchronous scene-load primitive, plus a
// deterministic tick-driven implementation used by tests and demos.
//
// The pipeline sits exactly one layer above this trait:
//   begin_load(id) ──► poll_load() per tick ──► Complete | Failed
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashSet;

use log::debug;

//=== Internal Dependencies ===============================================

use super::SceneError;

//=== LoadStatus ==========================================================

/// Progress of the engine's current scene load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// No load has been started.
    Idle,

    /// Load running; fractional completion as reported by the engine.
    InProgress(f32),

    /// Load finished and the scene is active.
    Complete,

    /// Load aborted by the engine.
    Failed(String),
}

//=== SceneLoader Trait ===================================================

/// Engine scene subsystem as seen by the pipeline.
pub trait SceneLoader {
    /// Identifier of the scene that is active right now, if any.
    fn active_scene(&self) -> Option<String>;

    /// Starts loading `scene_id` asynchronously.
    fn begin_load(&mut self, scene_id: &str) -> Result<(), SceneError>;

    /// Samples the load started by the last `begin_load`.
    fn poll_load(&mut self) -> LoadStatus;
}

//=== SimulatedSceneLoader ================================================

/// Deterministic loader that completes each load after a fixed number
/// of polls, reporting evenly spaced progress in between.
#[derive(Debug, Clone)]
pub struct SimulatedSceneLoader {
    known: HashSet<String>,
    failing: HashSet<String>,
    ticks_per_load: u32,
    active: Option<String>,
    loading: Option<(String, u32)>,
    history: Vec<String>,
}

impl SimulatedSceneLoader {
    /// Creates a loader that knows the given scene identifiers.
    pub fn new<I, T>(scenes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            known: scenes.into_iter().map(Into::into).collect(),
            failing: HashSet::new(),
            ticks_per_load: 4,
            active: None,
            loading: None,
            history: Vec::new(),
        }
    }

    /// Sets how many polls a load takes to finish (at least one).
    pub fn with_ticks_per_load(mut self, ticks: u32) -> Self {
        self.ticks_per_load = ticks.max(1);
        self
    }

    /// Marks `scene_id` as the scene active at startup.
    pub fn with_active(mut self, scene_id: impl Into<String>) -> Self {
        self.active = Some(scene_id.into());
        self
    }

    /// Makes every load of `scene_id` fail midway.
    pub fn with_failure(mut self, scene_id: impl Into<String>) -> Self {
        self.failing.insert(scene_id.into());
        self
    }

    /// Scene identifiers passed to `begin_load`, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl SceneLoader for SimulatedSceneLoader {
    fn active_scene(&self) -> Option<String> {
        self.active.clone()
    }

    fn begin_load(&mut self, scene_id: &str) -> Result<(), SceneError> {
        if !self.known.contains(scene_id) {
            return Err(SceneError::LoadFailed {
                scene: scene_id.to_string(),
                reason: "scene is not part of the build".into(),
            });
        }

        debug!("Simulated load of '{}' started", scene_id);
        self.history.push(scene_id.to_string());
        self.loading = Some((scene_id.to_string(), 0));
        Ok(())
    }

    fn poll_load(&mut self) -> LoadStatus {
        let Some((scene_id, ticks)) = self.loading.as_mut() else {
            return LoadStatus::Idle;
        };

        *ticks += 1;

        if self.failing.contains(scene_id.as_str()) && *ticks * 2 >= self.ticks_per_load {
            let reason = format!("simulated failure while loading '{}'", scene_id);
            self.loading = None;
            return LoadStatus::Failed(reason);
        }

        if *ticks >= self.ticks_per_load {
            self.active = self.loading.take().map(|(id, _)| id);
            return LoadStatus::Complete;
        }

        LoadStatus::InProgress(*ticks as f32 / self.ticks_per_load as f32)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_before_any_load() {
        let mut loader = SimulatedSceneLoader::new(["A"]);
        assert_eq!(loader.poll_load(), LoadStatus::Idle);
        assert_eq!(loader.active_scene(), None);
    }

    #[test]
    fn load_reports_progress_then_completes() {
        let mut loader = SimulatedSceneLoader::new(["A"]).with_ticks_per_load(4);
        loader.begin_load("A").unwrap();

        assert_eq!(loader.poll_load(), LoadStatus::InProgress(0.25));
        assert_eq!(loader.poll_load(), LoadStatus::InProgress(0.5));
        assert_eq!(loader.poll_load(), LoadStatus::InProgress(0.75));
        assert_eq!(loader.poll_load(), LoadStatus::Complete);
        assert_eq!(loader.active_scene().as_deref(), Some("A"));
        assert_eq!(loader.poll_load(), LoadStatus::Idle);
    }

    #[test]
    fn unknown_scene_is_refused() {
        let mut loader = SimulatedSceneLoader::new(["A"]);
        assert!(loader.begin_load("Z").is_err());
        assert!(loader.history().is_empty());
    }

    #[test]
    fn failing_scene_aborts_midway() {
        let mut loader = SimulatedSceneLoader::new(["A"])
            .with_ticks_per_load(4)
            .with_active("Boot")
            .with_failure("A");
        loader.begin_load("A").unwrap();

        assert_eq!(loader.poll_load(), LoadStatus::InProgress(0.25));
        assert!(matches!(loader.poll_load(), LoadStatus::Failed(_)));
        assert_eq!(loader.active_scene().as_deref(), Some("Boot"));
    }
}
