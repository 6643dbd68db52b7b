//=========================================================================
// Scene Catalog
//=========================================================================
//
// Bidirectional map between symbolic scene keys and the identifiers the
// engine's scene subsystem understands.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use log::warn;

//=== Internal Dependencies ===============================================

use super::{SceneError, SceneKey};

//=== SceneCatalog ========================================================

/// Declared scenes and their engine identifiers.
///
/// ```rust
/// # use spire_engine::core::scene::{SceneCatalog, SceneKey};
/// # #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// # enum GameScene { Menu }
/// # impl SceneKey for GameScene {}
/// let catalog = SceneCatalog::new().with(GameScene::Menu, "MainMenu");
/// assert_eq!(catalog.id_of(GameScene::Menu), Some("MainMenu"));
/// assert_eq!(catalog.key_of("MainMenu"), Some(GameScene::Menu));
/// ```
#[derive(Debug, Clone)]
pub struct SceneCatalog<S: SceneKey> {
    ids: HashMap<S, String>,
    keys: HashMap<String, S>,
}

impl<S: SceneKey> SceneCatalog<S> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    /// Builder form of [`SceneCatalog::register`].
    pub fn with(mut self, key: S, id: impl Into<String>) -> Self {
        self.register(key, id);
        self
    }

    /// Declares `key` as engine scene `id`, replacing earlier mappings of
    /// either side.
    pub fn register(&mut self, key: S, id: impl Into<String>) {
        let id = id.into();

        if let Some(old_id) = self.ids.insert(key, id.clone()) {
            warn!("Scene {:?} was mapped to '{}' and has been remapped", key, old_id);
            self.keys.remove(&old_id);
        }
        if let Some(old_key) = self.keys.insert(id.clone(), key) {
            if old_key != key {
                warn!("Scene id '{}' moved from {:?} to {:?}", id, old_key, key);
                self.ids.remove(&old_key);
            }
        }
    }

    pub fn id_of(&self, key: S) -> Option<&str> {
        self.ids.get(&key).map(String::as_str)
    }

    pub fn key_of(&self, id: &str) -> Option<S> {
        self.keys.get(id).copied()
    }

    /// Like [`SceneCatalog::id_of`], but an unknown key is an error.
    pub fn resolve(&self, key: S) -> Result<&str, SceneError> {
        self.id_of(key)
            .ok_or_else(|| SceneError::Unresolved(format!("{:?}", key)))
    }

    pub fn contains(&self, key: S) -> bool {
        self.ids.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: SceneKey> Default for SceneCatalog<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
