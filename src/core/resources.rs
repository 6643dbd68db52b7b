//=========================================================================
// Resource Manager
//=========================================================================
//
// Path-addressed asset lookup with a per-process cache.
//
// Architecture:
//   ResourceManager
//     ├─ source: Box<dyn AssetSource>   (memory table or directory)
//     └─ cache: (path, kind) -> Asset
//
// Lookups that miss both the cache and the source are logged and
// reported as absent. Nothing here panics on a missing asset.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::lifecycle::{Subsystem, SubsystemKind};
use crate::core::task::{Step, StepResult};

//=== Asset Types =========================================================

/// Kind of asset requested from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Prefab,
    Sprite,
    Audio,
}

impl AssetKind {
    /// File extension used by [`DirectoryAssetSource`].
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Prefab => "ron",
            AssetKind::Sprite => "png",
            AssetKind::Audio => "ogg",
        }
    }
}

/// Resolved asset descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: String,
    pub kind: AssetKind,
}

//=== AssetSource Trait ===================================================

/// Backing store the resource manager resolves paths against.
pub trait AssetSource {
    fn locate(&self, path: &str, kind: AssetKind) -> Option<Asset>;
}

//=== MemoryAssetSource ===================================================

/// Fixed table of known assets.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    entries: HashSet<(String, AssetKind)>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, kind: AssetKind) -> Self {
        self.insert(path, kind);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, kind: AssetKind) {
        self.entries.insert((path.into(), kind));
    }
}

impl AssetSource for MemoryAssetSource {
    fn locate(&self, path: &str, kind: AssetKind) -> Option<Asset> {
        self.entries
            .contains(&(path.to_string(), kind))
            .then(|| Asset {
                path: path.to_string(),
                kind,
            })
    }
}

//=== DirectoryAssetSource ================================================

/// Resolves `path` to `<root>/<path>.<ext>` on disk.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssetSource {
    fn locate(&self, path: &str, kind: AssetKind) -> Option<Asset> {
        let file = self.root.join(format!("{}.{}", path, kind.extension()));
        file.is_file().then(|| Asset {
            path: path.to_string(),
            kind,
        })
    }
}

//=== ResourceManager =====================================================

pub struct ResourceManager {
    source: Box<dyn AssetSource>,
    cache: HashMap<(String, AssetKind), Asset>,
}

impl ResourceManager {
    pub fn new(source: Box<dyn AssetSource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Looks up `path`, consulting the cache first.
    ///
    /// Returns `None` and logs an error when no source provides it.
    pub fn load(&mut self, path: &str, kind: AssetKind) -> Option<Asset> {
        if path.is_empty() {
            warn!("[ResourceManager] Refusing to load an empty path");
            return None;
        }

        let key = (path.to_string(), kind);
        if let Some(asset) = self.cache.get(&key) {
            return Some(asset.clone());
        }

        match self.source.locate(path, kind) {
            Some(asset) => {
                debug!("[ResourceManager] Cached {:?} '{}'", kind, path);
                self.cache.insert(key, asset.clone());
                Some(asset)
            }
            None => {
                error!("[ResourceManager] Resource not found: {} ({:?})", path, kind);
                None
            }
        }
    }

    pub fn is_cached(&self, path: &str, kind: AssetKind) -> bool {
        self.cache.contains_key(&(path.to_string(), kind))
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            info!("[ResourceManager] Dropping {} cached assets", self.cache.len());
        }
        self.cache.clear();
    }
}

impl Subsystem for ResourceManager {
    fn name(&self) -> &str {
        "ResourceManager"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Manager
    }

    fn on_initialize(&mut self) -> StepResult {
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        self.clear_cache();
        Ok(Step::Complete)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ResourceManager {
        let source = MemoryAssetSource::new()
            .with("UI/Popup/Settings", AssetKind::Prefab)
            .with("Audio/Click", AssetKind::Audio);
        ResourceManager::new(Box::new(source))
    }

    #[test]
    fn known_asset_is_cached_after_first_load() {
        let mut resources = manager();
        assert!(!resources.is_cached("UI/Popup/Settings", AssetKind::Prefab));

        let asset = resources.load("UI/Popup/Settings", AssetKind::Prefab).unwrap();
        assert_eq!(asset.path, "UI/Popup/Settings");
        assert!(resources.is_cached("UI/Popup/Settings", AssetKind::Prefab));
        assert_eq!(resources.cached_count(), 1);
    }

    #[test]
    fn missing_asset_yields_none() {
        let mut resources = manager();
        assert_eq!(resources.load("UI/Popup/Nope", AssetKind::Prefab), None);
        assert_eq!(resources.load("Audio/Click", AssetKind::Sprite), None);
        assert_eq!(resources.load("", AssetKind::Prefab), None);
        assert_eq!(resources.cached_count(), 0);
    }

    #[test]
    fn terminate_clears_the_cache() {
        let mut resources = manager();
        resources.load("Audio/Click", AssetKind::Audio);
        assert_eq!(resources.on_terminate().unwrap(), Step::Complete);
        assert_eq!(resources.cached_count(), 0);
    }

    #[test]
    fn directory_source_matches_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("UI/Scene")).unwrap();
        std::fs::write(dir.path().join("UI/Scene/MainMenu.ron"), "()").unwrap();

        let source = DirectoryAssetSource::new(dir.path());
        assert!(source.locate("UI/Scene/MainMenu", AssetKind::Prefab).is_some());
        assert!(source.locate("UI/Scene/MainMenu", AssetKind::Sprite).is_none());
        assert!(source.locate("UI/Scene/Game", AssetKind::Prefab).is_none());
    }
}
