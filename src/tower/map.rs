//=========================================================================
// Map System
//=========================================================================
//
// Generates floor layouts as tile grids and paints them with the tile
// assets provided by the resource manager.
//
// Layouts:
//   Dungeon - walls with one randomly sized room in the middle
//   Tower   - walls with a 5-tile margin around an open interior
//   Boss    - walls with a circular arena in the middle
//
//=========================================================================

//=== External Dependencies ===============================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use log::{debug, info, warn};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::lifecycle::{Pausable, Shared, Subsystem, SubsystemKind};
use crate::core::resources::{AssetKind, ResourceManager};
use crate::core::task::{Step, StepResult};

const GROUND_TILE: &str = "Tiles/GroundTile";
const WALL_TILE: &str = "Tiles/WallTile";

const TOWER_MARGIN: u32 = 5;
const BOSS_ARENA_RADIUS: u32 = 15;

//=== MapError ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

//=== Map Types ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Dungeon,
    Tower,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Floor,
    Wall,
}

//=== TileGrid ============================================================

/// Row-major grid of tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Grid of the given size filled with `fill`.
    pub fn filled(width: u32, height: u32, fill: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Tile> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    /// Writes `tile` at `(x, y)`. Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, tile: Tile) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = tile;
        }
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
}

//=== Layout Generators ===================================================

fn dungeon_layout(width: u32, height: u32, rng: &mut StdRng) -> TileGrid {
    let mut grid = TileGrid::filled(width, height, Tile::Wall);

    let room_w = rng.gen_range(5..10u32);
    let room_h = rng.gen_range(5..10u32);
    let (cx, cy) = (width / 2, height / 2);

    for x in cx.saturating_sub(room_w / 2)..cx + room_w / 2 {
        for y in cy.saturating_sub(room_h / 2)..cy + room_h / 2 {
            grid.set(x, y, Tile::Floor);
        }
    }
    grid
}

fn tower_layout(width: u32, height: u32) -> TileGrid {
    let mut grid = TileGrid::filled(width, height, Tile::Wall);

    for x in TOWER_MARGIN..width.saturating_sub(TOWER_MARGIN) {
        for y in TOWER_MARGIN..height.saturating_sub(TOWER_MARGIN) {
            grid.set(x, y, Tile::Floor);
        }
    }
    grid
}

fn boss_layout(width: u32, height: u32) -> TileGrid {
    let mut grid = TileGrid::filled(width, height, Tile::Wall);

    let (cx, cy) = (i64::from(width / 2), i64::from(height / 2));
    let r = i64::from(BOSS_ARENA_RADIUS);

    for x in 0..width {
        for y in 0..height {
            let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
            if dx * dx + dy * dy < r * r {
                grid.set(x, y, Tile::Floor);
            }
        }
    }
    grid
}

//=== MapSystem ===========================================================

pub struct MapSystem {
    resources: Shared<ResourceManager>,
    rng: StdRng,
    current: Option<(MapKind, TileGrid)>,
    painted: bool,
    paused: bool,
}

impl MapSystem {
    pub fn new(resources: Shared<ResourceManager>, seed: u64) -> Self {
        Self {
            resources,
            rng: StdRng::seed_from_u64(seed),
            current: None,
            painted: false,
            paused: false,
        }
    }

    /// Replaces the current map with a freshly generated one.
    pub fn generate(&mut self, kind: MapKind, width: u32, height: u32) -> Result<&TileGrid, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidDimensions { width, height });
        }

        self.clear_map();
        debug!("[MapSystem] Generating {:?} map {}x{}", kind, width, height);

        let grid = match kind {
            MapKind::Dungeon => dungeon_layout(width, height, &mut self.rng),
            MapKind::Tower => tower_layout(width, height),
            MapKind::Boss => boss_layout(width, height),
        };

        self.painted = self.paint();
        info!("[MapSystem] {:?} map {}x{} generated", kind, width, height);

        let (_, grid) = &*self.current.insert((kind, grid));
        Ok(grid)
    }

    pub fn clear_map(&mut self) {
        self.current = None;
        self.painted = false;
    }

    pub fn current_kind(&self) -> Option<MapKind> {
        self.current.as_ref().map(|(kind, _)| *kind)
    }

    pub fn current_map(&self) -> Option<&TileGrid> {
        self.current.as_ref().map(|(_, grid)| grid)
    }

    /// `true` when the current map found its tile assets.
    pub fn is_painted(&self) -> bool {
        self.painted
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn paint(&mut self) -> bool {
        let mut resources = self.resources.borrow_mut();
        let ground = resources.load(GROUND_TILE, AssetKind::Sprite);
        let wall = resources.load(WALL_TILE, AssetKind::Sprite);

        if ground.is_none() || wall.is_none() {
            warn!("[MapSystem] Tile assets missing, map left unpainted");
            return false;
        }
        true
    }
}

impl Subsystem for MapSystem {
    fn name(&self) -> &str {
        "MapSystem"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::System
    }

    fn on_initialize(&mut self) -> StepResult {
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        self.clear_map();
        Ok(Step::Complete)
    }

    fn pausable(&mut self) -> Option<&mut dyn Pausable> {
        Some(self)
    }
}

impl Pausable for MapSystem {
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
