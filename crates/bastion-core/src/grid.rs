//! The authoritative tile grid.
//!
//! Every cell of the map lives here, together with the resource deposits
//! bound to cells. Other components read cells through [`TileGrid::cell_at`]
//! and change them only through the grid's mutators, so the occupancy and
//! visibility invariants are enforced in one place:
//!
//! - `in_sight` implies `visible`; there is no way to set one without the other.
//! - `occupied` is true exactly when the cell has an [`Occupant`].
//!
//! Coordinates outside the grid are never an error: reads return `None` or
//! `false` and mutators do nothing.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::fixed::Fixed64;
use crate::id::{DepositId, StructureId, TaskId, TerrainId};
use crate::resource::{ResourceDeposit, ResourceKind};
use crate::structure::Structure;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another position.
    pub fn chebyshev_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    pub fn offset(&self, dx: i32, dy: i32) -> GridPosition {
        GridPosition::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours.
    pub fn neighbors_4(&self) -> [GridPosition; 4] {
        Direction::all().map(|d| {
            let (dx, dy) = d.offset();
            self.offset(dx, dy)
        })
    }
}

/// A point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// The size of a structure on the grid.
///
/// Width grows toward +x from the anchor, height grows toward -y, so the
/// anchor is the top/left tile of a multi-tile footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 footprint.
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Iterate over all tiles covered by this footprint at the given anchor.
    pub fn tiles(&self, anchor: GridPosition) -> impl Iterator<Item = GridPosition> + use<> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ax = anchor.x;
        let ay = anchor.y;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPosition::new(ax + dx, ay - dy)))
    }

    /// The tile nearest the middle of the footprint.
    pub fn center_tile(&self, anchor: GridPosition) -> GridPosition {
        let dx = (self.width.max(1) as i32 - 1) / 2;
        let dy = (self.height.max(1) as i32 - 1) / 2;
        GridPosition::new(anchor.x + dx, anchor.y - dy)
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// What owns an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    /// A live structure whose footprint covers the cell.
    Structure(StructureId),
    /// Footprint reserved by a pending build task.
    Reservation(TaskId),
    /// A bare resource deposit with no structure on it.
    Deposit(DepositId),
    /// Destructible wall content with its own hit points.
    Wall,
}

/// The tile type reported to renderers and other consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    Empty,
    Structure,
    Reserved,
    Resource,
    Wall,
}

/// A terrain palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,
    pub buildable: bool,
    pub passable: bool,
    pub roofed: bool,
}

impl TerrainDef {
    /// Open, buildable ground.
    pub fn ground() -> Self {
        Self {
            name: "ground".to_string(),
            buildable: true,
            passable: true,
            roofed: false,
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub terrain: TerrainId,
    pub occupied: bool,
    pub buildable: bool,
    pub passable: bool,
    /// Ever explored. Never cleared once set.
    pub visible: bool,
    /// Currently observed. Recomputed every tick.
    pub in_sight: bool,
    /// Hit points of wall content; zero when the cell holds no wall.
    pub hp: u32,
    pub max_hp: u32,
    pub room_id: Option<u32>,
    pub roofed: bool,
    pub occupant: Option<Occupant>,
    pub deposit: Option<DepositId>,
    base_buildable: bool,
    base_passable: bool,
}

impl Cell {
    fn new() -> Self {
        Self {
            terrain: TerrainId(0),
            occupied: false,
            buildable: true,
            passable: true,
            visible: false,
            in_sight: false,
            hp: 0,
            max_hp: 0,
            room_id: None,
            roofed: false,
            occupant: None,
            deposit: None,
            base_buildable: true,
            base_passable: true,
        }
    }

    pub fn tile_type(&self) -> TileType {
        match self.occupant {
            None => TileType::Empty,
            Some(Occupant::Structure(_)) => TileType::Structure,
            Some(Occupant::Reservation(_)) => TileType::Reserved,
            Some(Occupant::Deposit(_)) => TileType::Resource,
            Some(Occupant::Wall) => TileType::Wall,
        }
    }

    /// The structure owning this cell, if any.
    pub fn structure(&self) -> Option<StructureId> {
        match self.occupant {
            Some(Occupant::Structure(id)) => Some(id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// The grid of cells plus the deposits bound to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    cells: Vec<Cell>,
    deposits: SlotMap<DepositId, ResourceDeposit>,
}

impl TileGrid {
    /// Create a grid of open, unexplored ground.
    pub fn new(width: u32, height: u32, tile_size: f32) -> Self {
        let tile_size = if tile_size > 0.0 { tile_size } else { 1.0 };
        Self {
            width,
            height,
            tile_size,
            cells: vec![Cell::new(); width as usize * height as usize],
            deposits: SlotMap::with_key(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: GridPosition) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    fn cell_mut(&mut self, pos: GridPosition) -> Option<&mut Cell> {
        let idx = self.index(pos)?;
        self.cells.get_mut(idx)
    }

    /// Read a cell.
    pub fn cell_at(&self, pos: GridPosition) -> Option<&Cell> {
        self.index(pos).and_then(|i| self.cells.get(i))
    }

    /// Iterate every cell with its position, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (GridPosition, &Cell)> {
        let w = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (GridPosition::new((i % w) as i32, (i / w) as i32), cell)
        })
    }

    // -- Coordinate conversion --

    pub fn world_to_grid(&self, point: WorldPoint) -> GridPosition {
        GridPosition::new(
            (point.x / self.tile_size).floor() as i32,
            (point.y / self.tile_size).floor() as i32,
        )
    }

    /// World-space centre of a cell.
    pub fn grid_to_world(&self, pos: GridPosition) -> WorldPoint {
        WorldPoint::new(
            (pos.x as f32 + 0.5) * self.tile_size,
            (pos.y as f32 + 0.5) * self.tile_size,
        )
    }

    /// World-space bounds `(min, max)` of a footprint.
    pub fn footprint_bounds(
        &self,
        anchor: GridPosition,
        footprint: Footprint,
    ) -> (WorldPoint, WorldPoint) {
        let ts = self.tile_size;
        let min = WorldPoint::new(
            anchor.x as f32 * ts,
            (anchor.y - footprint.height as i32 + 1) as f32 * ts,
        );
        let max = WorldPoint::new(
            (anchor.x + footprint.width as i32) as f32 * ts,
            (anchor.y + 1) as f32 * ts,
        );
        (min, max)
    }

    /// World-space centre of a footprint.
    pub fn footprint_center(&self, anchor: GridPosition, footprint: Footprint) -> WorldPoint {
        let (min, max) = self.footprint_bounds(anchor, footprint);
        WorldPoint::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0)
    }

    pub fn footprint_in_bounds(&self, anchor: GridPosition, footprint: Footprint) -> bool {
        footprint.tiles(anchor).all(|t| self.in_bounds(t))
    }

    /// The cells a structure's footprint maps to.
    pub fn occupied_tiles_of(&self, structure: &Structure) -> Vec<GridPosition> {
        structure.footprint.tiles(structure.anchor).collect()
    }

    // -- Occupancy --

    /// Set or clear a cell's occupant. `None` is equivalent to [`release`](Self::release).
    pub fn set_occupied(&mut self, pos: GridPosition, occupant: Option<Occupant>) {
        match occupant {
            Some(occ) => self.occupy(pos, occ),
            None => self.release(pos),
        }
    }

    /// Mark a cell occupied by `occupant`, replacing any previous occupant.
    pub fn occupy(&mut self, pos: GridPosition, occupant: Occupant) {
        let Some(cell) = self.cell_mut(pos) else {
            return;
        };
        cell.occupied = true;
        cell.occupant = Some(occupant);
        cell.passable = cell.base_passable
            && !matches!(occupant, Occupant::Structure(_) | Occupant::Wall);
        if occupant != Occupant::Wall {
            cell.hp = 0;
            cell.max_hp = 0;
        }
    }

    /// Free a cell.
    ///
    /// Restores the terrain's buildability and passability. When a deposit
    /// underlies the cell it becomes a resource tile again and the deposit is
    /// uncovered; a depleted deposit is removed instead.
    pub fn release(&mut self, pos: GridPosition) {
        let Some(idx) = self.index(pos) else {
            return;
        };
        let cell = &mut self.cells[idx];
        cell.occupied = false;
        cell.occupant = None;
        cell.buildable = cell.base_buildable;
        cell.passable = cell.base_passable;
        cell.hp = 0;
        cell.max_hp = 0;

        let Some(deposit_id) = cell.deposit else {
            return;
        };
        match self.deposits.get_mut(deposit_id) {
            Some(deposit) if !deposit.is_depleted() => {
                deposit.covered = false;
                deposit.extractor = None;
                cell.occupied = true;
                cell.occupant = Some(Occupant::Deposit(deposit_id));
            }
            Some(_) => {
                self.deposits.remove(deposit_id);
                cell.deposit = None;
                debug!(x = pos.x, y = pos.y, "depleted deposit removed");
            }
            None => cell.deposit = None,
        }
    }

    // -- Walls --

    /// Put destructible wall content on a free cell.
    pub fn place_wall(&mut self, pos: GridPosition, hp: u32) -> bool {
        match self.cell_at(pos) {
            Some(cell) if !cell.occupied && hp > 0 => {}
            _ => return false,
        }
        self.occupy(pos, Occupant::Wall);
        if let Some(cell) = self.cell_mut(pos) {
            cell.hp = hp;
            cell.max_hp = hp;
        }
        true
    }

    /// Damage wall content. Returns true when the wall was destroyed.
    pub fn damage(&mut self, pos: GridPosition, amount: u32) -> bool {
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        if cell.occupant != Some(Occupant::Wall) {
            return false;
        }
        cell.hp = cell.hp.saturating_sub(amount);
        if cell.hp > 0 {
            return false;
        }
        self.release(pos);
        debug!(x = pos.x, y = pos.y, "wall destroyed");
        true
    }

    // -- Deposits --

    /// Bind a new deposit to a free cell.
    pub fn add_deposit(
        &mut self,
        pos: GridPosition,
        kind: ResourceKind,
        remaining: Option<Fixed64>,
    ) -> Option<DepositId> {
        match self.cell_at(pos) {
            Some(cell) if !cell.occupied && cell.deposit.is_none() => {}
            _ => return None,
        }
        let id = self
            .deposits
            .insert(ResourceDeposit::new(kind, pos, remaining));
        if let Some(cell) = self.cell_mut(pos) {
            cell.deposit = Some(id);
        }
        self.occupy(pos, Occupant::Deposit(id));
        Some(id)
    }

    pub fn deposit(&self, id: DepositId) -> Option<&ResourceDeposit> {
        self.deposits.get(id)
    }

    pub fn deposit_at(&self, pos: GridPosition) -> Option<(DepositId, &ResourceDeposit)> {
        let id = self.cell_at(pos)?.deposit?;
        self.deposits.get(id).map(|d| (id, d))
    }

    pub fn deposits(&self) -> impl Iterator<Item = (DepositId, &ResourceDeposit)> {
        self.deposits.iter()
    }

    /// The available deposit of `kind` on a bare resource cell. An
    /// extractor of that kind may be placed over such a cell even though it
    /// is occupied.
    pub fn extractable_deposit_at(
        &self,
        pos: GridPosition,
        kind: ResourceKind,
    ) -> Option<DepositId> {
        let Some(Occupant::Deposit(id)) = self.cell_at(pos)?.occupant else {
            return None;
        };
        let deposit = self.deposits.get(id)?;
        (deposit.kind == kind && deposit.is_available()).then_some(id)
    }

    /// Hide a deposit under a producer and link the two.
    pub fn cover_deposit(&mut self, id: DepositId, extractor: StructureId) -> bool {
        match self.deposits.get_mut(id) {
            Some(deposit) => {
                deposit.covered = true;
                deposit.extractor = Some(extractor);
                true
            }
            None => false,
        }
    }

    /// Draw up to `amount` from a deposit's reserves.
    pub fn draw_from_deposit(&mut self, id: DepositId, amount: Fixed64) -> Fixed64 {
        self.deposits
            .get_mut(id)
            .map_or(Fixed64::ZERO, |d| d.draw(amount))
    }

    // -- Visibility --

    /// Reset `in_sight` on every cell. `visible` is untouched.
    pub fn clear_in_sight(&mut self) {
        for cell in &mut self.cells {
            cell.in_sight = false;
        }
    }

    /// Mark a cell as currently observed (and therefore explored).
    pub fn mark_in_sight(&mut self, pos: GridPosition) {
        if let Some(cell) = self.cell_mut(pos) {
            cell.visible = true;
            cell.in_sight = true;
        }
    }

    /// Mark a cell explored without observing it. Returns true if newly explored.
    pub fn reveal(&mut self, pos: GridPosition) -> bool {
        match self.cell_mut(pos) {
            Some(cell) if !cell.visible => {
                cell.visible = true;
                true
            }
            _ => false,
        }
    }

    /// Explore the whole map.
    pub fn reveal_all(&mut self) {
        for cell in &mut self.cells {
            cell.visible = true;
        }
    }

    pub fn explored_count(&self) -> usize {
        self.cells.iter().filter(|c| c.visible).count()
    }

    pub fn in_sight_count(&self) -> usize {
        self.cells.iter().filter(|c| c.in_sight).count()
    }

    // -- Terrain and rooms --

    /// Set a cell's terrain and its base flags.
    pub fn paint_terrain(&mut self, pos: GridPosition, id: TerrainId, def: &TerrainDef) {
        let Some(cell) = self.cell_mut(pos) else {
            return;
        };
        cell.terrain = id;
        cell.base_buildable = def.buildable;
        cell.base_passable = def.passable;
        cell.roofed = def.roofed;
        cell.buildable = def.buildable;
        if !matches!(
            cell.occupant,
            Some(Occupant::Structure(_)) | Some(Occupant::Wall)
        ) {
            cell.passable = def.passable;
        }
    }

    /// Group 4-connected roofed cells into rooms. Returns the room count.
    pub fn rebuild_rooms(&mut self) -> u32 {
        for cell in &mut self.cells {
            cell.room_id = None;
        }

        let mut next_room = 0u32;
        let mut queue = VecDeque::new();
        for idx in 0..self.cells.len() {
            if !self.cells[idx].roofed || self.cells[idx].room_id.is_some() {
                continue;
            }
            let w = self.width as usize;
            let start = GridPosition::new((idx % w) as i32, (idx / w) as i32);
            self.cells[idx].room_id = Some(next_room);
            queue.push_back(start);

            while let Some(pos) = queue.pop_front() {
                for n in pos.neighbors_4() {
                    let Some(ni) = self.index(n) else {
                        continue;
                    };
                    let cell = &mut self.cells[ni];
                    if cell.roofed && cell.room_id.is_none() {
                        cell.room_id = Some(next_room);
                        queue.push_back(n);
                    }
                }
            }
            next_room += 1;
        }
        next_room
    }

    /// Whether a square of `size_class` cells centred on the point's cell
    /// is entirely in bounds, passable, and unoccupied.
    pub fn is_passable_area(&self, point: WorldPoint, size_class: u32) -> bool {
        let center = self.world_to_grid(point);
        let n = size_class.max(1) as i32;
        let start = center.offset(-(n - 1) / 2, -(n - 1) / 2);
        (0..n).all(|dy| {
            (0..n).all(|dx| {
                self.cell_at(start.offset(dx, dy))
                    .is_some_and(|c| c.passable && !c.occupied)
            })
        })
    }
}
