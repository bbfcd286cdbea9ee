#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state for Ridge Defence.
//!
//! [`GridMap`] owns every terrain cell, the buildings bound onto them, and
//! the per-depth overlay handles. Enemies currently on the map live in an
//! [`EnemyRoster`].

mod buildings;
mod enemies;
mod terrain;

use std::collections::BTreeMap;

use glam::Vec3;
use ridge_defence_core::{
    BlockType, BuildingDefinition, BuildingId, BuildingRequest, BuildingStyle, CellCoord,
    CellDefinition, CellRect, CellRectSize, Direction, MapDefinition, OverlayDepth, PlacementRejection,
    Renderable, ResourceKind, SimulationError, TextureSet, Tint, UnitFactory, BLOCK_UNIT,
};
use tracing::{debug, error, warn};

use crate::buildings::{BuildingRegistry, NewBuilding};

pub use buildings::Building;
pub use enemies::{ActiveEnemy, Arrival, EnemyRoster};
pub use terrain::{side_face_visible, VisibleFaces};

/// Vertical gap between a building's base and the terrain top, avoiding
/// z-fighting.
const SEAT_EPSILON: f32 = 0.01;

/// One terrain cell.
#[derive(Debug)]
pub struct Cell {
    coord: CellCoord,
    block_type: BlockType,
    placeable: bool,
    passable: bool,
    height_alpha: f32,
    texture: TextureSet,
    size: Vec3,
    building: Option<BuildingId>,
    overlays: BTreeMap<OverlayDepth, OverlaySlot>,
}

#[derive(Debug)]
struct OverlaySlot {
    handle: Box<dyn Renderable>,
    visible: bool,
}

impl Cell {
    fn from_definition(definition: &CellDefinition) -> Self {
        Self {
            coord: CellCoord::new(definition.x, definition.z),
            block_type: definition.block_type,
            placeable: definition.placeable,
            passable: definition.passable,
            height_alpha: definition.height_alpha,
            texture: definition.texture.clone(),
            size: Vec3::new(
                BLOCK_UNIT,
                definition.height_alpha * BLOCK_UNIT,
                BLOCK_UNIT,
            ),
            building: None,
            overlays: BTreeMap::new(),
        }
    }

    /// Coordinate of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Operator classes the cell accepts.
    #[must_use]
    pub const fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Whether operators may be deployed on the cell.
    #[must_use]
    pub const fn placeable(&self) -> bool {
        self.placeable
    }

    /// Whether enemies may walk across the cell.
    #[must_use]
    pub const fn passable(&self) -> bool {
        self.passable
    }

    /// Height multiplier of the cell.
    #[must_use]
    pub const fn height_alpha(&self) -> f32 {
        self.height_alpha
    }

    /// Texture identifiers of the cell.
    #[must_use]
    pub const fn texture(&self) -> &TextureSet {
        &self.texture
    }

    /// World-space size, fixed when the map is built.
    #[must_use]
    pub const fn size(&self) -> Vec3 {
        self.size
    }

    /// Building occupying the cell, if any.
    #[must_use]
    pub const fn building(&self) -> Option<BuildingId> {
        self.building
    }

    /// Reports whether a building occupies the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.building.is_some()
    }

    /// Reports whether the cell is placeable and, when a type is given,
    /// classified as that type.
    #[must_use]
    pub fn accepts(&self, block_type: Option<BlockType>) -> bool {
        self.placeable && block_type.map_or(true, |wanted| wanted == self.block_type)
    }

    /// World-space centre of the cell's top face.
    #[must_use]
    pub fn top_center(&self) -> Vec3 {
        Vec3::new(
            self.size.x * (self.coord.x() as f32 + 0.5),
            self.size.y,
            self.size.z * (self.coord.z() as f32 + 0.5),
        )
    }

    /// Installs a hidden overlay handle at `depth`, disposing any handle the
    /// depth already held. Returns whether a handle was replaced.
    pub fn attach_overlay(&mut self, depth: OverlayDepth, mut handle: Box<dyn Renderable>) -> bool {
        handle.set_visible(false);
        match self.overlays.insert(
            depth,
            OverlaySlot {
                handle,
                visible: false,
            },
        ) {
            Some(previous) => {
                previous.handle.dispose();
                true
            }
            None => false,
        }
    }

    /// Reports whether the cell carries a handle at `depth`.
    #[must_use]
    pub fn has_overlay(&self, depth: OverlayDepth) -> bool {
        self.overlays.contains_key(&depth)
    }

    /// Visibility of the handle at `depth`, or `None` without a handle.
    #[must_use]
    pub fn overlay_visible(&self, depth: OverlayDepth) -> Option<bool> {
        self.overlays.get(&depth).map(|slot| slot.visible)
    }

    /// Shows or hides the handle at `depth`. Returns whether a handle exists.
    pub fn set_overlay_visible(&mut self, depth: OverlayDepth, visible: bool) -> bool {
        let Some(slot) = self.overlays.get_mut(&depth) else {
            return false;
        };
        if slot.visible != visible {
            slot.handle.set_visible(visible);
            slot.visible = visible;
        }
        true
    }

    /// Recolours the handle at `depth`. Returns whether a handle exists.
    pub fn tint_overlay(&mut self, depth: OverlayDepth, tint: Tint) -> bool {
        let Some(slot) = self.overlays.get_mut(&depth) else {
            return false;
        };
        slot.handle.set_tint(tint);
        true
    }
}

/// Largest number of cells a map may span.
pub const MAX_CELLS: usize = 1 << 24;

/// Rectangular grid of terrain cells.
#[derive(Debug)]
pub struct GridMap {
    name: String,
    width: u32,
    height: u32,
    cells: Vec<Option<Cell>>,
    buildings: BuildingRegistry,
}

impl GridMap {
    /// Builds bare terrain from cell definitions.
    ///
    /// Definitions outside the bounds are dropped; a later definition for
    /// the same position replaces an earlier one. Buildings are not bound.
    ///
    /// Dimensions spanning more than [`MAX_CELLS`] cells are rejected as a
    /// whole: the map comes back empty with zero extent.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32, cells: &[CellDefinition]) -> Self {
        let name = name.into();
        let capacity = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|count| usize::try_from(count).ok())
            .filter(|&count| count <= MAX_CELLS);
        let Some(capacity) = capacity else {
            error!(
                map = %name,
                width,
                height,
                dropped = cells.len(),
                "map dimensions exceed the cell limit; building an empty map"
            );
            return Self {
                name,
                width: 0,
                height: 0,
                cells: Vec::new(),
                buildings: BuildingRegistry::new(),
            };
        };
        let mut map = Self {
            name,
            width,
            height,
            cells: std::iter::repeat_with(|| None).take(capacity).collect(),
            buildings: BuildingRegistry::new(),
        };

        for definition in cells {
            let coord = CellCoord::new(definition.x, definition.z);
            let Some(index) = map.index(coord) else {
                warn!(%coord, map = %map.name, "cell definition lies outside the map; dropped");
                continue;
            };
            if map.cells[index].is_some() {
                warn!(%coord, map = %map.name, "duplicate cell definition replaces earlier one");
            }
            map.cells[index] = Some(Cell::from_definition(definition));
        }
        map
    }

    /// Builds the terrain described by a map and binds its buildings in
    /// row-major order. Buildings whose footprint is rejected are skipped.
    pub fn from_definition<F: UnitFactory>(
        definition: &MapDefinition,
        factory: &mut F,
    ) -> Result<Self, SimulationError> {
        let mut map = Self::new(
            definition.name.clone(),
            definition.map_width,
            definition.map_height,
            &definition.block_info,
        );

        let mut pending: Vec<(CellCoord, &BuildingDefinition)> = definition
            .block_info
            .iter()
            .filter_map(|cell| {
                let building = cell.building_info.as_ref()?;
                Some((CellCoord::new(cell.x, cell.z), building))
            })
            .collect();
        pending.sort_by_key(|(coord, _)| (coord.z(), coord.x()));

        for (anchor, building) in pending {
            let _ = map.bind_building(anchor, building, factory)?;
        }
        Ok(map)
    }

    /// Display name of the map.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Bounds-checked lookup; out-of-range coordinates and holes yield `None`.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Mutable bounds-checked lookup.
    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        let index = self.index(coord)?;
        self.cells.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterates every terrain cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }

    /// Iterates every terrain cell mutably in row-major order.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut().flatten()
    }

    /// Coordinates of every placeable cell, optionally restricted to one
    /// block type, in row-major order.
    #[must_use]
    pub fn placeable_area(&self, block_type: Option<BlockType>) -> Vec<CellCoord> {
        self.cells()
            .filter(|cell| cell.accepts(block_type))
            .map(Cell::coord)
            .collect()
    }

    /// Footprint a building definition would cover from `anchor`.
    #[must_use]
    pub fn footprint(anchor: CellCoord, building: &BuildingDefinition) -> CellRect {
        CellRect::from_origin_and_size(
            anchor,
            CellRectSize::new(building.x_span, building.z_span),
        )
    }

    /// Verifies that every footprint cell has terrain and no building.
    pub fn check_footprint(&self, footprint: CellRect) -> Result<(), PlacementRejection> {
        for cell in footprint.cells() {
            let Some(coord) = cell else {
                return Err(PlacementRejection::OutOfBounds {
                    cell: footprint.origin(),
                });
            };
            let Some(target) = self.cell(coord) else {
                return Err(PlacementRejection::OutOfBounds { cell: coord });
            };
            if let Some(occupant) = target.building() {
                return Err(PlacementRejection::Occupied {
                    cell: coord,
                    occupant,
                });
            }
        }
        Ok(())
    }

    /// Binds a building anchored at `anchor`.
    ///
    /// Returns `Ok(None)` without touching any cell when the footprint is
    /// rejected. A missing model is a hard error raised before any mutation.
    pub fn bind_building<F: UnitFactory>(
        &mut self,
        anchor: CellCoord,
        building: &BuildingDefinition,
        factory: &mut F,
    ) -> Result<Option<BuildingId>, SimulationError> {
        let footprint = Self::footprint(anchor, building);
        if let Err(reason) = self.check_footprint(footprint) {
            warn!(desc = %building.desc, %anchor, %reason, "cannot bind building");
            return Ok(None);
        }

        let tallest = footprint
            .cells()
            .flatten()
            .filter_map(|coord| self.cell(coord))
            .map(Cell::height_alpha)
            .fold(f32::MIN, f32::max);

        let request = BuildingRequest {
            desc: &building.desc,
            size_alpha: building.size_alpha,
            style: BuildingStyle::for_desc(&building.desc),
        };
        let Some(bundle) = factory.building(&request) else {
            error!(desc = %building.desc, %anchor, "building model unavailable");
            return Err(SimulationError::ResourceUnavailable {
                kind: ResourceKind::Building,
                name: building.desc.clone(),
            });
        };
        let (mut instance, size) = bundle.into_parts();

        let span = footprint.size();
        instance.set_position(Vec3::new(
            (anchor.x() as f32 + span.width() as f32 / 2.0) * BLOCK_UNIT,
            size.y / 2.0 + tallest * BLOCK_UNIT - SEAT_EPSILON,
            (anchor.z() as f32 + span.height() as f32 / 2.0) * BLOCK_UNIT,
        ));
        instance.set_rotation_y(building.rotation.to_radians());

        let id = self.buildings.insert(NewBuilding {
            desc: building.desc.clone(),
            rotation: building.rotation,
            size_alpha: building.size_alpha,
            footprint,
            instance,
        });
        for coord in footprint.cells().flatten() {
            if let Some(cell) = self.cell_mut(coord) {
                cell.building = Some(id);
            }
        }

        debug!(building = %id, desc = %building.desc, %anchor, "bound building");
        Ok(Some(id))
    }

    /// Removes the building covering `coord`.
    ///
    /// Calling this on an empty or out-of-range cell is a silent no-op and
    /// returns `Ok(None)`. A cell referencing a building whose record, anchor
    /// reference, or instance is missing is an integrity error; nothing is
    /// modified in that case.
    pub fn remove_building(&mut self, coord: CellCoord) -> Result<Option<BuildingId>, SimulationError> {
        let Some(id) = self.cell(coord).and_then(Cell::building) else {
            return Ok(None);
        };

        let Some(record) = self.buildings.get(id) else {
            error!(%coord, building = %id, "cell references an unregistered building");
            return Err(SimulationError::DanglingBuilding { cell: coord, building: id });
        };
        let anchor = record.anchor();
        if self.cell(anchor).and_then(Cell::building) != Some(id) {
            error!(%coord, %anchor, building = %id, "anchor cell lost its building reference");
            return Err(SimulationError::DanglingBuilding { cell: anchor, building: id });
        }
        let Some((building, instance)) = self.buildings.remove(id) else {
            error!(%anchor, building = %id, "building has no instance");
            return Err(SimulationError::MissingBuildingInstance { building: id, anchor });
        };

        instance.dispose();
        for covered in building.footprint().cells().flatten() {
            if let Some(cell) = self.cell_mut(covered) {
                if cell.building == Some(id) {
                    cell.building = None;
                }
            }
        }

        debug!(building = %id, desc = building.desc(), %anchor, "removed building");
        Ok(Some(id))
    }

    /// Looks up a building by identifier.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    /// Building covering `coord`, if any.
    #[must_use]
    pub fn building_at(&self, coord: CellCoord) -> Option<&Building> {
        self.cell(coord)
            .and_then(Cell::building)
            .and_then(|id| self.buildings.get(id))
    }

    /// Reports whether `coord` is the anchor of a building holding an
    /// instance. Exactly one cell per footprint satisfies this.
    #[must_use]
    pub fn hosts_instance(&self, coord: CellCoord) -> bool {
        self.building_at(coord)
            .map_or(false, |building| building.anchor() == coord && building.has_instance())
    }

    /// Iterates bound buildings in identifier order.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    /// Adjacent terrain cell in `direction`.
    #[must_use]
    pub fn neighbor(&self, coord: CellCoord, direction: Direction) -> Option<&Cell> {
        coord.neighbor(direction).and_then(|neighbor| self.cell(neighbor))
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.x() < self.width && coord.z() < self.height {
            let row = usize::try_from(coord.z()).ok()?;
            let column = usize::try_from(coord.x()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
