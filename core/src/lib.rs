#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Ridge Defence engine.
//!
//! This crate defines the vocabulary that connects the grid, the pure
//! systems, and the adapters. Map and unit definitions describe immutable
//! templates, the [`render`] collaborator traits describe the presentation
//! layer the simulation drives without knowing how it draws, and [`Event`]
//! values report what happened during a simulation tick.

pub mod definitions;
pub mod render;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use definitions::{
    BuildingDefinition, CellDefinition, ControlData, EnemyData, FragmentDefinition,
    LightDefinition, MapDefinition, OperatorData, ResourceManifest, TextureSet, UnitCatalog,
    WaveDefinition,
};
pub use render::{BuildingRequest, BuildingStyle, InstanceBundle, Renderable, UnitFactory, UnitKind};

/// Side length of a single cell expressed in world units.
pub const BLOCK_UNIT: f32 = 10.0;

/// Location of a single grid cell expressed as abstract `x` and `z` indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    z: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn z(&self) -> u32 {
        self.z
    }

    /// Applies a relative offset, yielding `None` when the result leaves the
    /// non-negative quadrant.
    #[must_use]
    pub fn offset(self, offset: CellOffset) -> Option<CellCoord> {
        let x = self.x.checked_add_signed(offset.dx())?;
        let z = self.z.checked_add_signed(offset.dz())?;
        Some(CellCoord::new(x, z))
    }

    /// Coordinate of the adjacent cell in the provided direction.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        self.offset(direction.offset())
    }

    /// Abstract position of the cell centre, measured in cells.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.z as f32 + 0.5)
    }

    /// Floors an abstract position onto the grid, rejecting negative values.
    #[must_use]
    pub fn from_abstract(position: Vec2) -> Option<CellCoord> {
        let x = position.x.floor();
        let z = position.y.floor();
        if !x.is_finite() || !z.is_finite() || x < 0.0 || z < 0.0 {
            return None;
        }
        Some(CellCoord::new(x as u32, z as u32))
    }

    /// Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Converts an abstract (cell-space) position into horizontal world units.
#[must_use]
pub fn abstract_to_world(position: Vec2) -> Vec2 {
    position * BLOCK_UNIT
}

/// Converts a horizontal world position into abstract cell-space units.
#[must_use]
pub fn world_to_abstract(position: Vec2) -> Vec2 {
    position / BLOCK_UNIT
}

/// Signed displacement between two cells.
///
/// Attack areas are authored as `[dx, dz]` pairs relative to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct CellOffset {
    dx: i32,
    dz: i32,
}

impl CellOffset {
    /// Creates a new offset.
    #[must_use]
    pub const fn new(dx: i32, dz: i32) -> Self {
        Self { dx, dz }
    }

    /// Column displacement.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Row displacement.
    #[must_use]
    pub const fn dz(&self) -> i32 {
        self.dz
    }

    /// Rotates an offset authored for [`Facing::Right`] toward `facing`.
    #[must_use]
    pub const fn rotated(self, facing: Facing) -> Self {
        match facing {
            Facing::Right => Self::new(self.dx, self.dz),
            Facing::Down => Self::new(-self.dz, self.dx),
            Facing::Left => Self::new(-self.dx, -self.dz),
            Facing::Up => Self::new(self.dz, -self.dx),
        }
    }
}

impl From<(i32, i32)> for CellOffset {
    fn from((dx, dz): (i32, i32)) -> Self {
        Self::new(dx, dz)
    }
}

impl From<CellOffset> for (i32, i32) {
    fn from(offset: CellOffset) -> Self {
        (offset.dx, offset.dz)
    }
}

/// Cardinal neighbour directions on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward decreasing `z`.
    North,
    /// Toward increasing `x`.
    East,
    /// Toward increasing `z`.
    South,
    /// Toward decreasing `x`.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset that steps one cell in this direction.
    #[must_use]
    pub const fn offset(self) -> CellOffset {
        match self {
            Self::North => CellOffset::new(0, -1),
            Self::East => CellOffset::new(1, 0),
            Self::South => CellOffset::new(0, 1),
            Self::West => CellOffset::new(-1, 0),
        }
    }
}

/// Orientation chosen for a deployed operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing increasing `x`; attack areas are authored in this orientation.
    #[default]
    Right,
    /// Facing increasing `z`.
    Down,
    /// Facing decreasing `x`.
    Left,
    /// Facing decreasing `z`.
    Up,
}

impl Facing {
    /// Yaw applied to a unit's renderable, in radians.
    #[must_use]
    pub fn rotation_y(self) -> f32 {
        match self {
            Self::Right => 0.0,
            Self::Up => std::f32::consts::FRAC_PI_2,
            Self::Left => std::f32::consts::PI,
            Self::Down => -std::f32::consts::FRAC_PI_2,
        }
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Cell with the smallest `x` and `z` in the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= self.origin.x()
            && cell.z() >= self.origin.z()
            && cell.x() - self.origin.x() < self.size.width()
            && cell.z() - self.origin.z() < self.size.height()
    }

    /// Iterates every covered cell in row-major order.
    ///
    /// Cells whose indices would overflow `u32` are yielded as `None`.
    pub fn cells(&self) -> impl Iterator<Item = Option<CellCoord>> + '_ {
        (0..self.size.height()).flat_map(move |dz| {
            (0..self.size.width()).map(move |dx| {
                let x = self.origin.x().checked_add(dx)?;
                let z = self.origin.z().checked_add(dz)?;
                Some(CellCoord::new(x, z))
            })
        })
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor; zero spans are widened to one cell.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { 1 } else { width },
            height: if height == 0 { 1 } else { height },
        }
    }

    /// Number of columns spanned.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows spanned.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Operator classes a cell accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    /// Any operator may be deployed.
    #[serde(rename = "ALL")]
    Placeable,
    /// Only melee operators may be deployed.
    #[serde(rename = "MELEE")]
    MeleeOnly,
    /// Only ranged operators may be deployed.
    #[serde(rename = "RANGED")]
    RangedOnly,
}

/// Solid colour applied to overlay tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tint {
    red: u8,
    green: u8,
    blue: u8,
}

impl Tint {
    /// Highlight used for the placement area.
    pub const PLACEMENT: Tint = Tint::from_rgb(0x00, 0x80, 0x00);
    /// Highlight used for attack-range previews.
    pub const ATTACK: Tint = Tint::from_rgb(0xff, 0x00, 0x00);

    /// Creates a new tint from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Unique identifier assigned to an enemy when it spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a bound building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stacking order of an overlay; depth zero sits closest to the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayDepth(u32);

impl OverlayDepth {
    /// Layer that highlights where the selected operator may be deployed.
    pub const PLACEMENT: OverlayDepth = OverlayDepth::new(0);
    /// Layer that previews an operator's attack area.
    pub const ATTACK: OverlayDepth = OverlayDepth::new(1);

    /// Creates a new overlay depth.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric depth.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Coarse state of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// Waiting to start or paused.
    Standby,
    /// Simulation advances every tick.
    Running,
    /// Every enemy has been accounted for.
    Victory,
    /// Life points were exhausted.
    Defeat,
}

impl GameStatus {
    /// Reports whether the status ends the battle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }
}

/// Single instruction along an enemy route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Waypoint {
    /// Walk toward the centre of the cell.
    Move(CellCoord),
    /// Stand still for the provided number of seconds.
    Pause {
        /// Duration of the pause in seconds.
        pause: f32,
    },
}

/// Events reported by the simulation while processing a tick or a request.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that an enemy entered the map.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Unit type name.
        name: String,
        /// Cell the enemy was placed on.
        cell: CellCoord,
        /// Timeline time of the spawn in seconds.
        at: f32,
    },
    /// Reports that an enemy finished a move step.
    WaypointReached {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Target cell of the completed step.
        cell: CellCoord,
    },
    /// Reports that an enemy exhausted its route and left through the exit.
    EnemyLeaked {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Unit type name.
        name: String,
        /// Timeline time of the leak in seconds.
        at: f32,
    },
    /// Confirms that an operator was deployed.
    OperatorDeployed {
        /// Operator name.
        name: String,
        /// Cell the operator occupies.
        cell: CellCoord,
        /// Orientation chosen for the operator.
        facing: Facing,
        /// Deployment slots still available.
        remaining_slots: usize,
    },
    /// Confirms that an operator was withdrawn from the field.
    OperatorWithdrawn {
        /// Operator name.
        name: String,
        /// Cost returned to the pool.
        refund: u32,
        /// Cost of the next deployment.
        next_cost: u32,
        /// Deployment slots still available.
        remaining_slots: usize,
    },
    /// Announces that the battle status changed.
    StatusChanged {
        /// Status after the change.
        status: GameStatus,
    },
}

/// Reasons a footprint cannot host a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum PlacementRejection {
    /// A footprint cell lies outside the grid or has no terrain.
    #[error("cell {cell} lies outside the map")]
    OutOfBounds {
        /// First offending cell.
        cell: CellCoord,
    },
    /// A footprint cell already belongs to another building.
    #[error("cell {cell} is occupied by building {occupant}")]
    Occupied {
        /// First offending cell.
        cell: CellCoord,
        /// Building that owns the cell.
        occupant: BuildingId,
    },
}

/// Category of instance requested from the [`UnitFactory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Building or decoration model.
    Building,
    /// Enemy unit.
    Enemy,
    /// Operator unit.
    Operator,
    /// Overlay tile.
    Overlay,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Building => "building",
            Self::Enemy => "enemy",
            Self::Operator => "operator",
            Self::Overlay => "overlay",
        };
        f.write_str(label)
    }
}

/// Faults raised when static data or resources contradict the simulation's
/// invariants.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The collaborator could not provide an instance for the named resource.
    #[error("no instantiable {kind} resource named `{name}`")]
    ResourceUnavailable {
        /// Category of the requested resource.
        kind: ResourceKind,
        /// Resource name.
        name: String,
    },
    /// A unit type has no entry in the unit catalogue.
    #[error("no unit data for `{name}`")]
    MissingUnitData {
        /// Unit type name.
        name: String,
    },
    /// A route cannot be followed.
    #[error("route of `{name}` is malformed: {reason}")]
    MalformedRoute {
        /// Unit type name.
        name: String,
        /// Description of the defect.
        reason: &'static str,
    },
    /// A cell references a building the registry does not hold, or the
    /// building's anchor no longer references it.
    #[error("cell {cell} references unknown building {building}")]
    DanglingBuilding {
        /// Cell that carried the reference.
        cell: CellCoord,
        /// Referenced building.
        building: BuildingId,
    },
    /// A building record lost its instance handle.
    #[error("building {building} anchored at {anchor} has no instance")]
    MissingBuildingInstance {
        /// Affected building.
        building: BuildingId,
        /// Anchor cell of the building.
        anchor: CellCoord,
    },
}
