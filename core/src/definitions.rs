//! Immutable map and unit templates as authored in JSON documents.
//!
//! The simulation never mutates these values. Runtime state that consumes
//! them destructively, such as the wave queue, works on clones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BlockType, CellOffset, Waypoint};

/// Complete description of a playable map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefinition {
    /// Display name of the map.
    pub name: String,
    /// Number of cells along `x`.
    pub map_width: u32,
    /// Number of cells along `z`.
    pub map_height: u32,
    /// Asset names grouped by category; forwarded to the presentation layer.
    #[serde(default)]
    pub resources: ResourceManifest,
    /// Terrain cells. Positions absent from the list have no terrain.
    pub block_info: Vec<CellDefinition>,
    /// Lighting parameters; forwarded to the presentation layer.
    #[serde(default)]
    pub light: Option<LightDefinition>,
    /// Waves in the order they are released.
    pub waves: Vec<WaveDefinition>,
    /// Battle parameters.
    pub ctl_data: ControlData,
}

/// Asset names required by a map, keyed by category such as `block`,
/// `enemy`, or `model`.
pub type ResourceManifest = BTreeMap<String, Vec<String>>;

/// One authored terrain cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDefinition {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub z: u32,
    /// Operator classes the cell accepts.
    pub block_type: BlockType,
    /// Whether operators may be deployed on the cell.
    pub placeable: bool,
    /// Whether enemies may walk across the cell.
    pub passable: bool,
    /// Height multiplier applied to [`crate::BLOCK_UNIT`].
    pub height_alpha: f32,
    /// Texture identifiers for each face group.
    #[serde(default)]
    pub texture: TextureSet,
    /// Building anchored on this cell when the map loads.
    #[serde(default)]
    pub building_info: Option<BuildingDefinition>,
}

/// Texture identifiers of a terrain cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSet {
    /// Top face texture.
    pub top: String,
    /// Side faces texture.
    pub side: String,
    /// Bottom face texture.
    pub bottom: String,
}

impl Default for TextureSet {
    fn default() -> Self {
        Self {
            top: "topDefault".to_owned(),
            side: "sideDefault".to_owned(),
            bottom: "bottomDefault".to_owned(),
        }
    }
}

/// Authored building placed on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDefinition {
    /// Category tag; `entry` and `destination` mark route endpoints, anything
    /// else is a decoration.
    pub desc: String,
    /// Yaw in degrees.
    #[serde(default)]
    pub rotation: f32,
    /// Model scale multiplier.
    #[serde(default = "unit_scale")]
    pub size_alpha: f32,
    /// Number of columns covered.
    #[serde(default = "single_span", alias = "colSpan")]
    pub x_span: u32,
    /// Number of rows covered.
    #[serde(default = "single_span", alias = "rowSpan")]
    pub z_span: u32,
}

impl BuildingDefinition {
    /// Creates a single-cell building definition with default rotation and
    /// scale.
    #[must_use]
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            desc: desc.into(),
            rotation: 0.0,
            size_alpha: 1.0,
            x_span: 1,
            z_span: 1,
        }
    }

    /// Overrides the footprint span.
    #[must_use]
    pub fn with_span(mut self, x_span: u32, z_span: u32) -> Self {
        self.x_span = x_span;
        self.z_span = z_span;
        self
    }

    /// Overrides the yaw in degrees.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

fn unit_scale() -> f32 {
    1.0
}

fn single_span() -> u32 {
    1
}

/// Lighting parameters of a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightDefinition {
    /// Ambient light intensity.
    pub env_intensity: f32,
    /// Ambient light colour as a CSS string.
    pub env_color: String,
    /// Sun colour as a CSS string.
    pub color: String,
    /// Sun intensity.
    pub intensity: f32,
    /// Hour of day; local time when absent.
    #[serde(default)]
    pub hour: Option<f32>,
    /// Sun azimuth in degrees; random when absent.
    #[serde(default)]
    pub phi: Option<f32>,
}

/// One wave of enemies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveDefinition {
    /// Longest wait before the next wave, in seconds.
    #[serde(default)]
    pub max_waiting_time: f32,
    /// Enemies in spawn order.
    pub fragments: Vec<FragmentDefinition>,
}

/// One scheduled enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentDefinition {
    /// Timeline time of the spawn in seconds.
    pub time: f32,
    /// Unit type name.
    pub name: String,
    /// Route; the first entry must be a move step naming the spawn cell.
    #[serde(alias = "route")]
    pub path: Vec<Waypoint>,
}

/// Battle parameters of a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlData {
    /// Life points at the start of the battle.
    #[serde(rename = "maxLP")]
    pub max_life_points: u32,
    /// Number of enemies the map releases.
    #[serde(rename = "enemyNum")]
    pub enemy_count: u32,
    /// Cost in the pool at the start of the battle.
    #[serde(rename = "initCost")]
    pub initial_cost: f32,
    /// Regeneration stops once the pool exceeds this value.
    #[serde(rename = "maxCost")]
    pub max_cost: f32,
    /// Cost regenerated per second.
    #[serde(rename = "costInc")]
    pub cost_regen: f32,
    /// Multiplier applied to every enemy's move speed.
    #[serde(rename = "moveSpdMulti", default = "unit_scale")]
    pub speed_multiplier: f32,
    /// Maximum number of operators on the field at once.
    #[serde(rename = "oprLimit")]
    pub operator_limit: usize,
}

/// Unit data keyed by unit name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCatalog {
    /// Deployable operators.
    #[serde(default)]
    pub operator: BTreeMap<String, OperatorData>,
    /// Enemy types.
    #[serde(default)]
    pub enemy: BTreeMap<String, EnemyData>,
}

/// Static data of an operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorData {
    /// Cell class the operator may be deployed on.
    #[serde(rename = "posType")]
    pub position_type: BlockType,
    /// Deployment cost before any withdrawal.
    pub cost: u32,
    /// Cooldown after a withdrawal, in seconds.
    #[serde(rename = "respawnTime", default)]
    pub respawn_time: f32,
    /// Attack area relative to the operator when facing right.
    #[serde(rename = "atkArea", default)]
    pub attack_area: Vec<CellOffset>,
}

/// Static data of an enemy type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Speed in cells per second before the map multiplier.
    #[serde(rename = "moveSpd")]
    pub move_speed: f32,
}
