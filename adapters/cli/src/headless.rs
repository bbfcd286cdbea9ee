//! Presentation collaborators for runs without a scene.

use std::collections::BTreeSet;

use glam::Vec3;
use ridge_defence_core::{
    BuildingRequest, CellCoord, InstanceBundle, MapDefinition, OverlayDepth, Renderable,
    UnitCatalog, UnitFactory, UnitKind, BLOCK_UNIT,
};
use tracing::trace;

const UNIT_SIZE: Vec3 = Vec3::new(4.0, 4.0, 4.0);
const BUILDING_SIZE: Vec3 = Vec3::new(BLOCK_UNIT, 6.0, BLOCK_UNIT);

/// Handle that only logs what the simulation asks of it.
#[derive(Debug)]
pub(crate) struct HeadlessHandle {
    label: String,
}

impl Renderable for HeadlessHandle {
    fn set_position(&mut self, position: Vec3) {
        trace!(handle = %self.label, ?position, "moved");
    }

    fn set_visible(&mut self, visible: bool) {
        trace!(handle = %self.label, visible, "visibility");
    }

    fn set_rotation_y(&mut self, radians: f32) {
        trace!(handle = %self.label, radians, "rotated");
    }

    fn dispose(self: Box<Self>) {
        trace!(handle = %self.label, "disposed");
    }
}

/// Factory that can instantiate every model named by the map's resource
/// manifest and every unit in the catalogue.
#[derive(Debug)]
pub(crate) struct HeadlessFactory {
    models: BTreeSet<String>,
    enemies: BTreeSet<String>,
    operators: BTreeSet<String>,
}

impl HeadlessFactory {
    pub(crate) fn new(map: &MapDefinition, catalog: &UnitCatalog) -> Self {
        let models = map.resources.values().flatten().cloned().collect();
        let enemies = catalog
            .enemy
            .keys()
            .chain(map.resources.get("enemy").into_iter().flatten())
            .cloned()
            .collect();
        let operators = catalog.operator.keys().cloned().collect();
        Self {
            models,
            enemies,
            operators,
        }
    }

    fn issue(label: String, size: Vec3) -> InstanceBundle {
        InstanceBundle::new(Box::new(HeadlessHandle { label }), size)
    }
}

impl UnitFactory for HeadlessFactory {
    fn building(&mut self, request: &BuildingRequest<'_>) -> Option<InstanceBundle> {
        if !self.models.contains(request.desc) {
            return None;
        }
        Some(Self::issue(
            format!("building:{}", request.desc),
            BUILDING_SIZE * request.size_alpha,
        ))
    }

    fn unit(&mut self, kind: UnitKind, name: &str) -> Option<InstanceBundle> {
        let (known, prefix) = match kind {
            UnitKind::Enemy => (&self.enemies, "enemy"),
            UnitKind::Operator => (&self.operators, "operator"),
        };
        if !known.contains(name) {
            return None;
        }
        Some(Self::issue(format!("{prefix}:{name}"), UNIT_SIZE))
    }

    fn overlay_tile(&mut self, depth: OverlayDepth, cell: CellCoord) -> Option<InstanceBundle> {
        Some(Self::issue(
            format!("overlay:{}:{cell}", depth.get()),
            Vec3::new(BLOCK_UNIT, 0.0, BLOCK_UNIT),
        ))
    }
}
