#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Overlay layers that highlight cells above the terrain.
//!
//! Each layer owns one tile handle per cell at its depth. The handles live on
//! the [`GridMap`] cells; the layer tracks which cells it may light up (the
//! enable area) and whether all, none, or some of them are visible.

use std::collections::BTreeMap;

use glam::Vec3;
use ridge_defence_core::{
    CellCoord, CellOffset, OverlayDepth, Renderable, ResourceKind, SimulationError, Tint,
    UnitFactory, BLOCK_UNIT,
};
use ridge_defence_system_pointer::{CoordChange, PointerTracker};
use ridge_defence_world::GridMap;
use tracing::{debug, error};

/// Vertical separation between stacked overlay depths.
const DEPTH_STEP: f32 = 0.01;

/// Overlay tiles at one depth.
#[derive(Debug)]
pub struct OverlayLayer {
    depth: OverlayDepth,
    parent: Option<OverlayDepth>,
    enable_area: Vec<CellCoord>,
    visibility: Option<bool>,
    tint: Option<Tint>,
}

impl OverlayLayer {
    /// Installs a hidden tile on every terrain cell at `depth`, replacing
    /// tiles the cells already held at that depth.
    ///
    /// Every tile is requested before any cell is touched, so a missing tile
    /// leaves the map unchanged.
    pub fn new<F: UnitFactory>(
        map: &mut GridMap,
        depth: OverlayDepth,
        parent: Option<OverlayDepth>,
        factory: &mut F,
    ) -> Result<Self, SimulationError> {
        let lift = (depth.get() as f32 + 1.0) * DEPTH_STEP;
        let mut tiles: Vec<(CellCoord, Box<dyn Renderable>)> = Vec::new();
        for cell in map.cells() {
            let coord = cell.coord();
            let Some(bundle) = factory.overlay_tile(depth, coord) else {
                error!(depth = depth.get(), %coord, "overlay tile unavailable");
                for (_, handle) in tiles {
                    handle.dispose();
                }
                return Err(SimulationError::ResourceUnavailable {
                    kind: ResourceKind::Overlay,
                    name: format!("depth-{}", depth.get()),
                });
            };
            let (mut handle, _) = bundle.into_parts();
            handle.set_position(Vec3::new(
                (coord.x() as f32 + 0.5) * BLOCK_UNIT,
                cell.size().y + lift,
                (coord.z() as f32 + 0.5) * BLOCK_UNIT,
            ));
            tiles.push((coord, handle));
        }

        let mut enable_area = Vec::with_capacity(tiles.len());
        for (coord, handle) in tiles {
            if let Some(cell) = map.cell_mut(coord) {
                if cell.attach_overlay(depth, handle) {
                    debug!(depth = depth.get(), %coord, "replaced overlay tile");
                }
                enable_area.push(coord);
            }
        }

        Ok(Self {
            depth,
            parent,
            enable_area,
            visibility: Some(false),
            tint: None,
        })
    }

    /// Depth of the layer.
    #[must_use]
    pub const fn depth(&self) -> OverlayDepth {
        self.depth
    }

    /// Layer whose enable area bounds where this layer may be previewed.
    #[must_use]
    pub const fn parent(&self) -> Option<OverlayDepth> {
        self.parent
    }

    /// `Some(true)` when every enable-area tile is visible, `Some(false)`
    /// when none is, `None` when mixed.
    #[must_use]
    pub const fn visibility(&self) -> Option<bool> {
        self.visibility
    }

    /// Cells the layer may light up.
    #[must_use]
    pub fn enable_area(&self) -> &[CellCoord] {
        &self.enable_area
    }

    /// Last tint applied to the layer.
    #[must_use]
    pub const fn tint(&self) -> Option<Tint> {
        self.tint
    }

    /// Reports whether `coord` lies in the enable area.
    #[must_use]
    pub fn has(&self, coord: CellCoord) -> bool {
        self.enable_area.contains(&coord)
    }

    /// Replaces the enable area, hiding the previous one first.
    pub fn set_enable_area(&mut self, map: &mut GridMap, area: Vec<CellCoord>) {
        if self.visibility != Some(false) {
            self.force_all(map, false);
        }
        self.enable_area = area;
        self.recompute_visibility(map);
    }

    /// Shows every enable-area tile.
    pub fn show(&mut self, map: &mut GridMap) {
        if self.visibility == Some(true) {
            return;
        }
        self.force_all(map, true);
        self.visibility = Some(true);
    }

    /// Hides every enable-area tile.
    pub fn hide(&mut self, map: &mut GridMap) {
        if self.visibility == Some(false) {
            return;
        }
        self.force_all(map, false);
        self.visibility = Some(false);
    }

    /// Shows or hides one tile. Cells outside the enable area are ignored and
    /// yield `false`.
    pub fn set_visibility(&mut self, map: &mut GridMap, coord: CellCoord, visible: bool) -> bool {
        if !self.has(coord) {
            return false;
        }
        let changed = map
            .cell_mut(coord)
            .map_or(false, |cell| cell.set_overlay_visible(self.depth, visible));
        self.recompute_visibility(map);
        changed
    }

    /// Shows the tiles at `center + offset` for every offset; targets off the
    /// grid or outside the enable area are skipped.
    pub fn show_area(&mut self, map: &mut GridMap, center: CellCoord, offsets: &[CellOffset]) {
        for offset in offsets {
            let Some(target) = center.offset(*offset) else {
                continue;
            };
            if !self.has(target) {
                continue;
            }
            if let Some(cell) = map.cell_mut(target) {
                let _ = cell.set_overlay_visible(self.depth, true);
            }
        }
        self.recompute_visibility(map);
    }

    /// Recolours every enable-area tile.
    pub fn set_tint(&mut self, map: &mut GridMap, tint: Tint) {
        for coord in &self.enable_area {
            if let Some(cell) = map.cell_mut(*coord) {
                let _ = cell.tint_overlay(self.depth, tint);
            }
        }
        self.tint = Some(tint);
    }

    /// Derives the tri-state visibility by scanning the enable area. An empty
    /// area counts as hidden.
    pub fn recompute_visibility(&mut self, map: &GridMap) {
        let mut any_visible = false;
        let mut any_hidden = false;
        for coord in &self.enable_area {
            match map.cell(*coord).and_then(|cell| cell.overlay_visible(self.depth)) {
                Some(true) => any_visible = true,
                Some(false) => any_hidden = true,
                None => {}
            }
        }
        self.visibility = match (any_visible, any_hidden) {
            (true, true) => None,
            (true, false) => Some(true),
            (false, _) => Some(false),
        };
    }

    fn force_all(&self, map: &mut GridMap, visible: bool) {
        for coord in &self.enable_area {
            if let Some(cell) = map.cell_mut(*coord) {
                let _ = cell.set_overlay_visible(self.depth, visible);
            }
        }
    }
}

/// Overlay layers keyed by depth.
#[derive(Debug, Default)]
pub struct OverlaySet {
    layers: BTreeMap<OverlayDepth, OverlayLayer>,
}

impl OverlaySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the placement layer (green) and the attack-range layer (red)
    /// whose previews are bounded by the placement layer.
    pub fn standard<F: UnitFactory>(
        map: &mut GridMap,
        factory: &mut F,
    ) -> Result<Self, SimulationError> {
        let mut placement = OverlayLayer::new(map, OverlayDepth::PLACEMENT, None, factory)?;
        placement.set_tint(map, Tint::PLACEMENT);
        let mut attack = OverlayLayer::new(
            map,
            OverlayDepth::ATTACK,
            Some(OverlayDepth::PLACEMENT),
            factory,
        )?;
        attack.set_tint(map, Tint::ATTACK);

        let mut set = Self::new();
        set.insert(placement);
        set.insert(attack);
        Ok(set)
    }

    /// Adds a layer, replacing any layer at the same depth.
    pub fn insert(&mut self, layer: OverlayLayer) {
        let _ = self.layers.insert(layer.depth(), layer);
    }

    /// Layer at `depth`.
    #[must_use]
    pub fn layer(&self, depth: OverlayDepth) -> Option<&OverlayLayer> {
        self.layers.get(&depth)
    }

    /// Mutable layer at `depth`.
    pub fn layer_mut(&mut self, depth: OverlayDepth) -> Option<&mut OverlayLayer> {
        self.layers.get_mut(&depth)
    }

    /// Hides every layer.
    pub fn hide_all(&mut self, map: &mut GridMap) {
        for layer in self.layers.values_mut() {
            layer.hide(map);
        }
    }

    /// Pointer-driven preview of `offsets` on the layer at `depth`.
    ///
    /// Acts only when the tracked cell changed: the layer is hidden and, if
    /// the new cell exists and lies inside the parent's enable area, the
    /// offsets are shown around it. Returns whether the preview was redrawn.
    pub fn track(
        &mut self,
        map: &mut GridMap,
        depth: OverlayDepth,
        tracker: &mut PointerTracker,
        offsets: &[CellOffset],
    ) -> bool {
        let Some(parent) = self.layers.get(&depth).map(OverlayLayer::parent) else {
            return false;
        };
        let CoordChange::Changed(coord) = tracker.refresh() else {
            return false;
        };

        let anchor = coord.filter(|coord| {
            map.cell(*coord).is_some()
                && parent.map_or(true, |parent| {
                    self.layers
                        .get(&parent)
                        .map_or(false, |layer| layer.has(*coord))
                })
        });

        let Some(layer) = self.layers.get_mut(&depth) else {
            return false;
        };
        layer.hide(map);
        if let Some(anchor) = anchor {
            layer.show_area(map, anchor, offsets);
        }
        true
    }
}
