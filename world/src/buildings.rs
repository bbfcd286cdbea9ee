//! Authoritative building state management utilities.

use std::collections::BTreeMap;

use ridge_defence_core::{BuildingId, CellCoord, CellRect, Renderable};

/// Building bound onto the grid.
///
/// Every cell in the footprint stores the building's identifier; the record
/// itself, and therefore the instance handle, exists once per building.
#[derive(Debug)]
pub struct Building {
    id: BuildingId,
    desc: String,
    rotation: f32,
    size_alpha: f32,
    footprint: CellRect,
    instance: Option<Box<dyn Renderable>>,
}

impl Building {
    /// Identifier allocated by the grid.
    #[must_use]
    pub const fn id(&self) -> BuildingId {
        self.id
    }

    /// Category tag of the building.
    #[must_use]
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Yaw in degrees.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Model scale multiplier.
    #[must_use]
    pub const fn size_alpha(&self) -> f32 {
        self.size_alpha
    }

    /// Cell that owns the instance.
    #[must_use]
    pub const fn anchor(&self) -> CellCoord {
        self.footprint.origin()
    }

    /// Cells covered by the building.
    #[must_use]
    pub const fn footprint(&self) -> CellRect {
        self.footprint
    }

    /// Reports whether the instance handle is still attached.
    #[must_use]
    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }
}

/// Parameters of a building about to be registered.
#[derive(Debug)]
pub(crate) struct NewBuilding {
    pub(crate) desc: String,
    pub(crate) rotation: f32,
    pub(crate) size_alpha: f32,
    pub(crate) footprint: CellRect,
    pub(crate) instance: Box<dyn Renderable>,
}

/// Registry that stores buildings and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct BuildingRegistry {
    entries: BTreeMap<BuildingId, Building>,
    next_building_id: BuildingId,
}

impl BuildingRegistry {
    /// Creates an empty registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_building_id: BuildingId::new(0),
        }
    }

    pub(crate) fn insert(&mut self, building: NewBuilding) -> BuildingId {
        let id = self.next_building_id;
        self.next_building_id = BuildingId::new(id.get().wrapping_add(1));
        let previous = self.entries.insert(
            id,
            Building {
                id,
                desc: building.desc,
                rotation: building.rotation,
                size_alpha: building.size_alpha,
                footprint: building.footprint,
                instance: Some(building.instance),
            },
        );
        debug_assert!(previous.is_none(), "building identifiers are never reused");
        id
    }

    pub(crate) fn get(&self, id: BuildingId) -> Option<&Building> {
        self.entries.get(&id)
    }

    /// Detaches and returns the record together with its instance. A record
    /// without an instance stays registered.
    pub(crate) fn remove(&mut self, id: BuildingId) -> Option<(Building, Box<dyn Renderable>)> {
        if !self.entries.get(&id)?.has_instance() {
            return None;
        }
        let mut building = self.entries.remove(&id)?;
        let instance = building.instance.take()?;
        Some((building, instance))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Building> {
        self.entries.values()
    }

    #[cfg(test)]
    pub(crate) fn strip_instance(&mut self, id: BuildingId) -> Option<Box<dyn Renderable>> {
        self.entries.get_mut(&id)?.instance.take()
    }

    #[cfg(test)]
    pub(crate) fn forget(&mut self, id: BuildingId) -> Option<Building> {
        self.entries.remove(&id)
    }
}
