//! Contracts with the presentation layer.
//!
//! The simulation positions, shows, hides, and disposes handles but never
//! builds geometry or materials itself.

use std::fmt;

use glam::Vec3;

use crate::{CellCoord, OverlayDepth, Tint};

/// Opaque handle to something drawn in the scene.
pub trait Renderable: fmt::Debug {
    /// Moves the handle to a world-space position.
    fn set_position(&mut self, position: Vec3);

    /// Shows or hides the handle.
    fn set_visible(&mut self, visible: bool);

    /// Rotates the handle about the vertical axis, in radians.
    fn set_rotation_y(&mut self, radians: f32);

    /// Recolours the handle. Handles without a tintable material ignore this.
    fn set_tint(&mut self, _tint: Tint) {}

    /// Releases every resource owned by the handle.
    fn dispose(self: Box<Self>);
}

/// Instance produced by the [`UnitFactory`] together with its world-space
/// bounding size.
#[derive(Debug)]
pub struct InstanceBundle {
    handle: Box<dyn Renderable>,
    size: Vec3,
}

impl InstanceBundle {
    /// Bundles a handle with its bounding size.
    #[must_use]
    pub fn new(handle: Box<dyn Renderable>, size: Vec3) -> Self {
        Self { handle, size }
    }

    /// World-space bounding size of the instance.
    #[must_use]
    pub const fn size(&self) -> Vec3 {
        self.size
    }

    /// Splits the bundle into its handle and size.
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn Renderable>, Vec3) {
        (self.handle, self.size)
    }
}

/// Material treatment requested for a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildingStyle {
    /// Render both faces of every polygon.
    pub double_sided: bool,
    /// Cast shadows onto the terrain.
    pub casts_shadow: bool,
}

impl BuildingStyle {
    /// Chooses the style for a building category: route markers are drawn
    /// plainly, decorations get the full treatment.
    #[must_use]
    pub fn for_desc(desc: &str) -> Self {
        let decoration = !matches!(desc, "entry" | "destination");
        Self {
            double_sided: decoration,
            casts_shadow: decoration,
        }
    }
}

/// Parameters of a building instantiation request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingRequest<'a> {
    /// Category tag naming the model.
    pub desc: &'a str,
    /// Model scale multiplier.
    pub size_alpha: f32,
    /// Material treatment.
    pub style: BuildingStyle,
}

/// Category of a unit instantiation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Hostile unit walking a route.
    Enemy,
    /// Deployable defender.
    Operator,
}

/// Collaborator that clones renderable instances on demand.
///
/// Every method returns `None` when the named resource is unavailable; the
/// simulation turns that into a hard error.
pub trait UnitFactory {
    /// Instantiates a building or decoration model.
    fn building(&mut self, request: &BuildingRequest<'_>) -> Option<InstanceBundle>;

    /// Instantiates a unit by type name.
    fn unit(&mut self, kind: UnitKind, name: &str) -> Option<InstanceBundle>;

    /// Instantiates a flat highlight tile for the overlay at `depth`.
    fn overlay_tile(&mut self, depth: OverlayDepth, cell: CellCoord) -> Option<InstanceBundle>;
}

impl<F: UnitFactory + ?Sized> UnitFactory for &mut F {
    fn building(&mut self, request: &BuildingRequest<'_>) -> Option<InstanceBundle> {
        (**self).building(request)
    }

    fn unit(&mut self, kind: UnitKind, name: &str) -> Option<InstanceBundle> {
        (**self).unit(kind, name)
    }

    fn overlay_tile(&mut self, depth: OverlayDepth, cell: CellCoord) -> Option<InstanceBundle> {
        (**self).overlay_tile(depth, cell)
    }
}
