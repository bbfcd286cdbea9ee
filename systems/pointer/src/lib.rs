#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pointer tracking that maps screen movement onto terrain cells.

use glam::{Vec2, Vec3};
use ridge_defence_core::{world_to_abstract, CellCoord};

/// Ray test from a screen-space pointer position onto the terrain.
pub trait TerrainPicker {
    /// World-space intersection with the terrain, or `None` when the ray
    /// misses.
    fn pick(&self, pointer: Vec2) -> Option<Vec3>;
}

impl<F> TerrainPicker for F
where
    F: Fn(Vec2) -> Option<Vec3>,
{
    fn pick(&self, pointer: Vec2) -> Option<Vec3> {
        self(pointer)
    }
}

/// Outcome of [`PointerTracker::refresh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordChange {
    /// The floored coordinate is the same as on the previous refresh.
    Unchanged,
    /// The floored coordinate changed; `None` means the pointer left the
    /// terrain.
    Changed(Option<CellCoord>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LastCoord {
    Stale,
    Seen(Option<CellCoord>),
}

/// Tracks the pointer and the terrain point underneath it.
#[derive(Debug)]
pub struct PointerTracker {
    pointer_pos: Option<Vec2>,
    pick_pos: Option<Vec3>,
    last_coord: LastCoord,
    enabled: bool,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    /// Creates an enabled tracker that has not seen the pointer yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pointer_pos: None,
            pick_pos: None,
            last_coord: LastCoord::Stale,
            enabled: true,
        }
    }

    /// Records a pointer move and re-picks the terrain underneath it.
    pub fn pointer_moved<P: TerrainPicker + ?Sized>(&mut self, picker: &P, position: Vec2) {
        if !self.enabled {
            return;
        }
        self.pointer_pos = Some(position);
        self.pick_pos = picker.pick(position);
    }

    /// Forgets the pick point after the pointer left the canvas.
    pub fn pointer_left(&mut self) {
        self.pointer_pos = None;
        self.pick_pos = None;
    }

    /// Last screen-space pointer position.
    #[must_use]
    pub const fn pointer_pos(&self) -> Option<Vec2> {
        self.pointer_pos
    }

    /// World-space terrain point under the pointer.
    #[must_use]
    pub const fn pick_pos(&self) -> Option<Vec3> {
        self.pick_pos
    }

    /// Cell under the pointer, flooring the pick point in cell units.
    #[must_use]
    pub fn pick_coord(&self) -> Option<CellCoord> {
        let pick = self.pick_pos?;
        CellCoord::from_abstract(world_to_abstract(Vec2::new(pick.x, pick.z)))
    }

    /// Compares the floored coordinate with the one seen on the previous
    /// refresh.
    pub fn refresh(&mut self) -> CoordChange {
        let current = self.pick_coord();
        if self.last_coord == LastCoord::Seen(current) {
            return CoordChange::Unchanged;
        }
        self.last_coord = LastCoord::Seen(current);
        CoordChange::Changed(current)
    }

    /// Forces the next refresh to report a change.
    pub fn invalidate(&mut self) {
        self.last_coord = LastCoord::Stale;
    }

    /// Resumes tracking pointer moves.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stops tracking and clears the pick point and cached coordinate.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.pick_pos = None;
        self.last_coord = LastCoord::Stale;
    }

    /// Reports whether pointer moves are tracked.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}
