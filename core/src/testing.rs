//! Recording collaborators for tests.
//!
//! Handles share their state with the factory that issued them so a test can
//! inspect what the simulation did to a handle after ownership moved into the
//! grid or the roster.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use glam::Vec3;

use crate::{
    BuildingRequest, BuildingStyle, CellCoord, InstanceBundle, OverlayDepth, Renderable, Tint,
    UnitFactory, UnitKind,
};

/// Observable state of a [`RecordingHandle`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandleState {
    /// Last position assigned.
    pub position: Vec3,
    /// Last visibility assigned.
    pub visible: bool,
    /// Last yaw assigned.
    pub rotation_y: f32,
    /// Last tint assigned.
    pub tint: Option<Tint>,
    /// Whether the handle was disposed.
    pub disposed: bool,
}

/// Handle that records every call into shared state.
#[derive(Debug)]
pub struct RecordingHandle {
    state: Rc<RefCell<HandleState>>,
}

impl Renderable for RecordingHandle {
    fn set_position(&mut self, position: Vec3) {
        self.state.borrow_mut().position = position;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    fn set_rotation_y(&mut self, radians: f32) {
        self.state.borrow_mut().rotation_y = radians;
    }

    fn set_tint(&mut self, tint: Tint) {
        self.state.borrow_mut().tint = Some(tint);
    }

    fn dispose(self: Box<Self>) {
        self.state.borrow_mut().disposed = true;
    }
}

/// Building request captured by the [`RecordingFactory`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedBuilding {
    /// Category tag.
    pub desc: String,
    /// Requested style.
    pub style: BuildingStyle,
}

/// Factory that issues [`RecordingHandle`]s and remembers them by label.
///
/// Labels are `building:<desc>`, `enemy:<name>`, `operator:<name>`, and
/// `overlay:<depth>:<x>,<z>`.
#[derive(Debug)]
pub struct RecordingFactory {
    missing: BTreeSet<String>,
    unit_size: Vec3,
    building_size: Vec3,
    issued: Vec<(String, Rc<RefCell<HandleState>>)>,
    buildings: Vec<RecordedBuilding>,
}

impl Default for RecordingFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingFactory {
    /// Creates a factory that can instantiate every resource.
    #[must_use]
    pub fn new() -> Self {
        Self {
            missing: BTreeSet::new(),
            unit_size: Vec3::splat(4.0),
            building_size: Vec3::new(10.0, 6.0, 10.0),
            issued: Vec::new(),
            buildings: Vec::new(),
        }
    }

    /// Marks a resource name as unavailable.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        let _ = self.missing.insert(name.to_owned());
        self
    }

    /// Overrides the bounding size reported for units.
    #[must_use]
    pub fn with_unit_size(mut self, size: Vec3) -> Self {
        self.unit_size = size;
        self
    }

    /// Overrides the bounding size reported for buildings.
    #[must_use]
    pub fn with_building_size(mut self, size: Vec3) -> Self {
        self.building_size = size;
        self
    }

    /// State of the most recently issued handle with the label.
    #[must_use]
    pub fn state(&self, label: &str) -> Option<HandleState> {
        self.issued
            .iter()
            .rev()
            .find(|(issued, _)| issued == label)
            .map(|(_, state)| state.borrow().clone())
    }

    /// States of every handle issued with the label, oldest first.
    #[must_use]
    pub fn states(&self, label: &str) -> Vec<HandleState> {
        self.issued
            .iter()
            .filter(|(issued, _)| issued == label)
            .map(|(_, state)| state.borrow().clone())
            .collect()
    }

    /// Number of issued handles that have not been disposed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.issued
            .iter()
            .filter(|(_, state)| !state.borrow().disposed)
            .count()
    }

    /// Building requests in the order they were made.
    #[must_use]
    pub fn building_requests(&self) -> &[RecordedBuilding] {
        &self.buildings
    }

    fn issue(&mut self, label: String, size: Vec3) -> InstanceBundle {
        let state = Rc::new(RefCell::new(HandleState::default()));
        self.issued.push((label, Rc::clone(&state)));
        InstanceBundle::new(Box::new(RecordingHandle { state }), size)
    }
}

impl UnitFactory for RecordingFactory {
    fn building(&mut self, request: &BuildingRequest<'_>) -> Option<InstanceBundle> {
        if self.missing.contains(request.desc) {
            return None;
        }
        self.buildings.push(RecordedBuilding {
            desc: request.desc.to_owned(),
            style: request.style,
        });
        let size = self.building_size * request.size_alpha;
        Some(self.issue(format!("building:{}", request.desc), size))
    }

    fn unit(&mut self, kind: UnitKind, name: &str) -> Option<InstanceBundle> {
        if self.missing.contains(name) {
            return None;
        }
        let prefix = match kind {
            UnitKind::Enemy => "enemy",
            UnitKind::Operator => "operator",
        };
        Some(self.issue(format!("{prefix}:{name}"), self.unit_size))
    }

    fn overlay_tile(&mut self, depth: OverlayDepth, cell: CellCoord) -> Option<InstanceBundle> {
        if self.missing.contains("overlay") {
            return None;
        }
        let label = format!("overlay:{}:{},{}", depth.get(), cell.x(), cell.z());
        Some(self.issue(label, Vec3::new(10.0, 0.0, 10.0)))
    }
}
