#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Battle session that owns the grid, the systems, and the collaborators,
//! and drives them in a fixed order every tick.
//!
//! A tick advances the timeline, regenerates cost and cooldowns, releases at
//! most one due enemy, moves every enemy, and finally derives the battle
//! status.

mod timeline;

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use ridge_defence_core::{
    CellCoord, Event, Facing, GameStatus, MapDefinition, OverlayDepth, Renderable, ResourceKind,
    SimulationError, UnitCatalog, UnitFactory, UnitKind,
};
use ridge_defence_system_economy::{DeployRejection, DeploymentEconomy, Withdrawal};
use ridge_defence_system_movement::MovementEngine;
use ridge_defence_system_overlay::OverlaySet;
use ridge_defence_system_pointer::{PointerTracker, TerrainPicker};
use ridge_defence_system_spawning::WaveScheduler;
use ridge_defence_world::{EnemyRoster, GridMap};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use timeline::Timeline;

/// Reasons a session request is refused or fails.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SessionError {
    /// The target cell has no terrain.
    #[error("cell {cell} has no terrain")]
    UnknownCell {
        /// Requested cell.
        cell: CellCoord,
    },
    /// The target cell does not accept the operator's class.
    #[error("operator `{name}` cannot be placed on {cell}")]
    NotPlaceable {
        /// Requested cell.
        cell: CellCoord,
        /// Operator name.
        name: String,
    },
    /// A building or another operator already stands on the cell.
    #[error("cell {cell} is occupied")]
    Occupied {
        /// Requested cell.
        cell: CellCoord,
    },
    /// The economy refused the request.
    #[error(transparent)]
    Deploy(#[from] DeployRejection),
    /// Static data or resources contradict the simulation.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Operator standing on the field.
#[derive(Debug)]
pub struct DeployedOperator {
    cell: CellCoord,
    facing: Facing,
    instance: Box<dyn Renderable>,
}

impl DeployedOperator {
    /// Cell the operator occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Orientation chosen at deployment.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }
}

#[derive(Debug)]
struct Placement {
    operator: String,
    facing: Facing,
}

/// One battle on one map.
#[derive(Debug)]
pub struct Session<F: UnitFactory> {
    definition: MapDefinition,
    catalog: UnitCatalog,
    factory: F,
    map: GridMap,
    overlays: OverlaySet,
    tracker: PointerTracker,
    timeline: Timeline,
    scheduler: WaveScheduler,
    movement: MovementEngine,
    economy: DeploymentEconomy,
    enemies: EnemyRoster,
    deployed: BTreeMap<String, DeployedOperator>,
    placement: Option<Placement>,
    last_status: GameStatus,
}

impl<F: UnitFactory> Session<F> {
    /// Builds the grid, its buildings, and the standard overlay layers, and
    /// prepares every system in standby.
    pub fn new(
        definition: MapDefinition,
        catalog: UnitCatalog,
        mut factory: F,
    ) -> Result<Self, SimulationError> {
        let mut map = GridMap::from_definition(&definition, &mut factory)?;
        let overlays = OverlaySet::standard(&mut map, &mut factory)?;
        let scheduler = WaveScheduler::new(&definition.waves);
        let movement = MovementEngine::new(definition.ctl_data.speed_multiplier);
        let economy = DeploymentEconomy::new(&definition.ctl_data, &catalog);
        let last_status = economy.status();

        info!(
            map = %definition.name,
            width = definition.map_width,
            height = definition.map_height,
            waves = scheduler.pending_waves(),
            "session ready"
        );
        Ok(Self {
            definition,
            catalog,
            factory,
            map,
            overlays,
            tracker: PointerTracker::new(),
            timeline: Timeline::new(),
            scheduler,
            movement,
            economy,
            enemies: EnemyRoster::new(),
            deployed: BTreeMap::new(),
            placement: None,
            last_status,
        })
    }

    /// Starts or resumes the battle. A finished battle stays finished.
    pub fn start(&mut self, out: &mut Vec<Event>) -> GameStatus {
        if self.economy.status().is_terminal() {
            return self.sync_status(out);
        }
        self.economy.set_running(true);
        self.timeline.resume();
        self.sync_status(out)
    }

    /// Pauses the battle, keeping the timeline.
    pub fn pause(&mut self, out: &mut Vec<Event>) -> GameStatus {
        if self.economy.status() == GameStatus::Running {
            self.economy.set_running(false);
            self.timeline.stop();
        }
        self.sync_status(out)
    }

    /// Advances the battle by `interval` seconds.
    ///
    /// Does nothing unless the battle is running. A spawn fault discards the
    /// offending fragment; the rest of the tick still runs and the fault is
    /// returned afterwards.
    pub fn advance(
        &mut self,
        interval: f32,
        out: &mut Vec<Event>,
    ) -> Result<GameStatus, SimulationError> {
        if self.economy.status() != GameStatus::Running {
            return Ok(self.sync_status(out));
        }

        self.timeline.advance(interval);
        let elapsed = self.timeline.elapsed();

        self.economy.update_cost(interval);
        self.economy.tick_cooldowns(interval);

        let spawned = self.scheduler.handle(
            elapsed,
            &self.map,
            &self.catalog,
            &mut self.enemies,
            &mut self.factory,
            out,
        );

        let leaked = self.movement.handle(interval, elapsed, &mut self.enemies, out);
        for _ in 0..leaked {
            self.economy.record_leak();
        }

        let status = self.sync_status(out);
        if status.is_terminal() {
            self.timeline.stop();
            info!(?status, at = %self.timeline, "battle finished");
        }
        spawned.map(|_| status)
    }

    /// Places `name` on `cell`, paying its cost.
    ///
    /// The cell must have terrain, accept the operator's class, and hold no
    /// building or other operator. Returns the deployment slots left.
    pub fn deploy_operator(
        &mut self,
        name: &str,
        cell: CellCoord,
        facing: Facing,
        out: &mut Vec<Event>,
    ) -> Result<usize, SessionError> {
        let position_type = self
            .economy
            .check_deploy(name)
            .map(|state| state.position_type())
            .map_err(|rejection| self.reject(rejection.into()))?;

        let Some(target) = self.map.cell(cell) else {
            return Err(self.reject(SessionError::UnknownCell { cell }));
        };
        if !target.accepts(Some(position_type)) {
            return Err(self.reject(SessionError::NotPlaceable {
                cell,
                name: name.to_owned(),
            }));
        }
        if target.is_occupied() || self.operator_at(cell).is_some() {
            return Err(self.reject(SessionError::Occupied { cell }));
        }
        let seat = target.top_center();

        let Some(bundle) = self.factory.unit(UnitKind::Operator, name) else {
            error!(operator = name, "operator model unavailable");
            return Err(SimulationError::ResourceUnavailable {
                kind: ResourceKind::Operator,
                name: name.to_owned(),
            }
            .into());
        };
        let (mut instance, size) = bundle.into_parts();

        let remaining_slots = match self.economy.deploy(name, facing) {
            Ok(remaining) => remaining,
            Err(rejection) => {
                instance.dispose();
                return Err(rejection.into());
            }
        };
        instance.set_position(seat + Vec3::new(0.0, size.y / 2.0, 0.0));
        instance.set_rotation_y(facing.rotation_y());
        let _ = self.deployed.insert(
            name.to_owned(),
            DeployedOperator {
                cell,
                facing,
                instance,
            },
        );

        debug!(operator = name, %cell, ?facing, remaining_slots, "operator placed");
        out.push(Event::OperatorDeployed {
            name: name.to_owned(),
            cell,
            facing,
            remaining_slots,
        });
        Ok(remaining_slots)
    }

    /// Returns `name` to the bench.
    pub fn withdraw_operator(
        &mut self,
        name: &str,
        out: &mut Vec<Event>,
    ) -> Result<Withdrawal, SessionError> {
        let withdrawal = self.economy.withdraw(name)?;
        if let Some(operator) = self.deployed.remove(name) {
            operator.instance.dispose();
        }
        out.push(Event::OperatorWithdrawn {
            name: name.to_owned(),
            refund: withdrawal.refund,
            next_cost: withdrawal.next_cost,
            remaining_slots: withdrawal.remaining_slots,
        });
        Ok(withdrawal)
    }

    /// Tears down every enemy and operator and restores the battle to its
    /// initial state.
    pub fn reset(&mut self, out: &mut Vec<Event>) {
        let enemies = self.enemies.clear();
        let operators = self.deployed.len();
        for (_, operator) in std::mem::take(&mut self.deployed) {
            operator.instance.dispose();
        }
        self.economy.reset();
        self.scheduler.reset();
        self.timeline.reset();
        self.placement = None;
        self.overlays.hide_all(&mut self.map);
        self.tracker.invalidate();

        info!(enemies, operators, "session reset");
        let _ = self.sync_status(out);
    }

    /// Selects `name` for placement and lights up the cells it may occupy.
    pub fn begin_placement(&mut self, name: &str) -> Result<(), SessionError> {
        let Some(position_type) = self.economy.operator(name).map(|state| state.position_type())
        else {
            return Err(self.reject(
                DeployRejection::UnknownOperator {
                    name: name.to_owned(),
                }
                .into(),
            ));
        };

        let area = self.map.placeable_area(Some(position_type));
        if let Some(layer) = self.overlays.layer_mut(OverlayDepth::ATTACK) {
            layer.hide(&mut self.map);
        }
        if let Some(layer) = self.overlays.layer_mut(OverlayDepth::PLACEMENT) {
            layer.set_enable_area(&mut self.map, area);
            layer.show(&mut self.map);
        }
        self.placement = Some(Placement {
            operator: name.to_owned(),
            facing: Facing::Right,
        });
        self.tracker.enable();
        self.tracker.invalidate();
        Ok(())
    }

    /// Orients the attack-range preview of the selected operator.
    pub fn set_placement_facing(&mut self, facing: Facing) -> bool {
        let Some(placement) = self.placement.as_mut() else {
            return false;
        };
        placement.facing = facing;
        self.tracker.invalidate();
        self.refresh_preview()
    }

    /// Feeds a pointer move and redraws the attack-range preview if the cell
    /// under the pointer changed.
    pub fn pointer_moved<P: TerrainPicker + ?Sized>(&mut self, picker: &P, position: Vec2) -> bool {
        self.tracker.pointer_moved(picker, position);
        self.refresh_preview()
    }

    /// Clears the pick point after the pointer left the canvas.
    pub fn pointer_left(&mut self) -> bool {
        self.tracker.pointer_left();
        self.refresh_preview()
    }

    /// Redraws the attack-range preview when the tracked cell changed.
    pub fn refresh_preview(&mut self) -> bool {
        let Some(placement) = self.placement.as_ref() else {
            return false;
        };
        let Some(state) = self.economy.operator(&placement.operator) else {
            return false;
        };
        let area = state.attack_area_facing(placement.facing);
        self.overlays
            .track(&mut self.map, OverlayDepth::ATTACK, &mut self.tracker, &area)
    }

    /// Cell under the pointer if the selected operator may be dropped there.
    #[must_use]
    pub fn drop_target(&self) -> Option<CellCoord> {
        if self.placement.is_none() {
            return None;
        }
        let coord = self.tracker.pick_coord()?;
        self.overlays
            .layer(OverlayDepth::PLACEMENT)
            .filter(|layer| layer.has(coord))
            .map(|_| coord)
    }

    /// Deselects the operator and hides every overlay.
    pub fn end_placement(&mut self) {
        self.placement = None;
        self.overlays.hide_all(&mut self.map);
        self.tracker.invalidate();
    }

    /// Battle status after the last request.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.economy.status()
    }

    /// Map template the session was built from.
    #[must_use]
    pub fn definition(&self) -> &MapDefinition {
        &self.definition
    }

    /// Grid state.
    #[must_use]
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Overlay layers.
    #[must_use]
    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    /// Battle clock.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Wave queue.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Cost pool, operators, and battle counters.
    #[must_use]
    pub fn economy(&self) -> &DeploymentEconomy {
        &self.economy
    }

    /// Enemies on the map.
    #[must_use]
    pub fn enemies(&self) -> &EnemyRoster {
        &self.enemies
    }

    /// Pointer state.
    #[must_use]
    pub fn tracker(&self) -> &PointerTracker {
        &self.tracker
    }

    /// Instantiation collaborator.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Operator deployed under `name`.
    #[must_use]
    pub fn deployed(&self, name: &str) -> Option<&DeployedOperator> {
        self.deployed.get(name)
    }

    /// Name of the operator standing on `cell`.
    #[must_use]
    pub fn operator_at(&self, cell: CellCoord) -> Option<&str> {
        self.deployed
            .iter()
            .find(|(_, operator)| operator.cell == cell)
            .map(|(name, _)| name.as_str())
    }

    fn reject(&self, rejection: SessionError) -> SessionError {
        warn!(%rejection, "request rejected");
        rejection
    }

    fn sync_status(&mut self, out: &mut Vec<Event>) -> GameStatus {
        let status = self.economy.status();
        if status != self.last_status {
            debug!(from = ?self.last_status, to = ?status, "status changed");
            self.last_status = status;
            out.push(Event::StatusChanged { status });
        }
        status
    }
}
