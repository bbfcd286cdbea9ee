#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduling system that releases enemies onto the map at their
//! authored timeline times.

use std::collections::VecDeque;

use ridge_defence_core::{
    CellCoord, EnemyId, Event, FragmentDefinition, InstanceBundle, ResourceKind, SimulationError,
    UnitCatalog, UnitFactory, UnitKind, WaveDefinition, Waypoint,
};
use ridge_defence_world::{Arrival, EnemyRoster, GridMap};
use tracing::{debug, error, warn};

/// Fragments due within this many seconds of the timeline are released.
const SPAWN_TOLERANCE: f32 = 0.01;

#[derive(Clone, Debug)]
struct PendingWave {
    max_waiting_time: f32,
    fragments: VecDeque<FragmentDefinition>,
}

impl PendingWave {
    fn from_definition(definition: &WaveDefinition) -> Self {
        Self {
            max_waiting_time: definition.max_waiting_time,
            fragments: definition.fragments.iter().cloned().collect(),
        }
    }
}

/// Queue of waves still to be released.
///
/// The scheduler keeps the authored waves as a pristine template and works on
/// a clone, so [`WaveScheduler::reset`] restores every fragment.
#[derive(Debug)]
pub struct WaveScheduler {
    template: Vec<WaveDefinition>,
    waves: VecDeque<PendingWave>,
}

impl WaveScheduler {
    /// Creates a scheduler over the authored waves.
    #[must_use]
    pub fn new(waves: &[WaveDefinition]) -> Self {
        let mut scheduler = Self {
            template: waves.to_vec(),
            waves: VecDeque::new(),
        };
        scheduler.reset();
        scheduler
    }

    /// Reloads every wave from the template.
    pub fn reset(&mut self) {
        self.waves = self
            .template
            .iter()
            .map(PendingWave::from_definition)
            .filter(|wave| !wave.fragments.is_empty())
            .collect();
    }

    /// Number of waves with at least one unreleased fragment.
    #[must_use]
    pub fn pending_waves(&self) -> usize {
        self.waves.len()
    }

    /// Number of unreleased fragments across every wave.
    #[must_use]
    pub fn pending_fragments(&self) -> usize {
        self.waves.iter().map(|wave| wave.fragments.len()).sum()
    }

    /// Timeline time of the next release.
    #[must_use]
    pub fn next_spawn_time(&self) -> Option<f32> {
        self.head().map(|fragment| fragment.time)
    }

    /// Longest wait authored for the wave currently being released.
    #[must_use]
    pub fn current_wave_wait(&self) -> Option<f32> {
        self.waves.front().map(|wave| wave.max_waiting_time)
    }

    /// Releases at most one due fragment.
    ///
    /// A fragment is due when the timeline is within 0.01 s of
    /// its time or past it. Every check runs before the roster changes. A
    /// fragment that fails a check is discarded so it cannot stall the
    /// fragments queued behind it, and the fault is returned.
    pub fn handle<F: UnitFactory>(
        &mut self,
        elapsed: f32,
        map: &GridMap,
        catalog: &UnitCatalog,
        roster: &mut EnemyRoster,
        factory: &mut F,
        out: &mut Vec<Event>,
    ) -> Result<Option<EnemyId>, SimulationError> {
        let prepared = match self.head() {
            Some(fragment) if is_due(fragment, elapsed) => {
                prepare(fragment, map, catalog, factory)
            }
            _ => return Ok(None),
        };
        let Some(fragment) = self.pop_head() else {
            return Ok(None);
        };
        let Prepared {
            spawn,
            elevation,
            move_speed,
            bundle,
        } = prepared.map_err(|fault| {
            warn!(name = %fragment.name, time = fragment.time, "discarded fragment");
            fault
        })?;

        let (instance, _) = bundle.into_parts();
        let mut route: VecDeque<Waypoint> = fragment.path.into();
        let _ = route.pop_front();

        let id = roster.admit(Arrival {
            name: fragment.name.clone(),
            route,
            position: spawn.center(),
            elevation,
            move_speed,
            instance,
        });
        debug!(enemy = id.get(), name = %fragment.name, %spawn, at = elapsed, "spawned enemy");
        out.push(Event::EnemySpawned {
            enemy: id,
            name: fragment.name,
            cell: spawn,
            at: elapsed,
        });
        Ok(Some(id))
    }

    fn head(&self) -> Option<&FragmentDefinition> {
        self.waves.front().and_then(|wave| wave.fragments.front())
    }

    fn pop_head(&mut self) -> Option<FragmentDefinition> {
        let wave = self.waves.front_mut()?;
        let fragment = wave.fragments.pop_front();
        if wave.fragments.is_empty() {
            let _ = self.waves.pop_front();
        }
        fragment
    }
}

struct Prepared {
    spawn: CellCoord,
    elevation: f32,
    move_speed: f32,
    bundle: InstanceBundle,
}

fn is_due(fragment: &FragmentDefinition, elapsed: f32) -> bool {
    (elapsed - fragment.time).abs() <= SPAWN_TOLERANCE || elapsed > fragment.time
}

fn prepare<F: UnitFactory>(
    fragment: &FragmentDefinition,
    map: &GridMap,
    catalog: &UnitCatalog,
    factory: &mut F,
) -> Result<Prepared, SimulationError> {
    let Some(data) = catalog.enemy.get(&fragment.name) else {
        error!(name = %fragment.name, "enemy has no unit data");
        return Err(SimulationError::MissingUnitData {
            name: fragment.name.clone(),
        });
    };
    let Some(Waypoint::Move(spawn)) = fragment.path.first().copied() else {
        error!(name = %fragment.name, "route does not start with a move step");
        return Err(SimulationError::MalformedRoute {
            name: fragment.name.clone(),
            reason: "route must start with a move step",
        });
    };
    let Some(cell) = map.cell(spawn) else {
        error!(name = %fragment.name, %spawn, "spawn cell has no terrain");
        return Err(SimulationError::MalformedRoute {
            name: fragment.name.clone(),
            reason: "spawn cell has no terrain",
        });
    };
    let Some(bundle) = factory.unit(UnitKind::Enemy, &fragment.name) else {
        error!(name = %fragment.name, "enemy model unavailable");
        return Err(SimulationError::ResourceUnavailable {
            kind: ResourceKind::Enemy,
            name: fragment.name.clone(),
        });
    };
    Ok(Prepared {
        spawn,
        elevation: cell.size().y + bundle.size().y / 2.0,
        move_speed: data.move_speed,
        bundle,
    })
}
