//! Roster of enemies currently walking the map.

use std::collections::{BTreeMap, VecDeque};

use glam::{Vec2, Vec3};
use ridge_defence_core::{abstract_to_world, EnemyId, Renderable, Waypoint};

/// Enemy that has spawned and not yet left the map.
#[derive(Debug)]
pub struct ActiveEnemy {
    id: EnemyId,
    name: String,
    route: VecDeque<Waypoint>,
    pause: Option<f32>,
    position: Vec2,
    elevation: f32,
    move_speed: f32,
    instance: Box<dyn Renderable>,
}

impl ActiveEnemy {
    /// Identifier assigned at spawn.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Unit type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remaining route, head first.
    #[must_use]
    pub fn route(&self) -> &VecDeque<Waypoint> {
        &self.route
    }

    /// Head of the remaining route.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<Waypoint> {
        self.route.front().copied()
    }

    /// Drops the head of the route.
    pub fn pop_waypoint(&mut self) -> Option<Waypoint> {
        self.route.pop_front()
    }

    /// Remaining pause in seconds while a pause step is in progress.
    #[must_use]
    pub const fn pause_remaining(&self) -> Option<f32> {
        self.pause
    }

    /// Starts, updates, or clears the pause countdown.
    pub fn set_pause_remaining(&mut self, remaining: Option<f32>) {
        self.pause = remaining;
    }

    /// Abstract position measured in cells.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// World-space position of the instance.
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        let horizontal = abstract_to_world(self.position);
        Vec3::new(horizontal.x, self.elevation, horizontal.y)
    }

    /// Speed in cells per second before the map multiplier.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Moves the enemy to an abstract position, keeping its elevation.
    pub fn move_to(&mut self, position: Vec2) {
        self.position = position;
        let world = self.world_position();
        self.instance.set_position(world);
    }

    /// Turns the instance about the vertical axis.
    pub fn face(&mut self, radians: f32) {
        self.instance.set_rotation_y(radians);
    }

    /// Releases the instance.
    pub fn dispose(self) {
        self.instance.dispose();
    }
}

/// Parameters of an enemy entering the map.
#[derive(Debug)]
pub struct Arrival {
    /// Unit type name.
    pub name: String,
    /// Route remaining after the spawn cell.
    pub route: VecDeque<Waypoint>,
    /// Abstract spawn position.
    pub position: Vec2,
    /// World-space height of the instance.
    pub elevation: f32,
    /// Speed in cells per second before the map multiplier.
    pub move_speed: f32,
    /// Instance handle.
    pub instance: Box<dyn Renderable>,
}

/// Active enemies keyed by identifier.
///
/// Identifiers increase monotonically for the lifetime of the roster and are
/// never reused, even across [`EnemyRoster::clear`].
#[derive(Debug)]
pub struct EnemyRoster {
    active: BTreeMap<EnemyId, ActiveEnemy>,
    next_enemy_id: EnemyId,
}

impl Default for EnemyRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl EnemyRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    /// Places a new enemy on the map and assigns its identifier.
    pub fn admit(&mut self, arrival: Arrival) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().wrapping_add(1));

        let mut enemy = ActiveEnemy {
            id,
            name: arrival.name,
            route: arrival.route,
            pause: None,
            position: arrival.position,
            elevation: arrival.elevation,
            move_speed: arrival.move_speed,
            instance: arrival.instance,
        };
        enemy.move_to(arrival.position);
        let _ = self.active.insert(id, enemy);
        id
    }

    /// Looks up an active enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&ActiveEnemy> {
        self.active.get(&id)
    }

    /// Iterates active enemies in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveEnemy> {
        self.active.values()
    }

    /// Iterates active enemies mutably in identifier order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ActiveEnemy> {
        self.active.values_mut()
    }

    /// Removes an enemy without disposing it.
    pub fn remove(&mut self, id: EnemyId) -> Option<ActiveEnemy> {
        self.active.remove(&id)
    }

    /// Number of active enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Reports whether no enemy is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Disposes every active enemy, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let drained = std::mem::take(&mut self.active);
        let count = drained.len();
        for enemy in drained.into_values() {
            enemy.dispose();
        }
        count
    }
}
