#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that walks active enemies along their routes.
//!
//! Each tick an enemy either counts down a pause step, steps toward the
//! centre of its next waypoint, or, once the route is exhausted, leaks
//! through the exit and leaves the roster.

use glam::Vec2;
use ridge_defence_core::{CellCoord, EnemyId, Event, Waypoint};
use ridge_defence_world::{ActiveEnemy, EnemyRoster};
use tracing::{debug, trace};

/// Pure system that advances enemies by one tick.
#[derive(Clone, Copy, Debug)]
pub struct MovementEngine {
    speed_multiplier: f32,
}

impl MovementEngine {
    /// Creates an engine applying the map's speed multiplier.
    #[must_use]
    pub const fn new(speed_multiplier: f32) -> Self {
        Self { speed_multiplier }
    }

    /// Multiplier applied to every enemy's speed.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Advances every active enemy by `interval` seconds.
    ///
    /// Enemies with an exhausted route are removed from the roster, disposed,
    /// and reported through [`Event::EnemyLeaked`]. Returns how many leaked.
    pub fn handle(
        &self,
        interval: f32,
        elapsed: f32,
        roster: &mut EnemyRoster,
        out: &mut Vec<Event>,
    ) -> usize {
        let mut exhausted: Vec<EnemyId> = Vec::new();
        for enemy in roster.iter_mut() {
            match enemy.next_waypoint() {
                None => exhausted.push(enemy.id()),
                Some(Waypoint::Pause { pause }) => count_down(enemy, pause, interval),
                Some(Waypoint::Move(target)) => self.step(enemy, target, interval, out),
            }
        }

        let mut leaked = 0;
        for id in exhausted {
            let Some(enemy) = roster.remove(id) else {
                continue;
            };
            debug!(enemy = id.get(), name = enemy.name(), at = elapsed, "enemy leaked");
            out.push(Event::EnemyLeaked {
                enemy: id,
                name: enemy.name().to_owned(),
                at: elapsed,
            });
            enemy.dispose();
            leaked += 1;
        }
        leaked
    }

    fn step(&self, enemy: &mut ActiveEnemy, target: CellCoord, interval: f32, out: &mut Vec<Event>) {
        let goal = target.center();
        let delta = goal - enemy.position();
        let speed = enemy.move_speed() * self.speed_multiplier;
        let travel = delta.normalize_or_zero() * speed * interval;

        if delta != Vec2::ZERO {
            enemy.face((-delta.y).atan2(delta.x));
        }
        let position = enemy.position() + travel;
        enemy.move_to(position);

        let remaining = (goal - position).abs();
        let reach = travel.abs();
        if remaining.x <= reach.x && remaining.y <= reach.y {
            let _ = enemy.pop_waypoint();
            trace!(enemy = enemy.id().get(), %target, "waypoint reached");
            out.push(Event::WaypointReached {
                enemy: enemy.id(),
                cell: target,
            });
        }
    }
}

fn count_down(enemy: &mut ActiveEnemy, pause: f32, interval: f32) {
    match enemy.pause_remaining() {
        None => enemy.set_pause_remaining(Some(pause - interval)),
        Some(remaining) => {
            let remaining = remaining - interval;
            if remaining <= 0.0 {
                let _ = enemy.pop_waypoint();
                enemy.set_pause_remaining(None);
            } else {
                enemy.set_pause_remaining(Some(remaining));
            }
        }
    }
}
