#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deployment economy: the regenerating cost pool, operator slots, withdrawal
//! refunds and escalation, respawn cooldowns, and the battle's life points.

use std::collections::BTreeMap;

use ridge_defence_core::{
    BlockType, CellOffset, ControlData, Facing, GameStatus, OperatorData, UnitCatalog,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a deployment or withdrawal request is refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DeployRejection {
    /// The operator is not part of the catalogue.
    #[error("unknown operator `{name}`")]
    UnknownOperator {
        /// Requested name.
        name: String,
    },
    /// The operator is already on the field.
    #[error("operator `{name}` is already deployed")]
    AlreadyDeployed {
        /// Operator name.
        name: String,
    },
    /// The operator is not on the field.
    #[error("operator `{name}` is not deployed")]
    NotDeployed {
        /// Operator name.
        name: String,
    },
    /// Every deployment slot is taken.
    #[error("all {limit} deployment slots are taken")]
    LimitReached {
        /// Maximum number of operators on the field.
        limit: usize,
    },
    /// The operator was withdrawn recently.
    #[error("operator `{name}` can redeploy in {remaining:.2}s")]
    CoolingDown {
        /// Operator name.
        name: String,
        /// Seconds until the operator can redeploy.
        remaining: f32,
    },
    /// The pool cannot pay the operator's cost.
    #[error("operator `{name}` costs {required} but only {available} is available")]
    InsufficientCost {
        /// Operator name.
        name: String,
        /// Current cost of the operator.
        required: u32,
        /// Whole cost units in the pool.
        available: u32,
    },
}

/// Result of a successful withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    /// Cost returned to the pool.
    pub refund: u32,
    /// Cost of the operator's next deployment.
    pub next_cost: u32,
    /// Deployment slots available after the withdrawal.
    pub remaining_slots: usize,
}

/// Runtime state of one operator.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorState {
    name: String,
    position_type: BlockType,
    original_cost: u32,
    cost: u32,
    respawn_time: f32,
    cooldown: f32,
    withdraw_count: u32,
    attack_area: Vec<CellOffset>,
    facing: Option<Facing>,
}

impl OperatorState {
    fn from_data(name: &str, data: &OperatorData) -> Self {
        Self {
            name: name.to_owned(),
            position_type: data.position_type,
            original_cost: data.cost,
            cost: data.cost,
            respawn_time: data.respawn_time,
            cooldown: 0.0,
            withdraw_count: 0,
            attack_area: data.attack_area.clone(),
            facing: None,
        }
    }

    fn restore(&mut self) {
        self.cost = self.original_cost;
        self.cooldown = 0.0;
        self.withdraw_count = 0;
        self.facing = None;
    }

    /// Operator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell class the operator may occupy.
    #[must_use]
    pub const fn position_type(&self) -> BlockType {
        self.position_type
    }

    /// Cost of the next deployment.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Cost authored in the catalogue.
    #[must_use]
    pub const fn original_cost(&self) -> u32 {
        self.original_cost
    }

    /// Seconds until the operator can redeploy.
    #[must_use]
    pub const fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Number of withdrawals since the last reset.
    #[must_use]
    pub const fn withdraw_count(&self) -> u32 {
        self.withdraw_count
    }

    /// Orientation while deployed; `None` when benched.
    #[must_use]
    pub const fn facing(&self) -> Option<Facing> {
        self.facing
    }

    /// Reports whether the operator is on the field.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        self.facing.is_some()
    }

    /// Attack area as authored, relative to an operator facing right.
    #[must_use]
    pub fn attack_area(&self) -> &[CellOffset] {
        &self.attack_area
    }

    /// Attack area rotated to `facing`.
    #[must_use]
    pub fn attack_area_facing(&self, facing: Facing) -> Vec<CellOffset> {
        self.attack_area
            .iter()
            .map(|offset| offset.rotated(facing))
            .collect()
    }
}

/// Slack added to the pool before flooring so accumulated frame drift does
/// not cost a whole unit.
const AFFORD_TOLERANCE: f64 = 1e-4;

/// Cost pool, operator roster, and battle counters of one session.
#[derive(Debug)]
pub struct DeploymentEconomy {
    control: ControlData,
    cost: f64,
    life_points: u32,
    remaining_enemies: u32,
    status: GameStatus,
    operators: BTreeMap<String, OperatorState>,
}

impl DeploymentEconomy {
    /// Creates the economy for a map's battle parameters and the operators of
    /// the unit catalogue.
    #[must_use]
    pub fn new(control: &ControlData, catalog: &UnitCatalog) -> Self {
        Self {
            control: control.clone(),
            cost: f64::from(control.initial_cost),
            life_points: control.max_life_points,
            remaining_enemies: control.enemy_count,
            status: GameStatus::Standby,
            operators: catalog
                .operator
                .iter()
                .map(|(name, data)| (name.clone(), OperatorState::from_data(name, data)))
                .collect(),
        }
    }

    /// Cost currently in the pool.
    #[must_use]
    pub fn cost(&self) -> f32 {
        self.cost as f32
    }

    /// Life points left.
    #[must_use]
    pub const fn life_points(&self) -> u32 {
        self.life_points
    }

    /// Enemies not yet accounted for.
    #[must_use]
    pub const fn remaining_enemies(&self) -> u32 {
        self.remaining_enemies
    }

    /// Maximum number of operators on the field.
    #[must_use]
    pub const fn operator_limit(&self) -> usize {
        self.control.operator_limit
    }

    /// Deployment slots still free.
    #[must_use]
    pub fn remaining_slots(&self) -> usize {
        self.control
            .operator_limit
            .saturating_sub(self.active().count())
    }

    /// Runtime state of an operator.
    #[must_use]
    pub fn operator(&self, name: &str) -> Option<&OperatorState> {
        self.operators.get(name)
    }

    /// Operators waiting on the bench, by name.
    pub fn benched(&self) -> impl Iterator<Item = &OperatorState> {
        self.operators.values().filter(|state| !state.is_deployed())
    }

    /// Operators on the field, by name.
    pub fn active(&self) -> impl Iterator<Item = &OperatorState> {
        self.operators.values().filter(|state| state.is_deployed())
    }

    /// Benched operators ordered by current cost, then by name.
    #[must_use]
    pub fn deployable(&self) -> Vec<&OperatorState> {
        let mut benched: Vec<_> = self.benched().collect();
        benched.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.name.cmp(&b.name)));
        benched
    }

    /// Regenerates cost for `interval` seconds while the pool is at or below
    /// its cap.
    pub fn update_cost(&mut self, interval: f32) {
        if self.cost <= f64::from(self.control.max_cost) {
            self.cost += f64::from(self.control.cost_regen) * f64::from(interval);
        }
    }

    /// Counts respawn cooldowns down, stopping at zero.
    pub fn tick_cooldowns(&mut self, interval: f32) {
        for state in self.operators.values_mut() {
            if state.cooldown > 0.0 {
                state.cooldown = (state.cooldown - interval).max(0.0);
            }
        }
    }

    /// Verifies that `name` could be deployed right now without changing any
    /// state.
    pub fn check_deploy(&self, name: &str) -> Result<&OperatorState, DeployRejection> {
        let Some(state) = self.operators.get(name) else {
            return Err(DeployRejection::UnknownOperator {
                name: name.to_owned(),
            });
        };
        if state.is_deployed() {
            return Err(DeployRejection::AlreadyDeployed {
                name: name.to_owned(),
            });
        }
        if self.remaining_slots() == 0 {
            return Err(DeployRejection::LimitReached {
                limit: self.control.operator_limit,
            });
        }
        if state.cooldown > 0.0 {
            return Err(DeployRejection::CoolingDown {
                name: name.to_owned(),
                remaining: state.cooldown,
            });
        }
        let available = self.available_cost();
        if available < state.cost {
            return Err(DeployRejection::InsufficientCost {
                name: name.to_owned(),
                required: state.cost,
                available,
            });
        }
        Ok(state)
    }

    /// Pays for `name` and moves it to the field. Returns the slots left.
    pub fn deploy(&mut self, name: &str, facing: Facing) -> Result<usize, DeployRejection> {
        if let Err(rejection) = self.check_deploy(name) {
            warn!(operator = name, %rejection, "deployment rejected");
            return Err(rejection);
        }
        let Some(state) = self.operators.get_mut(name) else {
            return Err(DeployRejection::UnknownOperator {
                name: name.to_owned(),
            });
        };
        self.cost -= f64::from(state.cost);
        state.facing = Some(facing);

        let remaining = self.remaining_slots();
        debug!(operator = name, cost = self.cost, remaining, "operator deployed");
        Ok(remaining)
    }

    /// Returns `name` to the bench, refunding half its cost and escalating
    /// the next deployment.
    pub fn withdraw(&mut self, name: &str) -> Result<Withdrawal, DeployRejection> {
        let Some(state) = self.operators.get_mut(name) else {
            let rejection = DeployRejection::UnknownOperator {
                name: name.to_owned(),
            };
            warn!(operator = name, %rejection, "withdrawal rejected");
            return Err(rejection);
        };
        if !state.is_deployed() {
            let rejection = DeployRejection::NotDeployed {
                name: name.to_owned(),
            };
            warn!(operator = name, %rejection, "withdrawal rejected");
            return Err(rejection);
        }

        let refund = state.cost / 2;
        state.withdraw_count += 1;
        state.cost = if state.withdraw_count == 1 {
            u32::try_from(u64::from(state.original_cost) * 3 / 2).unwrap_or(u32::MAX)
        } else {
            state.original_cost.saturating_mul(2)
        };
        state.cooldown = state.respawn_time;
        state.facing = None;
        let next_cost = state.cost;
        self.cost += f64::from(refund);

        let remaining_slots = self.remaining_slots();
        debug!(operator = name, refund, next_cost, remaining_slots, "operator withdrawn");
        Ok(Withdrawal {
            refund,
            next_cost,
            remaining_slots,
        })
    }

    /// Accounts for an enemy that reached the exit.
    pub fn record_leak(&mut self) {
        self.life_points = self.life_points.saturating_sub(1);
        self.remaining_enemies = self.remaining_enemies.saturating_sub(1);
    }

    /// Switches between running and standby.
    pub fn set_running(&mut self, running: bool) {
        self.status = if running {
            GameStatus::Running
        } else {
            GameStatus::Standby
        };
    }

    /// Battle status derived from the counters; defeat takes precedence over
    /// victory.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        if self.life_points == 0 {
            GameStatus::Defeat
        } else if self.remaining_enemies == 0 {
            GameStatus::Victory
        } else {
            self.status
        }
    }

    /// Benches every operator and restores every counter.
    pub fn reset(&mut self) {
        for state in self.operators.values_mut() {
            state.restore();
        }
        self.cost = f64::from(self.control.initial_cost);
        self.life_points = self.control.max_life_points;
        self.remaining_enemies = self.control.enemy_count;
        self.status = GameStatus::Standby;
    }

    fn available_cost(&self) -> u32 {
        if self.cost <= 0.0 {
            0
        } else {
            (self.cost + AFFORD_TOLERANCE).floor() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy(cost: u32) -> DeploymentEconomy {
        let control = ControlData {
            max_life_points: 3,
            enemy_count: 2,
            initial_cost: 0.0,
            max_cost: 99.0,
            cost_regen: 1.0,
            speed_multiplier: 1.0,
            operator_limit: 2,
        };
        let mut catalog = UnitCatalog::default();
        let _ = catalog.operator.insert(
            "guard".to_owned(),
            OperatorData {
                position_type: BlockType::MeleeOnly,
                cost,
                respawn_time: 0.0,
                attack_area: vec![CellOffset::new(1, 0)],
            },
        );
        DeploymentEconomy::new(&control, &catalog)
    }

    #[test]
    fn available_cost_floors_the_pool() {
        let mut economy = economy(5);
        economy.cost = 4.99;
        assert_eq!(economy.available_cost(), 4);
        economy.cost = -0.5;
        assert_eq!(economy.available_cost(), 0);
        economy.cost = 19.999_99;
        assert_eq!(economy.available_cost(), 20);
    }

    #[test]
    fn escalation_saturates_for_huge_costs() {
        let mut economy = economy(u32::MAX);
        economy.cost = f64::from(u32::MAX) * 4.0;

        for expected in [u32::MAX, u32::MAX] {
            assert!(economy.deploy("guard", Facing::Right).is_ok());
            let withdrawal = economy.withdraw("guard").expect("withdraws");
            assert_eq!(withdrawal.next_cost, expected);
        }
    }

    #[test]
    fn status_prefers_defeat() {
        let mut economy = economy(5);
        economy.set_running(true);
        assert_eq!(economy.status(), GameStatus::Running);
        economy.remaining_enemies = 0;
        assert_eq!(economy.status(), GameStatus::Victory);
        economy.life_points = 0;
        assert_eq!(economy.status(), GameStatus::Defeat);
    }
}
