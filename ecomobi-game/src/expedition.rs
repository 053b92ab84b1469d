//! Expedition: the budget and time-loop variant of the game.
//!
//! The player buys a vehicle, the trip advances one tick per second, and
//! random challenges cost time and money. Reaching the destination awards a
//! bonus that shrinks with the carbon footprint; running out of money ends
//! the run early.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::TransportId;
use crate::constants::{
    EXPEDITION_ARRIVAL_CARBON_BASE, EXPEDITION_ARRIVAL_DIVISOR, EXPEDITION_CHALLENGE_CHANCE,
    EXPEDITION_CHALLENGE_DURATION_TICKS, EXPEDITION_CHALLENGE_INTERVAL_TICKS,
    EXPEDITION_STARTING_MONEY, EXPEDITION_TOTAL_DISTANCE, LOG_EXPEDITION_CHALLENGE,
    LOG_EXPEDITION_OVER,
};

pub const VEHICLES_JSON: &str = include_str!("../assets/data/vehicles.json");
pub const CHALLENGES_JSON: &str = include_str!("../assets/data/challenges.json");

/// A purchasable vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: TransportId,
    pub name: String,
    /// CO2 added to the run's footprint on purchase.
    pub carbon_footprint: u32,
    /// Distance covered per tick.
    pub speed: f64,
    pub cost: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeImpact {
    pub time: u32,
    pub cost: i32,
}

/// A random setback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub impact: ChallengeImpact,
}

#[derive(Debug, Clone, Deserialize)]
struct VehicleData {
    vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChallengeData {
    challenges: Vec<Challenge>,
}

#[derive(Debug, Error)]
pub enum ExpeditionError {
    #[error("expedition catalog JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("vehicle catalog is empty")]
    NoVehicles,
    #[error("vehicle '{0}' is listed more than once")]
    DuplicateVehicle(TransportId),
    #[error("unknown vehicle '{0}'")]
    UnknownVehicle(TransportId),
    #[error("vehicle '{vehicle}' costs {cost} but only {money} is left")]
    InsufficientFunds {
        vehicle: TransportId,
        cost: i32,
        money: i32,
    },
    #[error("the expedition is over")]
    Finished,
    #[error("vehicle '{vehicle}' speed must be positive (got {speed:.2})")]
    VehicleSpeed { vehicle: TransportId, speed: f64 },
    #[error("vehicle '{vehicle}' cost must not be negative (got {cost})")]
    VehicleCost { vehicle: TransportId, cost: i32 },
    #[error("total distance must be positive (got {0:.2})")]
    TotalDistance(f64),
    #[error("challenge chance must be in [0, 1] (got {0:.3})")]
    ChallengeChance(f64),
    #[error("{field} must be greater than zero")]
    ZeroTicks { field: &'static str },
}

/// Vehicles and challenges available to an expedition.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpeditionCatalog {
    vehicles: Vec<Vehicle>,
    challenges: Vec<Challenge>,
}

impl ExpeditionCatalog {
    /// # Errors
    ///
    /// Returns an error if there are no vehicles, a vehicle id repeats, or a
    /// vehicle has a non-positive speed or a negative cost.
    pub fn new(vehicles: Vec<Vehicle>, challenges: Vec<Challenge>) -> Result<Self, ExpeditionError> {
        if vehicles.is_empty() {
            return Err(ExpeditionError::NoVehicles);
        }
        for (i, vehicle) in vehicles.iter().enumerate() {
            if vehicles[..i].iter().any(|other| other.id == vehicle.id) {
                return Err(ExpeditionError::DuplicateVehicle(vehicle.id));
            }
            if !(vehicle.speed.is_finite() && vehicle.speed > 0.0) {
                return Err(ExpeditionError::VehicleSpeed {
                    vehicle: vehicle.id,
                    speed: vehicle.speed,
                });
            }
            if vehicle.cost < 0 {
                return Err(ExpeditionError::VehicleCost {
                    vehicle: vehicle.id,
                    cost: vehicle.cost,
                });
            }
        }
        Ok(Self {
            vehicles,
            challenges,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or validation fails.
    pub fn from_json(vehicles_json: &str, challenges_json: &str) -> Result<Self, ExpeditionError> {
        let vehicles: VehicleData = serde_json::from_str(vehicles_json)?;
        let challenges: ChallengeData = serde_json::from_str(challenges_json)?;
        Self::new(vehicles.vehicles, challenges.challenges)
    }

    /// # Errors
    ///
    /// Returns an error if the bundled assets fail validation.
    pub fn embedded() -> Result<Self, ExpeditionError> {
        Self::from_json(VEHICLES_JSON, CHALLENGES_JSON)
    }

    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    #[must_use]
    pub fn vehicle(&self, id: TransportId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|vehicle| vehicle.id == id)
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionConfig {
    #[serde(default = "ExpeditionConfig::default_total_distance")]
    pub total_distance: f64,
    #[serde(default = "ExpeditionConfig::default_starting_money")]
    pub starting_money: i32,
    #[serde(default = "ExpeditionConfig::default_challenge_interval_ticks")]
    pub challenge_interval_ticks: u32,
    #[serde(default = "ExpeditionConfig::default_challenge_chance")]
    pub challenge_chance: f64,
    #[serde(default = "ExpeditionConfig::default_challenge_duration_ticks")]
    pub challenge_duration_ticks: u32,
}

impl ExpeditionConfig {
    const fn default_total_distance() -> f64 {
        EXPEDITION_TOTAL_DISTANCE
    }

    const fn default_starting_money() -> i32 {
        EXPEDITION_STARTING_MONEY
    }

    const fn default_challenge_interval_ticks() -> u32 {
        EXPEDITION_CHALLENGE_INTERVAL_TICKS
    }

    const fn default_challenge_chance() -> f64 {
        EXPEDITION_CHALLENGE_CHANCE
    }

    const fn default_challenge_duration_ticks() -> u32 {
        EXPEDITION_CHALLENGE_DURATION_TICKS
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ExpeditionError> {
        if !(self.total_distance.is_finite() && self.total_distance > 0.0) {
            return Err(ExpeditionError::TotalDistance(self.total_distance));
        }
        if !(0.0..=1.0).contains(&self.challenge_chance) {
            return Err(ExpeditionError::ChallengeChance(self.challenge_chance));
        }
        if self.challenge_interval_ticks == 0 {
            return Err(ExpeditionError::ZeroTicks {
                field: "challenge_interval_ticks",
            });
        }
        if self.challenge_duration_ticks == 0 {
            return Err(ExpeditionError::ZeroTicks {
                field: "challenge_duration_ticks",
            });
        }
        Ok(())
    }
}

impl Default for ExpeditionConfig {
    fn default() -> Self {
        Self {
            total_distance: Self::default_total_distance(),
            starting_money: Self::default_starting_money(),
            challenge_interval_ticks: Self::default_challenge_interval_ticks(),
            challenge_chance: Self::default_challenge_chance(),
            challenge_duration_ticks: Self::default_challenge_duration_ticks(),
        }
    }
}

/// How an expedition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpeditionOutcome {
    Arrived,
    OutOfBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChallenge {
    pub challenge: Challenge,
    pub expires_at_tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionState {
    pub score: i64,
    pub current_distance: f64,
    pub total_distance: f64,
    pub carbon_footprint: u32,
    pub time: u32,
    pub money: i32,
    pub selected_vehicle: Option<TransportId>,
    pub active_challenge: Option<ActiveChallenge>,
    pub outcome: Option<ExpeditionOutcome>,
    pub ticks: u64,
}

impl ExpeditionState {
    fn initial(config: &ExpeditionConfig) -> Self {
        Self {
            score: 0,
            current_distance: 0.0,
            total_distance: config.total_distance,
            carbon_footprint: 0,
            time: 0,
            money: config.starting_money,
            selected_vehicle: None,
            active_challenge: None,
            outcome: None,
            ticks: 0,
        }
    }
}

/// Rendering snapshot of an expedition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionView {
    #[serde(flatten)]
    pub state: ExpeditionState,
    pub progress_pct: u8,
    pub affordable: Vec<TransportId>,
}

/// Events raised by a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionTick {
    pub distance_gained: f64,
    pub challenge_started: Option<String>,
    pub challenge_cleared: bool,
    pub finished: Option<ExpeditionOutcome>,
}

#[derive(Debug, Clone)]
pub struct Expedition {
    catalog: ExpeditionCatalog,
    config: ExpeditionConfig,
    state: ExpeditionState,
    rng: ChaCha20Rng,
    seed: u64,
}

impl Expedition {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        catalog: ExpeditionCatalog,
        config: ExpeditionConfig,
        seed: u64,
    ) -> Result<Self, ExpeditionError> {
        config.validate()?;
        let state = ExpeditionState::initial(&config);
        Ok(Self {
            catalog,
            config,
            state,
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed,
        })
    }

    #[must_use]
    pub const fn state(&self) -> &ExpeditionState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &ExpeditionCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.state.outcome.is_some()
    }

    /// Buy `id` and travel with it from now on. Switching vehicles keeps the
    /// distance already covered.
    ///
    /// # Errors
    ///
    /// Fails when the run is over, the vehicle is unknown, or it costs more
    /// than the remaining budget.
    pub fn select_vehicle(&mut self, id: TransportId) -> Result<(), ExpeditionError> {
        if self.is_over() {
            return Err(ExpeditionError::Finished);
        }
        let vehicle = self
            .catalog
            .vehicle(id)
            .ok_or(ExpeditionError::UnknownVehicle(id))?;
        if self.state.money < vehicle.cost {
            return Err(ExpeditionError::InsufficientFunds {
                vehicle: id,
                cost: vehicle.cost,
                money: self.state.money,
            });
        }
        self.state.money -= vehicle.cost;
        self.state.carbon_footprint = self
            .state
            .carbon_footprint
            .saturating_add(vehicle.carbon_footprint);
        self.state.selected_vehicle = Some(id);
        Ok(())
    }

    /// Advance the run by one second.
    pub fn tick(&mut self) -> ExpeditionTick {
        let mut events = ExpeditionTick::default();
        if self.is_over() {
            return events;
        }
        self.state.ticks += 1;

        let expired = self
            .state
            .active_challenge
            .as_ref()
            .is_some_and(|active| self.state.ticks >= active.expires_at_tick);
        if expired {
            self.state.active_challenge = None;
            events.challenge_cleared = true;
        }

        self.travel(&mut events);
        if self.is_over() {
            return events;
        }

        let interval = u64::from(self.config.challenge_interval_ticks);
        if self.state.ticks % interval == 0 {
            self.roll_challenge(&mut events);
        }
        events
    }

    fn travel(&mut self, events: &mut ExpeditionTick) {
        let Some(speed) = self
            .state
            .selected_vehicle
            .and_then(|id| self.catalog.vehicle(id))
            .map(|vehicle| vehicle.speed)
        else {
            return;
        };

        let next = self.state.current_distance + speed;
        if next >= self.state.total_distance {
            events.distance_gained = self.state.total_distance - self.state.current_distance;
            self.state.current_distance = self.state.total_distance;
            self.state.score += arrival_bonus(self.state.carbon_footprint);
            self.finish(ExpeditionOutcome::Arrived, events);
        } else {
            events.distance_gained = speed;
            self.state.current_distance = next;
            self.state.time += 1;
        }
    }

    fn roll_challenge(&mut self, events: &mut ExpeditionTick) {
        if self.state.active_challenge.is_some() || self.catalog.challenges.is_empty() {
            return;
        }
        if self.rng.r#gen::<f64>() >= self.config.challenge_chance {
            return;
        }
        let pick = self.rng.gen_range(0..self.catalog.challenges.len());
        let challenge = self.catalog.challenges[pick].clone();
        let remaining = self.state.money - challenge.impact.cost;
        if remaining <= 0 {
            self.finish(ExpeditionOutcome::OutOfBudget, events);
            return;
        }
        log::debug!(
            "{LOG_EXPEDITION_CHALLENGE}: {} (-{} money, +{} time)",
            challenge.id,
            challenge.impact.cost,
            challenge.impact.time
        );
        self.state.money = remaining;
        self.state.time += challenge.impact.time;
        events.challenge_started = Some(challenge.id.clone());
        self.state.active_challenge = Some(ActiveChallenge {
            challenge,
            expires_at_tick: self.state.ticks + u64::from(self.config.challenge_duration_ticks),
        });
    }

    fn finish(&mut self, outcome: ExpeditionOutcome, events: &mut ExpeditionTick) {
        log::info!(
            "{LOG_EXPEDITION_OVER}: {outcome:?} after {} ticks, score {}",
            self.state.ticks,
            self.state.score
        );
        self.state.outcome = Some(outcome);
        events.finished = Some(outcome);
    }

    /// Start over with a fresh budget. The random stream carries on.
    pub fn reset(&mut self) {
        self.state = ExpeditionState::initial(&self.config);
    }

    #[must_use]
    pub fn view(&self) -> ExpeditionView {
        let ratio = if self.state.total_distance > 0.0 {
            self.state.current_distance / self.state.total_distance
        } else {
            0.0
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let progress_pct = (ratio * 100.0).floor().clamp(0.0, 100.0) as u8;
        let affordable = if self.is_over() {
            Vec::new()
        } else {
            self.catalog
                .vehicles
                .iter()
                .filter(|vehicle| vehicle.cost <= self.state.money)
                .map(|vehicle| vehicle.id)
                .collect()
        };
        ExpeditionView {
            state: self.state.clone(),
            progress_pct,
            affordable,
        }
    }
}

/// Bonus for reaching the destination: a tenth of what is left of the
/// carbon allowance, rounded down.
#[must_use]
pub fn arrival_bonus(carbon_footprint: u32) -> i64 {
    (EXPEDITION_ARRIVAL_CARBON_BASE - i64::from(carbon_footprint))
        .div_euclid(EXPEDITION_ARRIVAL_DIVISOR)
}
