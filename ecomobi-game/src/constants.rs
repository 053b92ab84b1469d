//! Centralized tuning constants for the Eco-Mobilite game logic.
//!
//! These values define the default math for the trip simulation and the
//! expedition variant. `SessionConfig` and `ExpeditionConfig` fall back to
//! them when a field is absent from a loaded config.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_LEVEL_LOADED: &str = "log.level.loaded";
pub(crate) const LOG_TRANSPORT_SELECTED: &str = "log.transport.selected";
pub(crate) const LOG_TRIP_FINISHED: &str = "log.trip.finished";
pub(crate) const LOG_ROUTE_FALLBACK: &str = "log.route.fallback";
pub(crate) const LOG_ROUTE_STALE: &str = "log.route.stale";
pub(crate) const LOG_EXPEDITION_CHALLENGE: &str = "log.expedition.challenge";
pub(crate) const LOG_EXPEDITION_OVER: &str = "log.expedition.over";

// Session tuning -----------------------------------------------------------
pub(crate) const STARTING_ECO_SCORE: i64 = 1_000;
pub(crate) const FRAME_INTERVAL_MS: u64 = 16;
pub(crate) const INTERPOLATION_STEP: f64 = 0.02;
pub(crate) const ROUTE_STEP_INTERVAL_MS: u64 = 50;
pub(crate) const MIN_ROUTE_POINTS: usize = 2;
pub(crate) const ECO_FRIENDLY_OPTION_COUNT: usize = 2;

// Travel speeds (km/h) -----------------------------------------------------
pub(crate) const SPEED_BIKE_KMH: f64 = 15.0;
pub(crate) const SPEED_BUS_KMH: f64 = 25.0;
pub(crate) const SPEED_TRAIN_KMH: f64 = 60.0;
pub(crate) const SPEED_CAR_KMH: f64 = 45.0;

// Expedition tuning --------------------------------------------------------
pub(crate) const EXPEDITION_TOTAL_DISTANCE: f64 = 1_000.0;
pub(crate) const EXPEDITION_STARTING_MONEY: i32 = 100;
pub(crate) const EXPEDITION_CHALLENGE_INTERVAL_TICKS: u32 = 5;
pub(crate) const EXPEDITION_CHALLENGE_CHANCE: f64 = 0.1;
pub(crate) const EXPEDITION_CHALLENGE_DURATION_TICKS: u32 = 5;
pub(crate) const EXPEDITION_ARRIVAL_CARBON_BASE: i64 = 1_000;
pub(crate) const EXPEDITION_ARRIVAL_DIVISOR: i64 = 10;
