//! Session tuning: starting score, animation cadence, and per-mode speeds.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::TransportId;
use crate::constants::{
    FRAME_INTERVAL_MS, INTERPOLATION_STEP, ROUTE_STEP_INTERVAL_MS, SPEED_BIKE_KMH, SPEED_BUS_KMH,
    SPEED_CAR_KMH, SPEED_TRAIN_KMH, STARTING_ECO_SCORE,
};

/// Errors raised when session configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error("interpolation step must be in (0, 1] (got {0:.3})")]
    InterpolationStep(f64),
    #[error("speed for '{transport}' must be positive (got {value:.2})")]
    Speed { transport: TransportId, value: f64 },
    #[error("no speed configured for '{0}'")]
    MissingSpeed(TransportId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_starting_score")]
    pub starting_score: i64,
    /// Cadence of the straight-line interpolation fallback.
    #[serde(default = "SessionConfig::default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Fraction added per frame on the straight-line fallback.
    #[serde(default = "SessionConfig::default_interpolation_step")]
    pub interpolation_step: f64,
    /// Cadence of stepping through a fetched route.
    #[serde(default = "SessionConfig::default_route_step_interval_ms")]
    pub route_step_interval_ms: u64,
    #[serde(default = "SessionConfig::default_speeds_kmh")]
    pub speeds_kmh: HashMap<TransportId, f64>,
}

impl SessionConfig {
    const fn default_starting_score() -> i64 {
        STARTING_ECO_SCORE
    }

    const fn default_frame_interval_ms() -> u64 {
        FRAME_INTERVAL_MS
    }

    const fn default_interpolation_step() -> f64 {
        INTERPOLATION_STEP
    }

    const fn default_route_step_interval_ms() -> u64 {
        ROUTE_STEP_INTERVAL_MS
    }

    fn default_speeds_kmh() -> HashMap<TransportId, f64> {
        HashMap::from([
            (TransportId::Bike, SPEED_BIKE_KMH),
            (TransportId::Bus, SPEED_BUS_KMH),
            (TransportId::Train, SPEED_TRAIN_KMH),
            (TransportId::Car, SPEED_CAR_KMH),
        ])
    }

    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    #[must_use]
    pub const fn route_step_interval(&self) -> Duration {
        Duration::from_millis(self.route_step_interval_ms)
    }

    #[must_use]
    pub fn speed_kmh(&self, transport: TransportId) -> Option<f64> {
        self.speeds_kmh.get(&transport).copied()
    }

    /// Check cadence, step, and speed invariants for every transport in
    /// `transports`.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate<I>(&self, transports: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = TransportId>,
    {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "frame_interval_ms",
            });
        }
        if self.route_step_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "route_step_interval_ms",
            });
        }
        if !(self.interpolation_step > 0.0 && self.interpolation_step <= 1.0) {
            return Err(ConfigError::InterpolationStep(self.interpolation_step));
        }
        for transport in transports {
            let value = self
                .speed_kmh(transport)
                .ok_or(ConfigError::MissingSpeed(transport))?;
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Speed { transport, value });
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_score: Self::default_starting_score(),
            frame_interval_ms: Self::default_frame_interval_ms(),
            interpolation_step: Self::default_interpolation_step(),
            route_step_interval_ms: Self::default_route_step_interval_ms(),
            speeds_kmh: Self::default_speeds_kmh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_for_every_transport() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.starting_score, 1_000);
        assert_eq!(cfg.validate(TransportId::ALL), Ok(()));
        assert_eq!(cfg.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: SessionConfig =
            serde_json::from_str(r#"{ "starting_score": 500, "speeds_kmh": { "bike": 20.0 } }"#)
                .unwrap();
        assert_eq!(cfg.starting_score, 500);
        assert_eq!(cfg.route_step_interval_ms, 50);
        assert_eq!(cfg.speed_kmh(TransportId::Bike), Some(20.0));
        assert_eq!(
            cfg.validate(TransportId::ALL),
            Err(ConfigError::MissingSpeed(TransportId::Bus))
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let cfg = SessionConfig {
            frame_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            cfg.validate([TransportId::Bike]),
            Err(ConfigError::ZeroInterval {
                field: "frame_interval_ms"
            })
        );

        let cfg = SessionConfig {
            interpolation_step: 1.5,
            ..SessionConfig::default()
        };
        assert_eq!(cfg.validate([TransportId::Bike]), Err(ConfigError::InterpolationStep(1.5)));

        let mut cfg = SessionConfig::default();
        cfg.speeds_kmh.insert(TransportId::Car, -3.0);
        assert_eq!(
            cfg.validate([TransportId::Car]),
            Err(ConfigError::Speed {
                transport: TransportId::Car,
                value: -3.0
            })
        );
    }
}
