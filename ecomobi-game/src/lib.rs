//! Eco-Mobilite Game Engine
//!
//! Platform-agnostic core game logic for the Eco-Mobilite transport game.
//! This crate provides catalogs, scoring, route resolution, and the trip
//! and expedition state machines without UI, timers, or network access.

pub mod animation;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod expedition;
pub mod geo;
pub mod route;
pub mod scoring;
pub mod session;

// Re-export commonly used types
pub use animation::{Advancement, AnimationHandle, Cursor, Ticker};
pub use catalog::{
    Catalog, CatalogError, Difficulty, Level, LevelId, ParseTransportError, TransportId,
    TransportOption,
};
pub use config::{ConfigError, SessionConfig};
pub use expedition::{
    Challenge, Expedition, ExpeditionCatalog, ExpeditionConfig, ExpeditionError,
    ExpeditionOutcome, ExpeditionState, ExpeditionTick, ExpeditionView, Vehicle, arrival_bonus,
};
pub use geo::Coord;
pub use route::{
    Route, RouteApplied, RouteError, RouteRequest, RouteSource, interpret_response,
    parse_route_response,
};
pub use scoring::{Verdict, travel_minutes, trip_emissions_g};
pub use session::{
    ProfileSummary, SelectOutcome, SessionError, TickOutcome, TripResult, TripSession, TripView,
};

use thiserror::Error;

/// Trait for abstracting catalog and config loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the transport and level catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or fails validation.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load the expedition vehicles and challenges
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or fails validation.
    fn load_expedition_catalog(&self) -> Result<ExpeditionCatalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

#[derive(Debug, Error)]
pub enum EmbeddedLoadError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Expedition(#[from] ExpeditionError),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown config: {0}")]
    UnknownConfig(String),
}

/// Loader backed by the JSON assets compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCatalogLoader;

impl CatalogLoader for EmbeddedCatalogLoader {
    type Error = EmbeddedLoadError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(Catalog::embedded()?)
    }

    fn load_expedition_catalog(&self) -> Result<ExpeditionCatalog, Self::Error> {
        Ok(ExpeditionCatalog::embedded()?)
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let json = match config_name {
            "session" => include_str!("../assets/data/session.json"),
            "expedition" => include_str!("../assets/data/expedition.json"),
            _ => return Err(EmbeddedLoadError::UnknownConfig(config_name.to_string())),
        };
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("data loading failed: {0}")]
    Load(#[source] E),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Expedition(#[from] ExpeditionError),
}

/// Main game engine for creating game instances
pub struct GameEngine<L>
where
    L: CatalogLoader,
{
    data_loader: L,
}

impl<L> GameEngine<L>
where
    L: CatalogLoader,
{
    /// Create a new game engine with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Create a trip session using the loader's catalog and `session` config
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be loaded or the config is invalid.
    pub fn create_session(&self) -> Result<TripSession, EngineError<L::Error>> {
        let catalog = self.data_loader.load_catalog().map_err(EngineError::Load)?;
        let config: SessionConfig = self
            .data_loader
            .load_config("session")
            .map_err(EngineError::Load)?;
        Ok(TripSession::new(catalog, config)?)
    }

    /// Create an expedition seeded with `seed`
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be loaded or the config is invalid.
    pub fn create_expedition(&self, seed: u64) -> Result<Expedition, EngineError<L::Error>> {
        let catalog = self
            .data_loader
            .load_expedition_catalog()
            .map_err(EngineError::Load)?;
        let config: ExpeditionConfig = self
            .data_loader
            .load_config("expedition")
            .map_err(EngineError::Load)?;
        Ok(Expedition::new(catalog, config, seed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl CatalogLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Ok(Catalog::embedded().unwrap())
        }

        fn load_expedition_catalog(&self) -> Result<ExpeditionCatalog, Self::Error> {
            Ok(ExpeditionCatalog::embedded().unwrap())
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            Ok(serde_json::from_str(r#"{ "starting_score": 250 }"#).unwrap())
        }
    }

    #[test]
    fn engine_applies_loaded_config() {
        let engine = GameEngine::new(FixtureLoader);
        let session = engine.create_session().unwrap();
        assert_eq!(session.eco_score(), 250);
        assert_eq!(session.level().id, LevelId(1));

        let expedition = engine.create_expedition(9).unwrap();
        assert_eq!(expedition.seed(), 9);
        assert_eq!(expedition.state().money, 100);
    }

    struct BadExpeditionLoader;

    impl CatalogLoader for BadExpeditionLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Ok(Catalog::embedded().unwrap())
        }

        fn load_expedition_catalog(&self) -> Result<ExpeditionCatalog, Self::Error> {
            Ok(ExpeditionCatalog::embedded().unwrap())
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            Ok(serde_json::from_str(
                r#"{ "total_distance": -50.0, "challenge_chance": 7.5, "challenge_duration_ticks": 0 }"#,
            )
            .unwrap())
        }
    }

    #[test]
    fn engine_rejects_invalid_expedition_config() {
        let engine = GameEngine::new(BadExpeditionLoader);
        assert!(matches!(
            engine.create_expedition(1),
            Err(EngineError::Expedition(ExpeditionError::TotalDistance(_)))
        ));
    }

    #[test]
    fn embedded_loader_matches_defaults() {
        let loader = EmbeddedCatalogLoader;
        let session: SessionConfig = loader.load_config("session").unwrap();
        assert_eq!(session, SessionConfig::default());
        let expedition: ExpeditionConfig = loader.load_config("expedition").unwrap();
        assert_eq!(expedition, ExpeditionConfig::default());
        assert!(matches!(
            loader.load_config::<SessionConfig>("weather"),
            Err(EmbeddedLoadError::UnknownConfig(_))
        ));
    }
}
