//! Static transport and level catalogs.
//!
//! Catalogs are loaded once, validated, and never mutated afterwards. Level
//! order is significant: `next_index` walks it cyclically.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::ECO_FRIENDLY_OPTION_COUNT;
use crate::geo::Coord;

pub const TRANSPORTS_JSON: &str = include_str!("../assets/data/transports.json");
pub const LEVELS_JSON: &str = include_str!("../assets/data/levels.json");

/// Selectable modes of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportId {
    Bike,
    Bus,
    Train,
    Car,
}

impl TransportId {
    pub const ALL: [Self; 4] = [Self::Bike, Self::Bus, Self::Train, Self::Car];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Bike => "bike",
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Car => "car",
        }
    }
}

impl std::fmt::Display for TransportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Raised when a string does not name a known transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transport '{0}'")]
pub struct ParseTransportError(pub String);

impl FromStr for TransportId {
    type Err = ParseTransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseTransportError(needle.to_string()))
    }
}

/// A transport entry with its emissions and scoring impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOption {
    pub id: TransportId,
    pub name: String,
    pub co2_g_per_km: u32,
    pub points: i32,
}

/// Unique level identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub u32);

impl std::fmt::Display for LevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// An origin-destination scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start: Coord,
    pub end: Coord,
    pub start_name: String,
    pub end_name: String,
    pub distance_km: f64,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub recommended_transport: Option<TransportId>,
}

#[derive(Debug, Clone, Deserialize)]
struct TransportData {
    transports: Vec<TransportOption>,
}

#[derive(Debug, Clone, Deserialize)]
struct LevelData {
    levels: Vec<Level>,
}

/// Catalog validation failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transport catalog is empty")]
    NoTransports,
    #[error("level catalog is empty")]
    NoLevels,
    #[error("transport '{0}' is listed more than once")]
    DuplicateTransport(TransportId),
    #[error("level id {0} is listed more than once")]
    DuplicateLevel(LevelId),
    #[error("level {level} recommends '{transport}', which is not in the transport catalog")]
    UnknownRecommendation {
        level: LevelId,
        transport: TransportId,
    },
    #[error("level {level} has a non-positive distance ({distance_km} km)")]
    InvalidDistance { level: LevelId, distance_km: f64 },
    #[error("level {level} has an out-of-range coordinate {coord}")]
    InvalidCoordinate { level: LevelId, coord: Coord },
}

/// Validated transport and level tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    transports: Vec<TransportOption>,
    levels: Vec<Level>,
}

impl Catalog {
    /// Build a catalog, validating identifiers and level data.
    ///
    /// # Errors
    ///
    /// Returns an error if either table is empty, an identifier repeats, a
    /// recommendation points outside the transport table, or level geometry
    /// is invalid.
    pub fn new(transports: Vec<TransportOption>, levels: Vec<Level>) -> Result<Self, CatalogError> {
        if transports.is_empty() {
            return Err(CatalogError::NoTransports);
        }
        if levels.is_empty() {
            return Err(CatalogError::NoLevels);
        }

        let mut seen_transports = HashSet::new();
        for option in &transports {
            if !seen_transports.insert(option.id) {
                return Err(CatalogError::DuplicateTransport(option.id));
            }
        }

        let mut seen_levels = HashSet::new();
        for level in &levels {
            if !seen_levels.insert(level.id) {
                return Err(CatalogError::DuplicateLevel(level.id));
            }
            if !(level.distance_km.is_finite() && level.distance_km > 0.0) {
                return Err(CatalogError::InvalidDistance {
                    level: level.id,
                    distance_km: level.distance_km,
                });
            }
            for coord in [level.start, level.end] {
                if !coord.is_valid() {
                    return Err(CatalogError::InvalidCoordinate {
                        level: level.id,
                        coord,
                    });
                }
            }
            if let Some(transport) = level.recommended_transport
                && !seen_transports.contains(&transport)
            {
                return Err(CatalogError::UnknownRecommendation {
                    level: level.id,
                    transport,
                });
            }
        }

        Ok(Self { transports, levels })
    }

    /// Parse and validate catalogs from their JSON documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or validation fails.
    pub fn from_json(transports_json: &str, levels_json: &str) -> Result<Self, CatalogError> {
        let transports: TransportData = serde_json::from_str(transports_json)?;
        let levels: LevelData = serde_json::from_str(levels_json)?;
        Self::new(transports.transports, levels.levels)
    }

    /// Catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled assets fail validation.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(TRANSPORTS_JSON, LEVELS_JSON)
    }

    #[must_use]
    pub fn transports(&self) -> &[TransportOption] {
        &self.transports
    }

    #[must_use]
    pub fn transport(&self, id: TransportId) -> Option<&TransportOption> {
        self.transports.iter().find(|option| option.id == id)
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == id)
    }

    #[must_use]
    pub fn level_index(&self, id: LevelId) -> Option<usize> {
        self.levels.iter().position(|level| level.id == id)
    }

    #[must_use]
    pub fn level_at(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Ordinal after `index`, wrapping from the last level to the first.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.levels.len()
    }

    /// The lowest-emission options, in ascending CO2 order. Ties keep
    /// catalog order.
    #[must_use]
    pub fn eco_friendly(&self) -> Vec<TransportId> {
        let mut ranked: Vec<&TransportOption> = self.transports.iter().collect();
        ranked.sort_by_key(|option| option.co2_g_per_km);
        ranked
            .into_iter()
            .take(ECO_FRIENDLY_OPTION_COUNT)
            .map(|option| option.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(id: u32) -> Level {
        Level {
            id: LevelId(id),
            name: format!("Level {id}"),
            description: String::new(),
            start: Coord::new(48.8584, 2.2945),
            end: Coord::new(48.8866, 2.3432),
            start_name: "A".to_string(),
            end_name: "B".to_string(),
            distance_km: 5.0,
            difficulty: Difficulty::Easy,
            recommended_transport: None,
        }
    }

    fn transports() -> Vec<TransportOption> {
        serde_json::from_str::<TransportData>(TRANSPORTS_JSON)
            .unwrap()
            .transports
    }

    #[test]
    fn embedded_catalog_is_valid() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.transports().len(), 4);
        assert_eq!(catalog.levels().len(), 5);
        assert_eq!(catalog.transport(TransportId::Car).unwrap().points, -50);
    }

    #[test]
    fn duplicate_level_ids_fail_fast() {
        let err = Catalog::new(transports(), vec![level(4), level(4)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateLevel(LevelId(4))));
    }

    #[test]
    fn duplicate_transports_fail_fast() {
        let mut options = transports();
        options.push(options[0].clone());
        let err = Catalog::new(options, vec![level(1)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTransport(TransportId::Bike)));
    }

    #[test]
    fn recommendation_must_exist() {
        let options: Vec<_> = transports()
            .into_iter()
            .filter(|option| option.id != TransportId::Train)
            .collect();
        let mut lvl = level(1);
        lvl.recommended_transport = Some(TransportId::Train);
        let err = Catalog::new(options, vec![lvl]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownRecommendation { .. }));
    }

    #[test]
    fn empty_tables_and_bad_geometry_are_rejected() {
        assert!(matches!(
            Catalog::new(Vec::new(), vec![level(1)]),
            Err(CatalogError::NoTransports)
        ));
        assert!(matches!(
            Catalog::new(transports(), Vec::new()),
            Err(CatalogError::NoLevels)
        ));

        let mut far = level(1);
        far.end = Coord::new(120.0, 0.0);
        assert!(matches!(
            Catalog::new(transports(), vec![far]),
            Err(CatalogError::InvalidCoordinate { .. })
        ));

        let mut flat = level(2);
        flat.distance_km = 0.0;
        assert!(matches!(
            Catalog::new(transports(), vec![flat]),
            Err(CatalogError::InvalidDistance { .. })
        ));
    }

    #[test]
    fn next_index_wraps() {
        let catalog = Catalog::new(transports(), vec![level(1), level(2), level(3)]).unwrap();
        assert_eq!(catalog.next_index(0), 1);
        assert_eq!(catalog.next_index(2), 0);
        assert_eq!(catalog.level_index(LevelId(3)), Some(2));
        assert!(catalog.level(LevelId(9)).is_none());
    }

    #[test]
    fn eco_friendly_pair_is_bike_and_train() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(
            catalog.eco_friendly(),
            vec![TransportId::Bike, TransportId::Train]
        );
    }

    #[test]
    fn transport_ids_parse_case_insensitively() {
        assert_eq!("Bike".parse::<TransportId>(), Ok(TransportId::Bike));
        assert_eq!(" car ".parse::<TransportId>(), Ok(TransportId::Car));
        assert_eq!(
            "rocket".parse::<TransportId>(),
            Err(ParseTransportError("rocket".to_string()))
        );
    }
}
