//! Score deltas, verdicts, travel time, and trip emissions.
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Level, TransportId, TransportOption};

/// Binary classification of a transport choice for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Poor,
}

impl Verdict {
    #[must_use]
    pub const fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Point delta for `transport`, or `None` if the catalog does not list it.
#[must_use]
pub fn score(catalog: &Catalog, transport: TransportId) -> Option<i32> {
    catalog.transport(transport).map(|option| option.points)
}

/// Judge a transport for `level`.
///
/// A level's recommendation wins when present. Otherwise the two
/// lowest-emission options in the catalog are good choices.
#[must_use]
pub fn verdict(catalog: &Catalog, level: &Level, transport: TransportId) -> Verdict {
    let good = match level.recommended_transport {
        Some(recommended) => recommended == transport,
        None => catalog.eco_friendly().contains(&transport),
    };
    if good { Verdict::Good } else { Verdict::Poor }
}

/// Whole minutes needed to cover `distance_km` at `speed_kmh`, rounded up.
#[must_use]
pub fn travel_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    if distance_km <= 0.0 || speed_kmh <= 0.0 {
        return 0;
    }
    let minutes = (distance_km / speed_kmh * 60.0).ceil();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = minutes.min(f64::from(u32::MAX)) as u32;
    whole
}

/// Grams of CO2 emitted by `option` over `distance_km`.
#[must_use]
pub fn trip_emissions_g(option: &TransportOption, distance_km: f64) -> u32 {
    let grams = (f64::from(option.co2_g_per_km) * distance_km.max(0.0)).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = grams.min(f64::from(u32::MAX)) as u32;
    whole
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LevelId;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    #[test]
    fn score_uses_catalog_points() {
        let catalog = catalog();
        assert_eq!(score(&catalog, TransportId::Bike), Some(100));
        assert_eq!(score(&catalog, TransportId::Bus), Some(50));
        assert_eq!(score(&catalog, TransportId::Train), Some(75));
        assert_eq!(score(&catalog, TransportId::Car), Some(-50));
    }

    #[test]
    fn verdict_without_recommendation_favours_lowest_emissions() {
        let catalog = catalog();
        let level = catalog.level(LevelId(1)).unwrap();
        assert!(level.recommended_transport.is_none());
        assert_eq!(verdict(&catalog, level, TransportId::Bike), Verdict::Good);
        assert_eq!(verdict(&catalog, level, TransportId::Train), Verdict::Good);
        assert_eq!(verdict(&catalog, level, TransportId::Bus), Verdict::Poor);
        assert_eq!(verdict(&catalog, level, TransportId::Car), Verdict::Poor);
    }

    #[test]
    fn verdict_follows_recommendation() {
        let catalog = catalog();
        let level = catalog.level(LevelId(4)).unwrap();
        assert_eq!(level.recommended_transport, Some(TransportId::Bus));
        assert_eq!(verdict(&catalog, level, TransportId::Bus), Verdict::Good);
        assert_eq!(verdict(&catalog, level, TransportId::Bike), Verdict::Poor);
    }

    #[test]
    fn travel_minutes_rounds_up() {
        assert_eq!(travel_minutes(6.1, 15.0), 25);
        assert_eq!(travel_minutes(12.5, 60.0), 13);
        assert_eq!(travel_minutes(30.0, 60.0), 30);
        assert_eq!(travel_minutes(5.0, 0.0), 0);
    }

    #[test]
    fn emissions_scale_with_distance() {
        let catalog = catalog();
        let car = catalog.transport(TransportId::Car).unwrap();
        let bike = catalog.transport(TransportId::Bike).unwrap();
        assert_eq!(trip_emissions_g(car, 6.1), 732);
        assert_eq!(trip_emissions_g(bike, 27.0), 0);
    }
}
