//! Route resolution at the routing-service boundary.
//!
//! The core never performs I/O. A level load yields a [`RouteRequest`]; the
//! host fetches the path however it likes and hands the raw outcome back to
//! the session, which resolves it into a [`Route`] here.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::LevelId;
use crate::constants::{LOG_ROUTE_FALLBACK, MIN_ROUTE_POINTS};
use crate::geo::Coord;

/// Reasons a routing lookup produced no usable path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("routing service answered HTTP {0}")]
    Status(u16),
    #[error("routing request failed: {0}")]
    Transport(String),
    #[error("routing response could not be decoded: {0}")]
    Decode(String),
    #[error("routing service returned no route")]
    NoRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// Path returned by the routing service.
    Fetched,
    /// Straight line `[start, end]`.
    Fallback,
}

/// Ordered path from a level's start to its end. Always holds at least two
/// points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    points: Vec<Coord>,
    source: RouteSource,
}

impl Route {
    #[must_use]
    pub fn straight_line(start: Coord, end: Coord) -> Self {
        Self {
            points: vec![start, end],
            source: RouteSource::Fallback,
        }
    }

    /// Resolve a lookup outcome, degrading to the straight line on any error
    /// or when fewer than two points came back.
    #[must_use]
    pub fn resolve(start: Coord, end: Coord, outcome: Result<Vec<Coord>, RouteError>) -> Self {
        match outcome {
            Ok(points) if points.len() >= MIN_ROUTE_POINTS => Self {
                points,
                source: RouteSource::Fetched,
            },
            Ok(_) => {
                log::warn!("{LOG_ROUTE_FALLBACK}: route had too few points");
                Self::straight_line(start, end)
            }
            Err(err) => {
                log::warn!("{LOG_ROUTE_FALLBACK}: {err}");
                Self::straight_line(start, end)
            }
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    #[must_use]
    pub const fn source(&self) -> RouteSource {
        self.source
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, RouteSource::Fallback)
    }

    #[must_use]
    pub fn start(&self) -> Coord {
        self.points[0]
    }

    #[must_use]
    pub fn end(&self) -> Coord {
        self.points[self.points.len() - 1]
    }
}

/// Ticket for one routing lookup, stamped with the level load that issued
/// it. Results are only applied while the stamp still matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub generation: u64,
    pub level_id: LevelId,
    pub start: Coord,
    pub end: Coord,
}

impl RouteRequest {
    /// Driving-route URL for an OSRM-compatible service rooted at `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            base_url.trim_end_matches('/'),
            self.start.lng,
            self.start.lat,
            self.end.lng,
            self.end.lat
        )
    }
}

/// What happened to a routing result handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteApplied {
    Applied(RouteSource),
    /// The level changed since the request was issued; nothing was touched.
    Stale,
}

#[derive(Debug, Deserialize)]
struct RoutingResponse {
    #[serde(default)]
    routes: Vec<RoutingRoute>,
}

#[derive(Debug, Deserialize)]
struct RoutingRoute {
    geometry: RoutingGeometry,
}

#[derive(Debug, Deserialize)]
struct RoutingGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Extract the first route's coordinates from a routing response body,
/// converting `[lng, lat]` pairs to [`Coord`].
///
/// # Errors
///
/// Returns [`RouteError::Decode`] for malformed JSON and
/// [`RouteError::NoRoute`] when `routes` is empty.
pub fn parse_route_response(body: &str) -> Result<Vec<Coord>, RouteError> {
    let response: RoutingResponse =
        serde_json::from_str(body).map_err(|err| RouteError::Decode(err.to_string()))?;
    let route = response.routes.into_iter().next().ok_or(RouteError::NoRoute)?;
    Ok(route
        .geometry
        .coordinates
        .into_iter()
        .map(Coord::from_lng_lat)
        .collect())
}

/// Interpret an HTTP status and body from the routing service.
///
/// # Errors
///
/// Non-2xx statuses map to [`RouteError::Status`]; otherwise see
/// [`parse_route_response`].
pub fn interpret_response(status: u16, body: &str) -> Result<Vec<Coord>, RouteError> {
    if !(200..300).contains(&status) {
        return Err(RouteError::Status(status));
    }
    parse_route_response(body)
}
