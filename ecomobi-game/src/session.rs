//! Trip session: the state machine behind the level/eco-score game.
//!
//! A session owns the active level, the chosen transport, the eco-score
//! ledger, the completed-level set, the current route, and at most one
//! in-flight [`Advancement`]. Hosts render [`TripSession::view`] and feed
//! time in through [`TripSession::advance`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::animation::{Advancement, AnimationHandle, Cursor};
use crate::catalog::{Catalog, Level, LevelId, TransportId};
use crate::config::{ConfigError, SessionConfig};
use crate::constants::{
    LOG_LEVEL_LOADED, LOG_ROUTE_STALE, LOG_TRANSPORT_SELECTED, LOG_TRIP_FINISHED,
};
use crate::geo::Coord;
use crate::route::{Route, RouteApplied, RouteError, RouteRequest, RouteSource};
use crate::scoring::{self, Verdict};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("unknown transport '{0}'")]
    UnknownTransport(String),
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),
    #[error("invalid session config: {0}")]
    Config(#[from] ConfigError),
}

/// Result of a transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SelectOutcome {
    /// The same transport is already selected with its result showing.
    Unchanged,
    Selected {
        transport: TransportId,
        points: i32,
        verdict: Verdict,
        handle: AnimationHandle,
        /// Handle of the task this selection cancelled, if any.
        cancelled: Option<AnimationHandle>,
    },
}

/// State reported after feeding time into the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub position: Coord,
    pub moved: bool,
    pub finished: bool,
}

/// Details of the current selection for the result panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub transport: TransportId,
    pub transport_name: String,
    pub verdict: Verdict,
    pub points: i32,
    pub travel_minutes: u32,
    pub emissions_g: u32,
}

/// What the profile screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub completed: usize,
    pub total_levels: usize,
    pub eco_score: i64,
}

/// Rendering surface snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripView {
    pub level: Level,
    pub position: Coord,
    pub selected_transport: Option<TransportId>,
    pub result_visible: bool,
    pub eco_score: i64,
    pub completed_levels: Vec<LevelId>,
    pub progress_pct: u8,
    pub finished: bool,
    pub route_source: RouteSource,
    pub route_pending: bool,
    pub result: Option<TripResult>,
    pub profile: ProfileSummary,
}

#[derive(Debug, Clone)]
pub struct TripSession {
    catalog: Catalog,
    config: SessionConfig,
    level_index: usize,
    generation: u64,
    pending_route: Option<RouteRequest>,
    route: Route,
    selected: Option<TransportId>,
    result_visible: bool,
    position: Coord,
    eco_score: i64,
    completed: BTreeSet<LevelId>,
    animation: Option<Advancement>,
    next_handle: u64,
    finished: bool,
}

impl TripSession {
    /// Build a session on the first catalog level. The first routing request
    /// is available from [`TripSession::pending_route`].
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid for the catalog's transports.
    pub fn new(catalog: Catalog, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate(catalog.transports().iter().map(|option| option.id))?;
        let first = catalog.levels()[0].clone();
        let mut session = Self {
            catalog,
            eco_score: config.starting_score,
            config,
            level_index: 0,
            generation: 0,
            pending_route: None,
            route: Route::straight_line(first.start, first.end),
            selected: None,
            result_visible: false,
            position: first.start,
            completed: BTreeSet::new(),
            animation: None,
            next_handle: 0,
            finished: false,
        };
        session.load_level_at(0);
        Ok(session)
    }

    /// Make `id` the active level.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownLevel`] if the catalog has no such level.
    pub fn load_level(&mut self, id: LevelId) -> Result<RouteRequest, SessionError> {
        let index = self
            .catalog
            .level_index(id)
            .ok_or(SessionError::UnknownLevel(id))?;
        Ok(self.load_level_at(index))
    }

    /// Advance to the next level, wrapping after the last one.
    pub fn next_level(&mut self) -> RouteRequest {
        let index = self.catalog.next_index(self.level_index);
        let request = self.load_level_at(index);
        self.restart();
        request
    }

    fn load_level_at(&mut self, index: usize) -> RouteRequest {
        self.cancel_animation();
        self.level_index = index;
        self.generation += 1;
        let level = self.level();
        let request = RouteRequest {
            generation: self.generation,
            level_id: level.id,
            start: level.start,
            end: level.end,
        };
        log::debug!("{LOG_LEVEL_LOADED}: level {} ({})", level.id, level.name);
        self.route = Route::straight_line(request.start, request.end);
        self.position = request.start;
        self.selected = None;
        self.result_visible = false;
        self.finished = false;
        self.pending_route = Some(request);
        request
    }

    /// Hand back the outcome of a routing lookup. Results for a level load
    /// other than the current one are ignored.
    pub fn apply_route(
        &mut self,
        request: &RouteRequest,
        outcome: Result<Vec<Coord>, RouteError>,
    ) -> RouteApplied {
        let (level_id, start, end) = {
            let level = self.level();
            (level.id, level.start, level.end)
        };
        if request.generation != self.generation || request.level_id != level_id {
            log::debug!(
                "{LOG_ROUTE_STALE}: dropping route for level {} (generation {})",
                request.level_id,
                request.generation
            );
            return RouteApplied::Stale;
        }
        self.route = Route::resolve(start, end, outcome);
        self.pending_route = None;
        RouteApplied::Applied(self.route.source())
    }

    /// Select a transport by catalog key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTransport`] if `key` names no catalog
    /// entry.
    pub fn select_transport_key(&mut self, key: &str) -> Result<SelectOutcome, SessionError> {
        let id: TransportId = key
            .parse()
            .map_err(|_| SessionError::UnknownTransport(key.trim().to_string()))?;
        self.select_transport(id)
    }

    /// Choose a transport for the active level and start the trip.
    ///
    /// Re-selecting the transport whose result is already showing does
    /// nothing. Any other selection cancels the running trip, puts the marker
    /// back on the level start, and awards the transport's points.
    ///
    /// On a fetched route the marker stays on the level start until the first
    /// step, even though the cursor already sits on the route's first point
    /// (the routing service snaps that point to the road). The first step
    /// moves the marker onto the route.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTransport`] if the catalog does not
    /// list `transport`.
    pub fn select_transport(
        &mut self,
        transport: TransportId,
    ) -> Result<SelectOutcome, SessionError> {
        let points = scoring::score(&self.catalog, transport)
            .ok_or_else(|| SessionError::UnknownTransport(transport.to_string()))?;

        if self.result_visible && self.selected == Some(transport) {
            return Ok(SelectOutcome::Unchanged);
        }

        let cancelled = self.animation.take().map(|anim| anim.handle());
        let verdict = self.verdict(transport);
        let (level_id, start) = {
            let level = self.level();
            (level.id, level.start)
        };
        self.position = start;
        self.selected = Some(transport);
        self.result_visible = true;
        self.finished = false;

        self.next_handle += 1;
        let handle = AnimationHandle(self.next_handle);
        self.animation = Some(Advancement::along(handle, &self.route, &self.config));

        self.eco_score += i64::from(points);
        self.completed.insert(level_id);
        log::debug!(
            "{LOG_TRANSPORT_SELECTED}: {transport} on level {level_id} ({points:+}, {verdict})"
        );

        Ok(SelectOutcome::Selected {
            transport,
            points,
            verdict,
            handle,
            cancelled,
        })
    }

    /// Clear the selection and put the marker back at the level start.
    /// Score and completed levels are kept.
    pub fn restart(&mut self) {
        self.cancel_animation();
        self.selected = None;
        self.result_visible = false;
        self.finished = false;
        self.position = self.level().start;
    }

    /// Stop the in-flight trip, if any. Returns whether a task was running.
    pub fn cancel_animation(&mut self) -> bool {
        match self.animation.take() {
            Some(anim) => {
                log::trace!("cancelled animation {:?}", anim.handle());
                true
            }
            None => false,
        }
    }

    /// Feed `elapsed` time into the running trip.
    pub fn advance(&mut self, elapsed: Duration) -> TickOutcome {
        let Some(anim) = self.animation.as_mut() else {
            return TickOutcome {
                position: self.position,
                moved: false,
                finished: self.finished,
            };
        };

        let moved = anim.advance(elapsed);
        if moved {
            self.position = anim.position();
        }
        if anim.is_finished() {
            self.finished = true;
            self.animation = None;
            log::info!(
                "{LOG_TRIP_FINISHED}: level {} reached {}",
                self.level().id,
                self.position
            );
        }
        TickOutcome {
            position: self.position,
            moved,
            finished: self.finished,
        }
    }

    /// Judge `transport` for the active level without changing anything.
    #[must_use]
    pub fn verdict(&self, transport: TransportId) -> Verdict {
        scoring::verdict(&self.catalog, self.level(), transport)
    }

    /// Minutes the active level takes with `transport`.
    #[must_use]
    pub fn travel_minutes(&self, transport: TransportId) -> Option<u32> {
        self.config
            .speed_kmh(transport)
            .map(|speed| scoring::travel_minutes(self.level().distance_km, speed))
    }

    #[must_use]
    pub fn level(&self) -> &Level {
        &self.catalog.levels()[self.level_index]
    }

    #[must_use]
    pub const fn level_index(&self) -> usize {
        self.level_index
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn selected(&self) -> Option<TransportId> {
        self.selected
    }

    #[must_use]
    pub const fn result_visible(&self) -> bool {
        self.result_visible
    }

    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    #[must_use]
    pub const fn eco_score(&self) -> i64 {
        self.eco_score
    }

    #[must_use]
    pub const fn completed(&self) -> &BTreeSet<LevelId> {
        &self.completed
    }

    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub const fn pending_route(&self) -> Option<&RouteRequest> {
        self.pending_route.as_ref()
    }

    #[must_use]
    pub fn animation_handle(&self) -> Option<AnimationHandle> {
        self.animation.as_ref().map(Advancement::handle)
    }

    #[must_use]
    pub fn cursor(&self) -> Option<Cursor> {
        self.animation.as_ref().map(Advancement::cursor)
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        match &self.animation {
            Some(anim) => anim.progress(),
            None if self.finished => 1.0,
            None => 0.0,
        }
    }

    fn trip_result(&self) -> Option<TripResult> {
        let transport = self.selected?;
        let option = self.catalog.transport(transport)?;
        let level = self.level();
        Some(TripResult {
            transport,
            transport_name: option.name.clone(),
            verdict: self.verdict(transport),
            points: option.points,
            travel_minutes: self.travel_minutes(transport).unwrap_or(0),
            emissions_g: scoring::trip_emissions_g(option, level.distance_km),
        })
    }

    #[must_use]
    pub fn view(&self) -> TripView {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let progress_pct = (self.progress() * 100.0).round().clamp(0.0, 100.0) as u8;
        TripView {
            level: self.level().clone(),
            position: self.position,
            selected_transport: self.selected,
            result_visible: self.result_visible,
            eco_score: self.eco_score,
            completed_levels: self.completed.iter().copied().collect(),
            progress_pct,
            finished: self.finished,
            route_source: self.route.source(),
            route_pending: self.pending_route.is_some(),
            result: if self.result_visible {
                self.trip_result()
            } else {
                None
            },
            profile: ProfileSummary {
                completed: self.completed.len(),
                total_levels: self.catalog.levels().len(),
                eco_score: self.eco_score,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TripSession {
        TripSession::new(Catalog::embedded().unwrap(), SessionConfig::default()).unwrap()
    }

    fn run_to_end(session: &mut TripSession) -> TickOutcome {
        let mut outcome = session.advance(Duration::ZERO);
        for _ in 0..10_000 {
            outcome = session.advance(Duration::from_millis(16));
            if outcome.finished {
                break;
            }
        }
        outcome
    }

    #[test]
    fn new_session_starts_on_first_level() {
        let session = session();
        let level = session.level();
        assert_eq!(level.id, LevelId(1));
        assert_eq!(session.position(), level.start);
        assert_eq!(session.eco_score(), 1_000);
        assert!(session.selected().is_none());
        assert!(!session.result_visible());
        assert_eq!(session.pending_route().map(|r| r.level_id), Some(LevelId(1)));
    }

    #[test]
    fn every_level_loads_at_its_start() {
        let mut session = session();
        let levels = session.catalog().levels().to_vec();
        for level in levels {
            session.select_transport(TransportId::Bus).unwrap();
            session.advance(Duration::from_millis(500));
            let request = session.load_level(level.id).unwrap();
            assert_eq!(request.level_id, level.id);
            assert_eq!(session.position(), level.start);
            assert!(session.selected().is_none());
            assert!(!session.result_visible());
            assert!(session.animation_handle().is_none());
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut session = session();
        assert_eq!(
            session.load_level(LevelId(99)),
            Err(SessionError::UnknownLevel(LevelId(99)))
        );
        assert_eq!(
            session.select_transport_key("rocket"),
            Err(SessionError::UnknownTransport("rocket".to_string()))
        );
        assert_eq!(session.eco_score(), 1_000);
        assert!(session.completed().is_empty());
    }

    #[test]
    fn selection_scores_once_and_marks_completion() {
        let mut session = session();
        let outcome = session.select_transport(TransportId::Train).unwrap();
        assert!(matches!(
            outcome,
            SelectOutcome::Selected {
                points: 75,
                verdict: Verdict::Good,
                cancelled: None,
                ..
            }
        ));
        assert_eq!(session.eco_score(), 1_075);
        assert!(session.completed().contains(&LevelId(1)));

        assert_eq!(
            session.select_transport(TransportId::Train).unwrap(),
            SelectOutcome::Unchanged
        );
        assert_eq!(session.eco_score(), 1_075);
        assert_eq!(session.completed().len(), 1);
    }

    #[test]
    fn switching_transport_cancels_previous_trip() {
        let mut session = session();
        let SelectOutcome::Selected { handle: car, .. } =
            session.select_transport(TransportId::Car).unwrap()
        else {
            panic!("car should be selected");
        };
        session.advance(Duration::from_millis(200));
        assert_ne!(session.position(), session.level().start);

        let SelectOutcome::Selected {
            handle: bike,
            cancelled,
            ..
        } = session.select_transport_key("bike").unwrap()
        else {
            panic!("bike should be selected");
        };
        assert_eq!(cancelled, Some(car));
        assert_ne!(bike, car);
        assert_eq!(session.animation_handle(), Some(bike));
        assert_eq!(session.position(), session.level().start);
        assert_eq!(session.eco_score(), 1_050);
    }

    #[test]
    fn trip_finishes_at_route_end_and_then_stays_put() {
        let mut session = session();
        session.select_transport(TransportId::Bike).unwrap();
        let outcome = run_to_end(&mut session);
        assert!(outcome.finished);
        assert_eq!(outcome.position, session.level().end);
        assert!(session.animation_handle().is_none());

        let after = session.advance(Duration::from_secs(5));
        assert!(!after.moved);
        assert_eq!(after.position, session.level().end);
        assert_eq!(session.view().progress_pct, 100);
    }

    #[test]
    fn fetched_route_is_walked_point_by_point() {
        let mut session = session();
        let request = *session.pending_route().unwrap();
        let mid = Coord::new(48.87, 2.31);
        let applied =
            session.apply_route(&request, Ok(vec![request.start, mid, request.end]));
        assert_eq!(applied, RouteApplied::Applied(RouteSource::Fetched));
        assert!(session.pending_route().is_none());

        session.select_transport(TransportId::Bus).unwrap();
        assert_eq!(session.cursor(), Some(Cursor::Index(0)));
        let tick = session.advance(Duration::from_millis(50));
        assert!(tick.moved);
        assert_eq!(tick.position, mid);
        let tick = session.advance(Duration::from_millis(50));
        assert!(tick.finished);
        assert_eq!(tick.position, request.end);
    }

    #[test]
    fn snapped_route_keeps_marker_on_level_start_until_first_step() {
        let mut session = session();
        let request = *session.pending_route().unwrap();
        let snapped = Coord::new(request.start.lat + 0.0004, request.start.lng - 0.0003);
        let mid = Coord::new(48.87, 2.31);
        session.apply_route(&request, Ok(vec![snapped, mid, request.end]));

        session.select_transport(TransportId::Bike).unwrap();
        assert_eq!(session.cursor(), Some(Cursor::Index(0)));
        assert_eq!(session.position(), request.start);
        assert_eq!(session.view().position, request.start);

        let tick = session.advance(session.config().route_step_interval());
        assert!(tick.moved);
        assert_eq!(session.cursor(), Some(Cursor::Index(1)));
        assert_eq!(tick.position, mid);
    }

    #[test]
    fn route_arriving_mid_trip_waits_for_next_selection() {
        let mut session = session();
        let request = *session.pending_route().unwrap();
        let level = session.level().clone();

        session.select_transport(TransportId::Train).unwrap();
        session.advance(Duration::from_millis(160));
        assert!(matches!(session.cursor(), Some(Cursor::Fraction(t)) if t > 0.0));
        let handle = session.animation_handle();

        let mid = Coord::new(48.87, 2.31);
        let applied = session.apply_route(&request, Ok(vec![level.start, mid, level.end]));
        assert_eq!(applied, RouteApplied::Applied(RouteSource::Fetched));
        assert_eq!(session.route().points().len(), 3);
        assert_eq!(session.animation_handle(), handle);
        assert!(matches!(session.cursor(), Some(Cursor::Fraction(_))));

        let outcome = run_to_end(&mut session);
        assert!(outcome.finished);
        assert_eq!(session.position(), level.end);

        session.restart();
        session.select_transport(TransportId::Train).unwrap();
        assert_eq!(session.cursor(), Some(Cursor::Index(0)));
        let tick = session.advance(session.config().route_step_interval());
        assert_eq!(tick.position, mid);
    }

    #[test]
    fn stale_route_is_ignored() {
        let mut session = session();
        let first = *session.pending_route().unwrap();
        let second = session.next_level();
        assert_ne!(first.generation, second.generation);

        let bogus = vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)];
        assert_eq!(session.apply_route(&first, Ok(bogus)), RouteApplied::Stale);
        assert_eq!(session.route().source(), RouteSource::Fallback);
        assert_eq!(session.pending_route(), Some(&second));

        assert_eq!(
            session.apply_route(&second, Err(RouteError::Status(500))),
            RouteApplied::Applied(RouteSource::Fallback)
        );
        assert_eq!(
            session.route().points(),
            &[session.level().start, session.level().end]
        );
    }

    #[test]
    fn restart_keeps_score_and_completion() {
        let mut session = session();
        session.select_transport(TransportId::Car).unwrap();
        session.advance(Duration::from_millis(100));
        session.restart();
        assert!(session.selected().is_none());
        assert!(!session.result_visible());
        assert_eq!(session.position(), session.level().start);
        assert_eq!(session.eco_score(), 950);
        assert!(session.completed().contains(&LevelId(1)));

        session.select_transport(TransportId::Car).unwrap();
        assert_eq!(session.eco_score(), 900);
    }

    #[test]
    fn cancelling_twice_is_harmless() {
        let mut session = session();
        assert!(!session.cancel_animation());
        session.select_transport(TransportId::Bus).unwrap();
        assert!(session.cancel_animation());
        assert!(!session.cancel_animation());
        let tick = session.advance(Duration::from_secs(1));
        assert!(!tick.moved);
        assert_eq!(tick.position, session.level().start);
    }

    #[test]
    fn next_level_wraps_to_first() {
        let mut session = session();
        let count = session.catalog().levels().len();
        for _ in 0..count - 1 {
            session.next_level();
        }
        assert_eq!(session.level_index(), count - 1);
        session.select_transport(TransportId::Train).unwrap();
        let request = session.next_level();
        assert_eq!(request.level_id, LevelId(1));
        assert_eq!(session.level_index(), 0);
        assert!(session.selected().is_none());
        assert!(session.animation_handle().is_none());
    }

    #[test]
    fn view_reports_result_details() {
        let mut session = session();
        assert!(session.view().result.is_none());
        session.select_transport(TransportId::Car).unwrap();
        let view = session.view();
        let result = view.result.expect("result is visible");
        assert_eq!(result.verdict, Verdict::Poor);
        assert_eq!(result.points, -50);
        assert_eq!(result.travel_minutes, 9);
        assert_eq!(result.emissions_g, 732);
        assert_eq!(view.profile.completed, 1);
        assert_eq!(view.profile.total_levels, 5);
        assert_eq!(view.completed_levels, vec![LevelId(1)]);
    }
}
