//! Real-time host for a [`TripSession`].
//!
//! The session is shared behind an async mutex so a routing lookup and the
//! trip timer can run side by side, the way a UI host would drive it.
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use ecomobi_game::{
    AnimationHandle, Coord, LevelId, RouteApplied, RouteSource, SelectOutcome, SessionError,
    TransportId, TripSession, Verdict,
};

use crate::routing::RouteProvider;

pub type SharedSession = Arc<Mutex<TripSession>>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0} is already selected for this level")]
    AlreadySelected(TransportId),
    #[error("trip {0:?} was replaced before it finished")]
    Superseded(AnimationHandle),
}

/// Summary of one trip driven to completion.
#[derive(Debug, Clone, Serialize)]
pub struct TripReport {
    pub level_id: LevelId,
    pub transport: TransportId,
    pub verdict: Verdict,
    pub points: i32,
    pub eco_score: i64,
    pub route_source: RouteSource,
    pub route_points: usize,
    pub frames: u32,
    pub final_position: Coord,
    pub arrived: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Resolve the session's outstanding routing request, if any. The lookup
/// runs without holding the session lock.
pub async fn resolve_route(
    session: &SharedSession,
    provider: &dyn RouteProvider,
) -> Option<RouteApplied> {
    let request = *session.lock().await.pending_route()?;
    let outcome = provider.fetch(&request).await;
    let applied = session.lock().await.apply_route(&request, outcome);
    log::debug!("route for level {} via {}: {applied:?}", request.level_id, provider.label());
    Some(applied)
}

/// Select `transport` and run the trip on a real timer until it arrives.
///
/// # Errors
///
/// Fails if the selection is rejected or another selection replaces this
/// trip before it finishes.
pub async fn drive_trip(
    session: &SharedSession,
    transport: TransportId,
) -> Result<TripReport, DriverError> {
    let started = Instant::now();
    let (handle, points, verdict, cadence) = {
        let mut guard = session.lock().await;
        let outcome = guard.select_transport(transport)?;
        let SelectOutcome::Selected {
            handle,
            points,
            verdict,
            ..
        } = outcome
        else {
            return Err(DriverError::AlreadySelected(transport));
        };
        let config = guard.config();
        let cadence = if guard.route().is_fallback() {
            config.frame_interval()
        } else {
            config.route_step_interval()
        };
        (handle, points, verdict, cadence)
    };

    let mut interval = tokio::time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    let mut last = Instant::now();
    let mut frames = 0u32;

    loop {
        interval.tick().await;
        let mut guard = session.lock().await;
        if guard.animation_handle() != Some(handle) {
            return Err(DriverError::Superseded(handle));
        }
        let now = Instant::now();
        let tick = guard.advance(now - last);
        last = now;
        frames += 1;
        if tick.finished {
            let level = guard.level();
            return Ok(TripReport {
                level_id: level.id,
                transport,
                verdict,
                points,
                eco_score: guard.eco_score(),
                route_source: guard.route().source(),
                route_points: guard.route().points().len(),
                frames,
                final_position: tick.position,
                arrived: tick.position == level.end,
                elapsed: started.elapsed(),
            });
        }
    }
}

/// Load `level`, resolve its route, then drive a trip with `transport`.
///
/// # Errors
///
/// See [`drive_trip`]; also fails for unknown levels.
pub async fn run_level(
    session: &SharedSession,
    provider: &dyn RouteProvider,
    level: LevelId,
    transport: TransportId,
) -> Result<TripReport, DriverError> {
    session.lock().await.load_level(level)?;
    resolve_route(session, provider).await;
    drive_trip(session, transport).await
}
