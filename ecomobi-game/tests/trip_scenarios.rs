use std::time::Duration;

use ecomobi_game::{
    Catalog, Coord, EmbeddedCatalogLoader, GameEngine, LevelId, RouteApplied, RouteError,
    RouteSource, SelectOutcome, SessionConfig, TransportId, TripSession, Verdict,
    interpret_response,
};

fn session() -> TripSession {
    GameEngine::new(EmbeddedCatalogLoader)
        .create_session()
        .expect("embedded session")
}

fn drive_until_finished(session: &mut TripSession, step: Duration) -> usize {
    let mut ticks = 0;
    while !session.advance(step).finished {
        ticks += 1;
        assert!(ticks < 100_000, "trip never finished");
    }
    ticks
}

#[test]
fn every_transport_scores_exactly_once_per_selection() {
    let catalog = Catalog::embedded().unwrap();
    for option in catalog.transports() {
        let mut session = session();
        let before = session.eco_score();
        session.select_transport(option.id).unwrap();
        assert_eq!(session.eco_score(), before + i64::from(option.points));
        assert!(session.completed().contains(&session.level().id));

        session.advance(Duration::from_millis(100));
        assert_eq!(
            session.select_transport(option.id).unwrap(),
            SelectOutcome::Unchanged
        );
        assert_eq!(session.eco_score(), before + i64::from(option.points));
    }
}

#[test]
fn car_then_bike_without_restart() {
    let mut session = session();
    assert_eq!(session.eco_score(), 1_000);

    let car = session.select_transport_key("car").unwrap();
    let SelectOutcome::Selected { handle: car_handle, .. } = car else {
        panic!("car should start a trip");
    };
    session.advance(Duration::from_millis(160));

    let bike = session.select_transport_key("bike").unwrap();
    let SelectOutcome::Selected {
        handle: bike_handle,
        cancelled,
        ..
    } = bike
    else {
        panic!("bike should start a trip");
    };

    assert_eq!(cancelled, Some(car_handle));
    assert_eq!(session.animation_handle(), Some(bike_handle));
    assert_eq!(session.eco_score(), 1_050);
}

#[test]
fn http_500_route_degrades_to_straight_line() {
    let mut session = session();
    let request = *session.pending_route().expect("initial route request");
    assert_eq!(request.start, Coord::new(48.8584, 2.2945));
    assert_eq!(request.end, Coord::new(48.8866, 2.3432));

    let applied = session.apply_route(&request, interpret_response(500, "boom"));
    assert_eq!(applied, RouteApplied::Applied(RouteSource::Fallback));
    assert_eq!(session.route().points(), &[request.start, request.end]);
}

#[test]
fn verdicts_without_recommendation() {
    let session = session();
    assert!(session.level().recommended_transport.is_none());
    assert_eq!(session.verdict(TransportId::Bike), Verdict::Good);
    assert_eq!(session.verdict(TransportId::Car), Verdict::Poor);
}

#[test]
fn every_level_trip_terminates_at_its_end() {
    let mut session = session();
    let levels = session.catalog().levels().to_vec();
    for level in &levels {
        session.load_level(level.id).unwrap();
        assert_eq!(session.position(), level.start);
        session.select_transport(TransportId::Train).unwrap();
        drive_until_finished(&mut session, Duration::from_millis(16));
        assert_eq!(session.position(), level.end);

        let settled = session.advance(Duration::from_secs(30));
        assert!(!settled.moved);
        assert_eq!(settled.position, level.end);
    }
    assert_eq!(session.completed().len(), levels.len());
}

#[test]
fn fetched_route_trip_ends_on_last_point() {
    let mut session = session();
    let request = session.load_level(LevelId(3)).unwrap();
    let path: Vec<Coord> = (0..=10)
        .map(|i| request.start.lerp(request.end, f64::from(i) / 10.0))
        .collect();
    let last = *path.last().unwrap();
    session.apply_route(&request, Ok(path));

    session.select_transport(TransportId::Bus).unwrap();
    let ticks = drive_until_finished(&mut session, Duration::from_millis(50));
    assert_eq!(ticks, 9);
    assert_eq!(session.position(), last);
}

#[test]
fn late_route_for_previous_level_is_dropped() {
    let mut session = session();
    let stale = *session.pending_route().unwrap();
    session.next_level();
    let current = session.level().clone();

    let applied = session.apply_route(
        &stale,
        Ok(vec![Coord::new(1.0, 1.0), Coord::new(2.0, 2.0)]),
    );
    assert_eq!(applied, RouteApplied::Stale);
    assert_eq!(session.route().points(), &[current.start, current.end]);

    let fresh = *session.pending_route().unwrap();
    session.apply_route(&fresh, Err(RouteError::Transport("offline".to_string())));
    assert!(session.route().is_fallback());
}

#[test]
fn next_level_cycles_through_catalog() {
    let mut session = session();
    let ids: Vec<LevelId> = session.catalog().levels().iter().map(|l| l.id).collect();
    let mut seen = Vec::new();
    for _ in 0..ids.len() {
        session.next_level();
        seen.push(session.level().id);
    }
    assert_eq!(seen.last(), Some(&ids[0]));
    assert_eq!(&seen[..ids.len() - 1], &ids[1..]);
}

#[test]
fn custom_cadence_changes_frame_count() {
    let config = SessionConfig {
        interpolation_step: 0.25,
        ..SessionConfig::default()
    };
    let mut session = TripSession::new(Catalog::embedded().unwrap(), config).unwrap();
    session.select_transport(TransportId::Bike).unwrap();
    let ticks = drive_until_finished(&mut session, Duration::from_millis(16));
    assert_eq!(ticks, 3);
    assert_eq!(session.position(), session.level().end);
}
