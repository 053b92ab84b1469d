//! Headless checks run against the game core with a virtual clock.
use anyhow::{Context, Result, anyhow, ensure};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use ecomobi_game::{
    Coord, EmbeddedCatalogLoader, ExpeditionOutcome, GameEngine, RouteApplied, RouteError,
    RouteSource, SelectOutcome, TransportId, TripSession, Verdict, arrival_bonus,
    interpret_response, travel_minutes,
};

const MAX_FRAMES: usize = 100_000;
const MAX_EXPEDITION_TICKS: usize = 10_000;

/// A named logic check. `run` receives the iteration seed.
#[derive(Debug, Clone, Copy)]
pub struct LogicScenario {
    pub key: &'static str,
    pub description: &'static str,
    pub run: fn(u64) -> Result<()>,
}

const SCENARIOS: &[LogicScenario] = &[
    LogicScenario {
        key: "smoke",
        description: "Load a level, pick a transport, drive the trip to its end",
        run: smoke,
    },
    LogicScenario {
        key: "score-ledger",
        description: "Random selection sequences keep the eco-score ledger exact",
        run: score_ledger,
    },
    LogicScenario {
        key: "level-cycle",
        description: "Next-level wraps around and keeps progress",
        run: level_cycle,
    },
    LogicScenario {
        key: "route-fallback",
        description: "Routing failures degrade to the straight line",
        run: route_fallback,
    },
    LogicScenario {
        key: "stale-route",
        description: "Routes for a previous level load are ignored",
        run: stale_route,
    },
    LogicScenario {
        key: "verdicts",
        description: "Good/poor verdicts and travel times for every level",
        run: verdicts,
    },
    LogicScenario {
        key: "expedition",
        description: "Seeded expedition runs end and replay identically",
        run: expedition,
    },
];

#[must_use]
pub fn all() -> &'static [LogicScenario] {
    SCENARIOS
}

#[must_use]
pub fn find(key: &str) -> Option<&'static LogicScenario> {
    SCENARIOS.iter().find(|scenario| scenario.key == key)
}

fn new_session() -> Result<TripSession> {
    GameEngine::new(EmbeddedCatalogLoader)
        .create_session()
        .context("embedded session failed to load")
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> Result<T> {
    items
        .choose(rng)
        .copied()
        .ok_or_else(|| anyhow!("nothing to choose from"))
}

fn drive_to_end(session: &mut TripSession) -> Result<usize> {
    let step = session.config().frame_interval();
    for frame in 0..MAX_FRAMES {
        if session.advance(step).finished {
            return Ok(frame + 1);
        }
    }
    Err(anyhow!("trip did not finish within {MAX_FRAMES} frames"))
}

fn smoke(seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = new_session()?;
    let ids: Vec<_> = session.catalog().levels().iter().map(|l| l.id).collect();
    let request = session.load_level(pick(&mut rng, &ids)?)?;
    session.apply_route(&request, Err(RouteError::Transport("offline".to_string())));

    let level = session.level().clone();
    let transport = level
        .recommended_transport
        .or_else(|| session.catalog().eco_friendly().first().copied())
        .ok_or_else(|| anyhow!("no transport to pick"))?;
    let before = session.eco_score();
    let outcome = session.select_transport(transport)?;
    let SelectOutcome::Selected { points, verdict, .. } = outcome else {
        return Err(anyhow!("fresh selection reported unchanged"));
    };
    ensure!(verdict == Verdict::Good, "{transport} should be good on {}", level.name);
    ensure!(session.eco_score() == before + i64::from(points));

    drive_to_end(&mut session)?;
    let view = session.view();
    ensure!(view.position == level.end, "marker stopped at {}", view.position);
    ensure!(view.progress_pct == 100, "progress {}%", view.progress_pct);
    ensure!(view.finished && view.result_visible);
    ensure!(view.profile.completed == 1);
    Ok(())
}

fn score_ledger(seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = new_session()?;
    let options: Vec<(TransportId, i32)> = session
        .catalog()
        .transports()
        .iter()
        .map(|option| (option.id, option.points))
        .collect();
    let mut expected = session.eco_score();
    let mut shown: Option<TransportId> = None;

    for step in 0..20 {
        let (transport, points) = pick(&mut rng, &options)?;
        let outcome = session.select_transport(transport)?;
        if shown == Some(transport) {
            ensure!(
                outcome == SelectOutcome::Unchanged,
                "step {step}: repeat {transport} was not a no-op"
            );
        } else {
            expected += i64::from(points);
            shown = Some(transport);
        }
        ensure!(
            session.eco_score() == expected,
            "step {step}: score {} != {expected}",
            session.eco_score()
        );
        session.advance(Duration::from_millis(rng.gen_range(0..200)));

        if rng.gen_bool(0.2) {
            session.restart();
            shown = None;
            ensure!(session.eco_score() == expected, "restart changed the score");
        }
    }
    Ok(())
}

fn level_cycle(_seed: u64) -> Result<()> {
    let mut session = new_session()?;
    let first = session.level().id;
    let count = session.catalog().levels().len();
    session.select_transport(TransportId::Bike)?;
    let score = session.eco_score();

    for _ in 0..count {
        let request = session.next_level();
        ensure!(request.level_id == session.level().id);
        ensure!(session.selected().is_none() && !session.result_visible());
        ensure!(session.position() == session.level().start);
    }
    ensure!(session.level().id == first, "did not wrap to the first level");
    ensure!(session.eco_score() == score, "level changes touched the score");
    ensure!(session.completed().contains(&first));
    Ok(())
}

fn route_fallback(_seed: u64) -> Result<()> {
    let mut session = new_session()?;
    let failures = [
        interpret_response(500, "Internal Server Error"),
        interpret_response(200, "not json"),
        interpret_response(200, r#"{"routes": []}"#),
        Ok(vec![Coord::new(48.86, 2.33)]),
        Err(RouteError::Transport("timeout".to_string())),
    ];
    for outcome in failures {
        let request = session.next_level();
        let (start, end) = (request.start, request.end);
        let applied = session.apply_route(&request, outcome);
        ensure!(applied == RouteApplied::Applied(RouteSource::Fallback));
        ensure!(session.route().points() == [start, end]);
    }

    let request = session.next_level();
    let body = format!(
        r#"{{"routes":[{{"geometry":{{"coordinates":[[{},{}],[2.3,48.87],[{},{}]]}}}}]}}"#,
        request.start.lng, request.start.lat, request.end.lng, request.end.lat
    );
    let applied = session.apply_route(&request, interpret_response(200, &body));
    ensure!(applied == RouteApplied::Applied(RouteSource::Fetched));
    ensure!(session.route().points().len() == 3);
    ensure!(session.route().points()[1] == Coord::new(48.87, 2.3), "lng/lat not swapped");
    Ok(())
}

fn stale_route(seed: u64) -> Result<()> {
    let mut session = new_session()?;
    let stale = *session
        .pending_route()
        .ok_or_else(|| anyhow!("no initial routing request"))?;
    let loads = 1 + seed % 3;
    for _ in 0..loads {
        session.next_level();
    }
    let before = session.route().clone();
    let applied = session.apply_route(&stale, Ok(vec![stale.start, stale.end]));
    ensure!(applied == RouteApplied::Stale, "stale route was applied");
    ensure!(session.route() == &before);
    ensure!(session.pending_route().is_some(), "current request was cleared");
    Ok(())
}

fn verdicts(_seed: u64) -> Result<()> {
    let mut session = new_session()?;
    let levels = session.catalog().levels().to_vec();
    let eco = session.catalog().eco_friendly();
    for level in &levels {
        session.load_level(level.id)?;
        for transport in TransportId::ALL {
            let expected_good = level
                .recommended_transport
                .map_or_else(|| eco.contains(&transport), |rec| rec == transport);
            ensure!(
                session.verdict(transport).is_good() == expected_good,
                "{transport} on level {} judged {}",
                level.id,
                session.verdict(transport)
            );
            let speed = session
                .config()
                .speed_kmh(transport)
                .ok_or_else(|| anyhow!("no speed for {transport}"))?;
            ensure!(
                session.travel_minutes(transport) == Some(travel_minutes(level.distance_km, speed))
            );
        }
    }
    Ok(())
}

fn expedition(seed: u64) -> Result<()> {
    let engine = GameEngine::new(EmbeddedCatalogLoader);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut run = engine.create_expedition(seed)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let affordable = run.view().affordable;
        run.select_vehicle(pick(&mut rng, &affordable)?)?;
        let mut ticks = 0;
        while !run.is_over() {
            run.tick();
            ticks += 1;
            ensure!(ticks < MAX_EXPEDITION_TICKS, "expedition never ended");
        }
        let state = run.state().clone();
        match state.outcome {
            Some(ExpeditionOutcome::Arrived) => {
                ensure!((state.current_distance - state.total_distance).abs() < f64::EPSILON);
                ensure!(state.score == arrival_bonus(state.carbon_footprint));
            }
            Some(ExpeditionOutcome::OutOfBudget) => {
                ensure!(state.money > 0, "budget went negative");
            }
            None => return Err(anyhow!("expedition stopped without an outcome")),
        }
        runs.push(state);
    }
    ensure!(runs[0] == runs[1], "same seed produced different runs");
    Ok(())
}
