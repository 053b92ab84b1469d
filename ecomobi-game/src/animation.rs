//! Cancellable trip advancement driven by a virtual clock.
//!
//! An [`Advancement`] is the single in-flight task moving the displayed
//! position from a level's start to its end. Time only enters through
//! [`Advancement::advance`], so hosts can drive it from a real timer and
//! tests can drive it with plain durations.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::geo::Coord;
use crate::route::Route;

/// Identifies one advancement task. A fresh handle is issued every time a
/// task starts; hosts compare handles to notice that their task was
/// replaced or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationHandle(pub u64);

/// Converts elapsed time into whole ticks of a fixed cadence, carrying the
/// remainder forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    interval: Duration,
    carry: Duration,
}

impl Ticker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            carry: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of whole intervals covered by `elapsed` plus any carried
    /// remainder.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        let total = self.carry.saturating_add(elapsed);
        let interval_nanos = self.interval.as_nanos();
        let ticks = total.as_nanos() / interval_nanos;
        let consumed = ticks * interval_nanos;
        let remainder = total.as_nanos() - consumed;
        self.carry = Duration::from_nanos(u64::try_from(remainder).unwrap_or(u64::MAX));
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// Position of an advancement along its path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Cursor {
    /// Progress fraction along the straight-line fallback.
    Fraction(f64),
    /// Index into a fetched route.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Path {
    Interpolated { start: Coord, end: Coord, step: f64 },
    Stepped { points: Vec<Coord> },
}

/// The in-flight advancement task.
#[derive(Debug, Clone, PartialEq)]
pub struct Advancement {
    handle: AnimationHandle,
    path: Path,
    cursor: Cursor,
    ticker: Ticker,
}

impl Advancement {
    /// Start a task along `route`: a fetched route is walked point by point,
    /// the straight-line fallback is interpolated.
    #[must_use]
    pub fn along(handle: AnimationHandle, route: &Route, cfg: &SessionConfig) -> Self {
        if route.is_fallback() {
            Self {
                handle,
                path: Path::Interpolated {
                    start: route.start(),
                    end: route.end(),
                    step: cfg.interpolation_step,
                },
                cursor: Cursor::Fraction(0.0),
                ticker: Ticker::new(cfg.frame_interval()),
            }
        } else {
            Self {
                handle,
                path: Path::Stepped {
                    points: route.points().to_vec(),
                },
                cursor: Cursor::Index(0),
                ticker: Ticker::new(cfg.route_step_interval()),
            }
        }
    }

    #[must_use]
    pub const fn handle(&self) -> AnimationHandle {
        self.handle
    }

    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn position(&self) -> Coord {
        match (&self.path, self.cursor) {
            (Path::Interpolated { start, end, .. }, Cursor::Fraction(t)) => start.lerp(*end, t),
            (Path::Stepped { points }, Cursor::Index(i)) => points[i.min(points.len() - 1)],
            (Path::Interpolated { start, .. }, Cursor::Index(_)) => *start,
            (Path::Stepped { points }, Cursor::Fraction(_)) => points[0],
        }
    }

    /// Fraction of the path covered, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match (&self.path, self.cursor) {
            (_, Cursor::Fraction(t)) => t.clamp(0.0, 1.0),
            (Path::Stepped { points }, Cursor::Index(i)) => {
                let last = points.len().saturating_sub(1).max(1);
                #[allow(clippy::cast_precision_loss)]
                let ratio = i.min(last) as f64 / last as f64;
                ratio
            }
            (Path::Interpolated { .. }, Cursor::Index(_)) => 0.0,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        match (&self.path, self.cursor) {
            (_, Cursor::Fraction(t)) => t >= 1.0,
            (Path::Stepped { points }, Cursor::Index(i)) => i + 1 >= points.len(),
            (Path::Interpolated { .. }, Cursor::Index(_)) => false,
        }
    }

    /// Move forward by `elapsed`. Returns whether the cursor moved. The
    /// cursor never passes the end of the path.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if self.is_finished() {
            return false;
        }
        let ticks = self.ticker.advance(elapsed);
        if ticks == 0 {
            return false;
        }
        self.cursor = match (&self.path, self.cursor) {
            (Path::Interpolated { step, .. }, Cursor::Fraction(t)) => {
                Cursor::Fraction(step.mul_add(f64::from(ticks), t).min(1.0))
            }
            (Path::Stepped { points }, Cursor::Index(i)) => {
                let last = points.len() - 1;
                let target = usize::try_from(ticks).map_or(last, |n| i.saturating_add(n));
                Cursor::Index(target.min(last))
            }
            (_, cursor) => cursor,
        };
        true
    }
}
