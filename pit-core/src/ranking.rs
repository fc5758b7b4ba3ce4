//! Derived views over a projected race
//!
//! Leaderboard ordering and gap rendering, track-map placement, gauge
//! readings and the fastest-lap chart. Everything here is a stateless
//! function of a `RaceState` (or the results table); nothing is stored.

use crate::model::{CarState, RaceResult, RaceState};
use crate::units::Seconds;
use serde::Serialize;
use std::cmp::Ordering;

// =============================================================================
// Leaderboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub position: u32,
    pub car_number: String,
    pub driver_full_name: String,
    pub team: String,
    /// Leader: own lap time. Everyone else: `+gapToLeader`.
    pub headline: String,
    /// `+gapToAhead` for non-leaders
    pub interval: Option<String>,
    pub lap_time: Seconds,
    pub gap_to_leader: Seconds,
    pub gap_to_ahead: Seconds,
}

impl LeaderboardRow {
    fn from_car(car: &CarState) -> Self {
        let s = &car.sample;
        let (headline, interval) = if car.is_leader() {
            (s.lap_time.as_lap_time(), None)
        } else {
            (s.gap_to_leader.as_gap(), Some(s.gap_to_ahead.as_gap()))
        };

        Self {
            position: s.position,
            car_number: s.car_number.clone(),
            driver_full_name: car.driver_full_name.clone(),
            team: car.team.clone(),
            headline,
            interval,
            lap_time: s.lap_time,
            gap_to_leader: s.gap_to_leader,
            gap_to_ahead: s.gap_to_ahead,
        }
    }
}

/// Cars ordered by the `position` recorded in telemetry (ties by car number)
pub fn ordered_cars(state: &RaceState) -> Vec<&CarState> {
    let mut cars: Vec<&CarState> = state.iter().collect();
    cars.sort_by(|a, b| {
        a.sample
            .position
            .cmp(&b.sample.position)
            .then_with(|| a.car_number().cmp(b.car_number()))
    });
    cars
}

pub fn leaderboard(state: &RaceState) -> Vec<LeaderboardRow> {
    ordered_cars(state)
        .into_iter()
        .map(LeaderboardRow::from_car)
        .collect()
}

/// The car to focus on: the requested one if it is on track this lap,
/// otherwise the leader
pub fn focus_car<'a>(state: &'a RaceState, requested: Option<&str>) -> Option<&'a CarState> {
    requested
        .and_then(|number| state.get(number))
        .or_else(|| state.leader())
        .or_else(|| ordered_cars(state).into_iter().next())
}

// =============================================================================
// Standings from cumulative time
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub car_number: String,
    pub position: u32,
    pub gap_to_leader: Seconds,
    pub gap_to_ahead: Seconds,
}

/// Rank cars by cumulative race time: fastest first, ties broken by car
/// number, gaps measured to the leader and to the car one place ahead
pub fn standings_from_cumulative_time(entries: &[(String, Seconds)]) -> Vec<Standing> {
    let mut sorted: Vec<&(String, Seconds)> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.1 .0
            .partial_cmp(&b.1 .0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let Some(leader_time) = sorted.first().map(|(_, t)| *t) else {
        return Vec::new();
    };

    let mut standings = Vec::with_capacity(sorted.len());
    let mut ahead_time = leader_time;
    for (i, (car_number, time)) in sorted.into_iter().enumerate() {
        standings.push(Standing {
            car_number: car_number.clone(),
            position: i as u32 + 1,
            gap_to_leader: *time - leader_time,
            gap_to_ahead: *time - ahead_time,
        });
        ahead_time = *time;
    }
    standings
}

// =============================================================================
// Track map
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Closed polyline circuit outline in map coordinates
#[derive(Debug, Clone, Serialize)]
pub struct TrackOutline {
    points: Vec<Point>,
    #[serde(skip)]
    cumulative: Vec<f64>,
    length: f64,
}

impl TrackOutline {
    pub fn new(points: Vec<Point>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len() + 1);
        let mut length = 0.0;
        cumulative.push(0.0);
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            length += ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            cumulative.push(length);
        }
        Self {
            points,
            cumulative,
            length,
        }
    }

    /// Simplified Indianapolis road course
    pub fn indianapolis() -> Self {
        let p = |x, y| Point { x, y };
        Self::new(vec![
            p(50.0, 50.0),
            p(350.0, 50.0),
            p(350.0, 150.0),
            p(250.0, 150.0),
            p(250.0, 120.0),
            p(200.0, 120.0),
            p(200.0, 150.0),
            p(100.0, 150.0),
            p(100.0, 200.0),
            p(350.0, 200.0),
            p(350.0, 250.0),
            p(50.0, 250.0),
        ])
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point at `fraction` (wrapped into 0..1) of the way around the lap
    pub fn point_at(&self, fraction: f64) -> Point {
        if self.points.len() < 2 || self.length <= 0.0 {
            return self.points.first().copied().unwrap_or(Point { x: 0.0, y: 0.0 });
        }

        let target = fraction.rem_euclid(1.0) * self.length;
        let seg = self
            .cumulative
            .windows(2)
            .position(|w| target < w[1])
            .unwrap_or(self.points.len() - 1);

        let a = self.points[seg];
        let b = self.points[(seg + 1) % self.points.len()];
        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if seg_len > 0.0 {
            (target - self.cumulative[seg]) / seg_len
        } else {
            0.0
        };
        Point {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPosition {
    pub car_number: String,
    pub position: u32,
    /// Share of the current lap covered, 0..1
    pub lap_fraction: f64,
    /// Share of the whole race covered, 0..1
    pub race_progress: f64,
    pub point: Point,
}

/// Place every car on the outline
///
/// A car `g` seconds behind the leader is drawn `g / leaderLapTime` of a
/// lap behind it. Rows are ordered back-to-front so the leader renders last.
pub fn track_positions(state: &RaceState, max_laps: u32, outline: &TrackOutline) -> Vec<TrackPosition> {
    let reference = state
        .leader()
        .map(|c| c.sample.lap_time.0)
        .filter(|t| *t > 0.0);

    let mut rows: Vec<TrackPosition> = ordered_cars(state)
        .into_iter()
        .map(|car| {
            let s = &car.sample;
            let behind = reference.map(|lap_time| s.gap_to_leader.0 / lap_time).unwrap_or(0.0);
            let covered = s.lap_distance.as_fraction();
            let lap_fraction = (covered - behind).rem_euclid(1.0);
            let race_progress = if max_laps == 0 {
                0.0
            } else {
                ((f64::from(s.lap.saturating_sub(1)) + covered - behind) / f64::from(max_laps))
                    .clamp(0.0, 1.0)
            };
            TrackPosition {
                car_number: s.car_number.clone(),
                position: s.position,
                lap_fraction,
                race_progress,
                point: outline.point_at(lap_fraction),
            }
        })
        .collect();

    rows.reverse();
    rows
}

// =============================================================================
// Gauges
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub label: &'static str,
    pub value: f64,
    pub max: f64,
    pub unit: &'static str,
    /// Fill level for the dial, 0..1
    pub fraction: f64,
}

impl Gauge {
    fn new(label: &'static str, value: f64, max: f64, unit: &'static str) -> Self {
        Self {
            label,
            value,
            max,
            unit,
            fraction: (value / max).clamp(0.0, 1.0),
        }
    }
}

/// Dial readings plus the numeric tiles shown under them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPanel {
    pub car_number: String,
    pub driver_full_name: String,
    pub gauges: Vec<Gauge>,
    pub gear: i8,
    pub tire_age: u32,
    pub fuel: String,
}

pub fn telemetry_panel(car: &CarState) -> TelemetryPanel {
    let s = &car.sample;
    TelemetryPanel {
        car_number: s.car_number.clone(),
        driver_full_name: car.driver_full_name.clone(),
        gauges: vec![
            Gauge::new("Speed", s.speed.0, 300.0, "kph"),
            Gauge::new("RPM", s.rpm.0, 9000.0, ""),
            Gauge::new("Throttle", s.throttle.0, 100.0, "%"),
            Gauge::new("Brake", s.brake.0, 100.0, "%"),
        ],
        gear: s.gear,
        tire_age: s.tire_age,
        fuel: format!("{:.1}", s.fuel.0),
    }
}

// =============================================================================
// Fastest-lap chart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastestLapBar {
    pub number: String,
    pub driver: String,
    pub fastest_lap: Option<Seconds>,
    /// Difference to the race winner's fastest lap
    pub delta_to_winner: Option<Seconds>,
}

/// Fastest laps for the first `limit` classified cars, relative to the winner
pub fn fastest_lap_chart(results: &[RaceResult], limit: usize) -> Vec<FastestLapBar> {
    let top: Vec<&RaceResult> = results.iter().take(limit).collect();
    let reference = top.first().and_then(|r| r.fastest_lap_seconds());

    top.into_iter()
        .map(|r| {
            let fastest_lap = r.fastest_lap_seconds();
            FastestLapBar {
                number: r.number.clone(),
                driver: r.driver_full_name(),
                fastest_lap,
                delta_to_winner: fastest_lap.zip(reference).map(|(lap, best)| lap - best),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identity;
    use crate::test_support::{result, sample};
    use crate::units::{Kph, Percent, Rpm};

    fn state_with(samples: Vec<crate::model::TelemetrySample>) -> RaceState {
        let mut state = RaceState::empty(samples.first().map(|s| s.lap).unwrap_or(1));
        for s in samples {
            state
                .cars
                .insert(s.car_number.clone(), CarState::new(s, Identity::unknown()));
        }
        state
    }

    #[test]
    fn test_leaderboard_sorted_by_position() {
        let state = state_with(vec![sample("88", 5, 3), sample("13", 5, 1), sample("7", 5, 2)]);
        let order: Vec<String> = leaderboard(&state).into_iter().map(|r| r.car_number).collect();
        assert_eq!(order, vec!["13", "7", "88"]);
    }

    #[test]
    fn test_leader_shows_lap_time_others_show_gaps() {
        let mut p2 = sample("7", 5, 2);
        p2.gap_to_leader = Seconds(1.639);
        p2.gap_to_ahead = Seconds(1.639);
        let mut p3 = sample("88", 5, 3);
        p3.gap_to_leader = Seconds(2.017);
        p3.gap_to_ahead = Seconds(0.378);
        let state = state_with(vec![sample("13", 5, 1), p2, p3]);

        let rows = leaderboard(&state);
        assert_eq!(rows[0].headline, "101.500");
        assert_eq!(rows[0].interval, None);
        assert_eq!(rows[1].headline, "+1.64");
        assert_eq!(rows[1].interval.as_deref(), Some("+1.64"));
        assert_eq!(rows[2].headline, "+2.02");
        assert_eq!(rows[2].interval.as_deref(), Some("+0.38"));
        // display rounding does not touch the stored value
        assert_eq!(rows[2].gap_to_leader, Seconds(2.017));
    }

    #[test]
    fn test_focus_car_defaults_to_leader() {
        let state = state_with(vec![sample("2", 1, 2), sample("13", 1, 1)]);
        assert_eq!(focus_car(&state, None).map(|c| c.car_number()), Some("13"));
        assert_eq!(focus_car(&state, Some("2")).map(|c| c.car_number()), Some("2"));
        assert_eq!(focus_car(&state, Some("404")).map(|c| c.car_number()), Some("13"));
        assert!(focus_car(&RaceState::empty(1), None).is_none());
    }

    #[test]
    fn test_standings_from_cumulative_time() {
        let entries = vec![
            ("55".to_string(), Seconds(203.0)),
            ("13".to_string(), Seconds(202.5)),
            ("7".to_string(), Seconds(205.25)),
        ];
        let standings = standings_from_cumulative_time(&entries);
        let order: Vec<&str> = standings.iter().map(|s| s.car_number.as_str()).collect();
        assert_eq!(order, vec!["13", "55", "7"]);
        assert_eq!(standings[0].position, 1);
        assert_eq!(standings[0].gap_to_leader, Seconds::ZERO);
        assert_eq!(standings[0].gap_to_ahead, Seconds::ZERO);
        assert!((standings[2].gap_to_leader.0 - 2.75).abs() < 1e-9);
        assert!((standings[2].gap_to_ahead.0 - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_standings_tie_broken_by_car_number() {
        let entries = vec![("7".to_string(), Seconds(100.0)), ("13".to_string(), Seconds(100.0))];
        let standings = standings_from_cumulative_time(&entries);
        assert_eq!(standings[0].car_number, "13");
        assert_eq!(standings[1].gap_to_ahead, Seconds::ZERO);
        assert!(standings_from_cumulative_time(&[]).is_empty());
    }

    #[test]
    fn test_outline_point_at_wraps_and_interpolates() {
        let square = TrackOutline::new(vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 10.0, y: 0.0 },
            Point { x: 10.0, y: 10.0 },
            Point { x: 0.0, y: 10.0 },
        ]);
        assert_eq!(square.length(), 40.0);
        assert_eq!(square.point_at(0.0), Point { x: 0.0, y: 0.0 });
        assert_eq!(square.point_at(0.125), Point { x: 5.0, y: 0.0 });
        assert_eq!(square.point_at(0.5), Point { x: 10.0, y: 10.0 });
        assert_eq!(square.point_at(0.875), Point { x: 0.0, y: 5.0 });
        assert_eq!(square.point_at(1.125), Point { x: 5.0, y: 0.0 });
    }

    #[test]
    fn test_track_positions_spread_by_gap_and_leader_last() {
        let mut p2 = sample("7", 2, 2);
        p2.gap_to_leader = Seconds(10.15);
        let state = state_with(vec![sample("13", 2, 1), p2]);
        let rows = track_positions(&state, 4, &TrackOutline::indianapolis());

        assert_eq!(rows.last().map(|r| r.car_number.as_str()), Some("13"));
        let leader = &rows[1];
        let chaser = &rows[0];
        assert!(leader.lap_fraction.abs() < 1e-9);
        assert!((chaser.lap_fraction - 0.9).abs() < 1e-9);
        assert!((leader.race_progress - 0.5).abs() < 1e-9);
        assert!(chaser.race_progress < leader.race_progress);
    }

    #[test]
    fn test_telemetry_panel_gauges() {
        let mut s = sample("13", 4, 1);
        s.speed = Kph(330.0);
        s.rpm = Rpm(4500.0);
        s.throttle = Percent::new(50.0);
        let panel = telemetry_panel(&CarState::new(s, Identity::unknown()));

        assert_eq!(panel.gauges.len(), 4);
        assert_eq!(panel.gauges[0].label, "Speed");
        assert_eq!(panel.gauges[0].fraction, 1.0);
        assert!((panel.gauges[1].fraction - 0.5).abs() < 1e-9);
        assert!((panel.gauges[2].fraction - 0.5).abs() < 1e-9);
        assert_eq!(panel.gauges[3].fraction, 0.0);
        assert_eq!(panel.fuel, "82.8");
        assert_eq!(panel.tire_age, 4);
    }

    #[test]
    fn test_fastest_lap_chart_relative_to_winner() {
        let mut slow = result("55", 2, "Spike", "Kohlbecker", "RVA");
        slow.fastest_lap_time = "1:41.000".to_string();
        let mut winner = result("13", 1, "Westin", "Workman", "BSI");
        winner.fastest_lap_time = "1:40.500".to_string();
        let mut broken = result("7", 3, "Jaxon", "Bell", "Copeland");
        broken.fastest_lap_time = "-".to_string();

        let bars = fastest_lap_chart(&[winner, slow, broken], 10);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].delta_to_winner, Some(Seconds::ZERO));
        assert!((bars[1].delta_to_winner.unwrap().0 - 0.5).abs() < 1e-9);
        assert_eq!(bars[2].fastest_lap, None);
        assert_eq!(bars[2].delta_to_winner, None);
        assert_eq!(bars[0].driver, "Westin Workman");
    }
}
