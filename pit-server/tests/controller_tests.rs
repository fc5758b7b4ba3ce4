//! Integration tests for the simulation controller and its autoplay task
//!
//! Runs on a paused clock so every tick lands exactly on the interval.

use pit_core::units::*;
use pit_core::{Projector, ResultsStore, TelemetrySample, TelemetryStore};
use pit_server::controller::SimulationController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{sleep, Instant};

const TICK: Duration = Duration::from_millis(500);

fn sample(car: &str, lap: u32, position: u32) -> TelemetrySample {
    TelemetrySample {
        car_number: car.to_string(),
        driver_short_name: String::new(),
        lap,
        lap_time: Seconds(101.0),
        sector1: Seconds(35.5),
        sector2: Seconds(33.5),
        sector3: Seconds(32.0),
        position,
        gap_to_leader: Seconds(f64::from(position - 1) * 0.8),
        gap_to_ahead: Seconds(if position > 1 { 0.8 } else { 0.0 }),
        speed: Kph(250.0),
        rpm: Rpm(8000.0),
        gear: 6,
        throttle: Percent::new(95.0),
        brake: Percent::new(0.0),
        tire_age: lap,
        fuel: Percent::new(100.0 - f64::from(lap) * 4.3),
        lap_distance: Percent::new(100.0),
    }
}

/// Two cars swapping the lead each lap
fn controller(laps: u32) -> SimulationController {
    let samples = (1..=laps)
        .flat_map(|lap| {
            let (a, b) = if lap % 2 == 1 { (1, 2) } else { (2, 1) };
            [sample("13", lap, a), sample("55", lap, b)]
        })
        .collect();
    let telemetry = Arc::new(TelemetryStore::new(samples).unwrap());
    let results = Arc::new(ResultsStore::default());
    SimulationController::new(Projector::new(telemetry, results), TICK)
}

#[tokio::test(start_paused = true)]
async fn test_controller_starts_paused_on_lap_one() {
    let controller = controller(3);
    assert_eq!(controller.lap().await, 1);
    assert_eq!(controller.max_laps().await, 3);
    assert!(!controller.is_playing().await);

    // Nothing moves without play()
    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.lap().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_two_car_three_lap_scenario() {
    let controller = controller(3);
    let mut rx = controller.subscribe();

    assert_eq!(controller.go_to_lap(2).await, 2);
    let seek = rx.recv().await.unwrap();
    assert_eq!((seek.lap, seek.playing), (2, false));

    let started = Instant::now();
    assert!(controller.play().await);
    let play = rx.recv().await.unwrap();
    assert_eq!((play.lap, play.playing), (2, true));

    let first_tick = rx.recv().await.unwrap();
    assert_eq!((first_tick.lap, first_tick.playing), (3, true));
    assert!(started.elapsed() >= TICK, "Tick fired early");
    assert_eq!(first_tick.race.lap, 3);
    assert_eq!(first_tick.race.len(), 2);

    let second_tick = rx.recv().await.unwrap();
    assert_eq!(
        (second_tick.lap, second_tick.playing),
        (3, false),
        "Ticking past the last lap pauses on it"
    );

    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.lap().await, 3);
    assert!(!controller.is_playing().await);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_stops_at_last_lap() {
    let controller = controller(5);
    controller.go_to_lap(4).await;
    controller.play().await;

    sleep(TICK * 2 + Duration::from_millis(100)).await;
    assert_eq!(controller.lap().await, 5);
    assert!(!controller.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_playing_pauses_without_stale_ticks() {
    let controller = controller(5);
    let mut rx = controller.subscribe();

    controller.play().await;
    assert!(rx.recv().await.unwrap().playing);
    assert_eq!(rx.recv().await.unwrap().lap, 2);

    assert_eq!(controller.go_to_lap(4).await, 4);
    assert!(!controller.is_playing().await);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.lap().await, 4, "No tick may land after a seek");

    let seek = rx.recv().await.unwrap();
    assert_eq!((seek.lap, seek.playing), (4, false));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // Playback resumes from the seek target
    controller.play().await;
    sleep(TICK + Duration::from_millis(100)).await;
    assert_eq!(controller.lap().await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_play_while_playing_starts_one_timer() {
    let controller = controller(5);

    assert!(controller.play().await);
    assert!(!controller.play().await, "Second play() is a no-op");

    sleep(TICK + TICK / 2).await;
    assert_eq!(controller.lap().await, 2, "Exactly one tick per interval");

    sleep(TICK).await;
    assert_eq!(controller.lap().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_ticks() {
    let controller = controller(5);
    controller.play().await;

    sleep(TICK + Duration::from_millis(100)).await;
    assert_eq!(controller.lap().await, 2);

    assert!(controller.pause().await);
    assert!(!controller.pause().await, "Pausing twice is a no-op");

    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.lap().await, 2);
    assert!(!controller.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_playing() {
    let controller = controller(5);
    controller.play().await;

    sleep(TICK * 2 + Duration::from_millis(100)).await;
    assert_eq!(controller.lap().await, 3);

    controller.reset().await;
    assert_eq!(controller.lap().await, 1);
    assert!(!controller.is_playing().await);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.lap().await, 1);
    assert_eq!(controller.race_state().await.lap, 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_on_last_lap_finishes_immediately() {
    let controller = controller(3);
    assert_eq!(controller.go_to_lap(99).await, 3);

    assert!(controller.play().await);
    sleep(TICK + Duration::from_millis(100)).await;
    assert_eq!(controller.lap().await, 3);
    assert!(!controller.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn test_seek_clamps_and_projects() {
    let controller = controller(3);

    assert_eq!(controller.go_to_lap(-5).await, 1);
    assert_eq!(controller.go_to_lap(1000).await, 3);
    assert_eq!(controller.go_to_lap(2).await, 2);

    let race = controller.race_state().await;
    assert_eq!(race.lap, 2);
    assert!(race.iter().all(|car| car.sample.lap == 2));
    assert_eq!(race.leader().unwrap().sample.car_number, "55");
}
