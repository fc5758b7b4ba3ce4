//! Fixtures shared by unit tests across the crate

use crate::model::{RaceResult, TelemetrySample};
use crate::store::{ResultsStore, TelemetryStore};
use crate::units::*;

pub fn sample(car: &str, lap: u32, position: u32) -> TelemetrySample {
    TelemetrySample {
        car_number: car.to_string(),
        driver_short_name: "TST".to_string(),
        lap,
        lap_time: Seconds(101.5),
        sector1: Seconds(35.5),
        sector2: Seconds(33.5),
        sector3: Seconds(32.5),
        position,
        gap_to_leader: Seconds(position.saturating_sub(1) as f64 * 0.5),
        gap_to_ahead: Seconds(if position > 1 { 0.5 } else { 0.0 }),
        speed: Kph(250.0),
        rpm: Rpm(8000.0),
        gear: 6,
        throttle: Percent::new(95.0),
        brake: Percent::new(0.0),
        tire_age: lap,
        fuel: Percent::new(100.0 - lap as f64 * 4.3),
        lap_distance: Percent::new(100.0),
    }
}

pub fn result(number: &str, position: u32, first: &str, second: &str, team: &str) -> RaceResult {
    RaceResult {
        position,
        number: number.to_string(),
        status: "Classified".to_string(),
        laps: 3,
        total_time: "5:04.500".to_string(),
        gap_first: if position == 1 { "-".to_string() } else { "+0.500".to_string() },
        gap_previous: if position == 1 { "-".to_string() } else { "+0.500".to_string() },
        fastest_lap_num: 2,
        fastest_lap_time: format!("1:4{}.000", position),
        fastest_lap_kph: 140.0,
        team: team.to_string(),
        class: "Am".to_string(),
        group: None,
        division: "GR Cup".to_string(),
        vehicle: "Toyota GR86".to_string(),
        tires: None,
        driver_first_name: first.to_string(),
        driver_second_name: second.to_string(),
        driver_country: "USA".to_string(),
    }
}

/// Cars "1" and "2" over laps 1..=3; car "1" leads every lap
pub fn two_car_stores() -> (TelemetryStore, ResultsStore) {
    let mut samples = Vec::new();
    for lap in 1..=3 {
        samples.push(sample("1", lap, 1));
        samples.push(sample("2", lap, 2));
    }
    let telemetry = TelemetryStore::new(samples).expect("fixture telemetry is valid");
    let results = ResultsStore::new(vec![
        result("1", 1, "Westin", "Workman", "BSI Racing"),
        result("2", 2, "Will", "Robusto", "RVA Graphics"),
    ]);
    (telemetry, results)
}
