//! Final race classification loader
//!
//! Reads the timing-system export: semicolon separated, one header row,
//! one row per car. Columns are looked up by header name so extra vendor
//! columns (ECM ids, `*Extra` fields) are ignored.

use crate::error::LoadError;
use csv::{ReaderBuilder, StringRecord};
use pit_core::{RaceResult, ResultsStore};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// GR Cup race at Indianapolis, top ten
pub const BUNDLED_RESULTS: &str = include_str!("../data/indianapolis_results.csv");

struct Columns {
    position: usize,
    number: usize,
    status: usize,
    laps: usize,
    total_time: usize,
    gap_first: usize,
    gap_previous: usize,
    fastest_lap_num: usize,
    fastest_lap_time: usize,
    fastest_lap_kph: usize,
    team: usize,
    class: usize,
    group: usize,
    division: usize,
    vehicle: usize,
    tires: usize,
    driver_first_name: usize,
    driver_second_name: usize,
    driver_country: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(LoadError::MissingColumn(name))
        };

        Ok(Self {
            position: find("POSITION")?,
            number: find("NUMBER")?,
            status: find("STATUS")?,
            laps: find("LAPS")?,
            total_time: find("TOTAL_TIME")?,
            gap_first: find("GAP_FIRST")?,
            gap_previous: find("GAP_PREVIOUS")?,
            fastest_lap_num: find("FL_LAPNUM")?,
            fastest_lap_time: find("FL_TIME")?,
            fastest_lap_kph: find("FL_KPH")?,
            team: find("TEAM")?,
            class: find("CLASS")?,
            group: find("GROUP")?,
            division: find("DIVISION")?,
            vehicle: find("VEHICLE")?,
            tires: find("TIRES")?,
            driver_first_name: find("DRIVER_FIRSTNAME")?,
            driver_second_name: find("DRIVER_SECONDNAME")?,
            driver_country: find("DRIVER_COUNTRY")?,
        })
    }
}

fn text(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

fn optional(record: &StringRecord, index: usize) -> Option<String> {
    Some(text(record, index)).filter(|s| !s.is_empty())
}

fn number<T: FromStr>(
    record: &StringRecord,
    index: usize,
    row: usize,
    field: &'static str,
) -> Result<T, LoadError> {
    let value = text(record, index);
    value.parse().map_err(|_| LoadError::BadNumber { row, field, value })
}

/// Parse a results table from any reader
pub fn parse_results<R: Read>(reader: R) -> Result<Vec<RaceResult>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::resolve(rdr.headers()?)?;
    let mut results = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let row = i + 1;
        results.push(RaceResult {
            position: number(&record, columns.position, row, "position")?,
            number: text(&record, columns.number),
            status: text(&record, columns.status),
            laps: number(&record, columns.laps, row, "laps")?,
            total_time: text(&record, columns.total_time),
            gap_first: text(&record, columns.gap_first),
            gap_previous: text(&record, columns.gap_previous),
            fastest_lap_num: number(&record, columns.fastest_lap_num, row, "fastest lap number")?,
            fastest_lap_time: text(&record, columns.fastest_lap_time),
            fastest_lap_kph: number(&record, columns.fastest_lap_kph, row, "fastest lap speed")?,
            team: text(&record, columns.team),
            class: text(&record, columns.class),
            group: optional(&record, columns.group),
            division: text(&record, columns.division),
            vehicle: text(&record, columns.vehicle),
            tires: optional(&record, columns.tires),
            driver_first_name: text(&record, columns.driver_first_name),
            driver_second_name: text(&record, columns.driver_second_name),
            driver_country: text(&record, columns.driver_country),
        });
    }

    Ok(results)
}

pub fn load_results(path: &Path) -> Result<ResultsStore, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let results = parse_results(file)?;
    info!("Loaded {} results from {}", results.len(), path.display());
    Ok(ResultsStore::new(results))
}

pub fn bundled_results() -> Result<ResultsStore, LoadError> {
    let results = parse_results(BUNDLED_RESULTS.as_bytes())?;
    Ok(ResultsStore::new(results))
}
