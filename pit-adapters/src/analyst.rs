//! Pit Commander analyst
//!
//! Turns a `CommentaryRequest` into a prompt, sends it to a
//! `CommentaryProvider`, and shapes the answer. Strategy requests expect a
//! JSON recommendation; everything else is markdown text.

use pit_core::commentary::{
    CommentaryError, CommentaryProvider, CommentaryRequest, CommentaryResponse,
    StrategyRecommendation, WhatIfScenario,
};
use pit_core::model::{CarState, RaceResult, RaceState, TelemetrySample};
use pit_core::ranking::leaderboard;
use serde_json::json;
use tracing::debug;

/// Laps included in per-driver lap listings
const LAP_LISTING_LIMIT: usize = 15;
/// Results rows included in the race summary
const HISTORY_LIMIT: usize = 15;

pub const NO_DRIVER_DATA: &str = "No data available for this driver.";

/// Prompt text plus whether a JSON-only answer is required
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub expects_json: bool,
}

impl Prompt {
    fn markdown(text: String) -> Self {
        Self {
            text,
            expects_json: false,
        }
    }

    fn json_only(text: String) -> Self {
        Self {
            text,
            expects_json: true,
        }
    }
}

/// Build the prompt for a request, or `None` when there is nothing to ask
pub fn build_prompt(request: &CommentaryRequest) -> Option<Prompt> {
    match request {
        CommentaryRequest::RaceHistory { results } => Some(Prompt::markdown(history_prompt(results))),
        CommentaryRequest::Strategy { car, total_laps } => {
            Some(Prompt::json_only(strategy_prompt(car, *total_laps)))
        }
        CommentaryRequest::WhatIf(scenario) => Some(Prompt::markdown(what_if_prompt(scenario))),
        CommentaryRequest::DriverAnalysis { car_number, laps } => {
            driver_prompt(car_number, laps).map(Prompt::markdown)
        }
        CommentaryRequest::HeadToHead {
            first,
            second,
            first_laps,
            second_laps,
        } => Some(Prompt::markdown(head_to_head_prompt(
            first,
            second,
            first_laps,
            second_laps,
        ))),
        CommentaryRequest::Question {
            question,
            race,
            total_laps,
        } => Some(Prompt::markdown(question_prompt(question, race, *total_laps))),
    }
}

/// Ask the provider and shape its answer
pub async fn respond(
    provider: &dyn CommentaryProvider,
    request: &CommentaryRequest,
) -> Result<CommentaryResponse, CommentaryError> {
    let Some(prompt) = build_prompt(request) else {
        return Ok(CommentaryResponse::Text {
            body: NO_DRIVER_DATA.to_string(),
        });
    };

    debug!(
        "Sending {} prompt to {} ({} chars)",
        request.kind(),
        provider.name(),
        prompt.text.len()
    );

    if prompt.expects_json {
        let raw = provider.complete_json(&prompt.text).await?;
        let recommendation = StrategyRecommendation::parse(&raw)?;
        Ok(CommentaryResponse::Recommendation(recommendation))
    } else {
        let body = provider.complete_text(&prompt.text).await?;
        if body.trim().is_empty() {
            return Err(CommentaryError::EmptyResponse);
        }
        Ok(CommentaryResponse::Text { body })
    }
}

// =============================================================================
// Prompt builders
// =============================================================================

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn history_prompt(results: &[RaceResult]) -> String {
    let rows: Vec<serde_json::Value> = results
        .iter()
        .take(HISTORY_LIMIT)
        .map(|r| {
            json!({
                "Pos": r.position,
                "Driver": r.driver_full_name(),
                "Team": r.team,
                "Laps": r.laps,
                "Gap": r.gap_first,
                "Fastest Lap": r.fastest_lap_time,
            })
        })
        .collect();

    format!(
        r#"You are "Pit Commander", a race strategist for the Toyota GR Cup.
Summarise the final classification below from the Indianapolis Motor Speedway.

Cover:
1. The fight for the win: how close was it and who was in contention?
2. Standout drives, e.g. a strong fastest lap from lower down the order.
3. The strategic moments the gaps suggest. Keep it brief.

Answer in Markdown and use bold for emphasis.

Results:
{}"#,
        pretty(&serde_json::Value::Array(rows))
    )
}

fn strategy_prompt(car: &CarState, total_laps: u32) -> String {
    let s = &car.sample;
    format!(
        r#"You are "Pit Commander", an AI race strategist. It is lap {lap} of {total_laps}.
Recommend a strategy for car #{car}.

Current state:
- Position: P{position}
- Tire age: {tire_age} laps
- Fuel remaining: {fuel:.1}%
- Gap to leader: {gap_leader:.2}s
- Gap to car ahead: {gap_ahead:.2}s

Race rules of thumb:
- A pit stop costs about 25 seconds.
- Tires degrade sharply after 15-18 laps.
- The usual pit window is laps 9 to 14.
- Fuel under 15% is critical.

Reply with a single JSON object:
- "recommendation": one of "PIT_NOW", "PIT_IN_2_LAPS", "STAY_OUT", "PUSH", "CONSERVE_TIRES"
- "confidence": number from 0 to 100
- "reasoning": one or two short sentences
- "color": "red" for urgent action (PIT_NOW), "yellow" for warnings or upcoming actions, "green" when safe"#,
        lap = s.lap,
        total_laps = total_laps,
        car = s.car_number,
        position = s.position,
        tire_age = s.tire_age,
        fuel = s.fuel.0,
        gap_leader = s.gap_to_leader.0,
        gap_ahead = s.gap_to_ahead.0,
    )
}

fn lap_listing(laps: &[TelemetrySample]) -> serde_json::Value {
    serde_json::Value::Array(
        laps.iter()
            .take(LAP_LISTING_LIMIT)
            .map(|t| json!({ "lap": t.lap, "lapTime": format!("{:.3}", t.lap_time.0), "position": t.position }))
            .collect(),
    )
}

fn sector_listing(laps: &[TelemetrySample]) -> serde_json::Value {
    serde_json::Value::Array(
        laps.iter()
            .take(LAP_LISTING_LIMIT)
            .map(|t| {
                json!({
                    "lap": t.lap,
                    "lapTime": format!("{:.3}", t.lap_time.0),
                    "s1": format!("{:.3}", t.sector1.0),
                    "s2": format!("{:.3}", t.sector2.0),
                    "s3": format!("{:.3}", t.sector3.0),
                    "pos": t.position,
                })
            })
            .collect(),
    )
}

fn what_if_prompt(scenario: &WhatIfScenario) -> String {
    let original = scenario
        .original_finish
        .map(|p| format!("P{}", p))
        .unwrap_or_else(|| "unclassified".to_string());

    format!(
        r#"You are "Pit Commander", an AI race simulation analyst.
Estimate what would have happened at Indianapolis if car #{car} had used a different strategy.

Scenario:
- Car: #{car}
- Original finishing position: {original}
- Decision point: lap {lap}
- Alternate action: {action}

Race dynamics:
- A standard pit stop adds about 25 seconds to the lap.
- Fresh tires are worth about 1.5 seconds per lap for 5 laps, then the advantage fades.
- The race is {total} laps long.
- The driver's actual laps: {laps}

Predict the new finishing position and explain the reasoning lap by lap.
Answer in Markdown: open with a bold "Simulated Outcome" line, then a short "Analysis" section."#,
        car = scenario.car_number,
        original = original,
        lap = scenario.decision_lap,
        action = scenario.action,
        total = scenario.total_laps,
        laps = lap_listing(&scenario.laps),
    )
}

fn best_lap(laps: &[TelemetrySample]) -> Option<&TelemetrySample> {
    laps.iter().min_by(|a, b| {
        a.lap_time
            .0
            .partial_cmp(&b.lap_time.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn driver_prompt(car_number: &str, laps: &[TelemetrySample]) -> Option<String> {
    let best = best_lap(laps)?;

    Some(format!(
        r#"You are "Pit Commander", a driver coach.
Review driver #{car} at Indianapolis from their lap data.

Key data:
- Best lap: lap {best_lap} in {best_time:.3}s
- Lap by lap (first {limit} laps): {laps}

Give a short Markdown analysis covering:
1. **Consistency**: are the lap times steady or erratic?
2. **Sectors**: is one sector consistently strong or weak?
3. **Actionable feedback**: one or two concrete things to work on."#,
        car = car_number,
        best_lap = best.lap,
        best_time = best.lap_time.0,
        limit = LAP_LISTING_LIMIT,
        laps = pretty(&sector_listing(laps)),
    ))
}

fn sector_averages(laps: &[TelemetrySample]) -> Option<(f64, f64, f64)> {
    if laps.is_empty() {
        return None;
    }
    let n = laps.len() as f64;
    let (s1, s2, s3) = laps.iter().fold((0.0, 0.0, 0.0), |acc, t| {
        (acc.0 + t.sector1.0, acc.1 + t.sector2.0, acc.2 + t.sector3.0)
    });
    Some((s1 / n, s2 / n, s3 / n))
}

fn car_summary(car: &CarState, laps: &[TelemetrySample]) -> String {
    let s = &car.sample;
    let sectors = sector_averages(laps)
        .map(|(a, b, c)| format!("{:.3} / {:.3} / {:.3}", a, b, c))
        .unwrap_or_else(|| "n/a".to_string());
    let best = best_lap(laps)
        .map(|b| format!("{:.3}s (lap {})", b.lap_time.0, b.lap))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "- #{} {} ({}): P{}, gap to leader {:.2}s, tire age {} laps, fuel {:.1}%\n  best lap {}, average sectors {}",
        s.car_number,
        car.driver_full_name,
        car.team,
        s.position,
        s.gap_to_leader.0,
        s.tire_age,
        s.fuel.0,
        best,
        sectors,
    )
}

fn head_to_head_prompt(
    first: &CarState,
    second: &CarState,
    first_laps: &[TelemetrySample],
    second_laps: &[TelemetrySample],
) -> String {
    format!(
        r#"You are "Pit Commander", a race analyst. Compare these two cars as of lap {lap}.

{first}
{second}

Lap times, car #{a}: {a_laps}
Lap times, car #{b}: {b_laps}

In Markdown, explain who has the pace advantage and where (which sectors),
how the tire and fuel situation changes the picture, and who is likely to come
out ahead by the finish."#,
        lap = first.sample.lap,
        first = car_summary(first, first_laps),
        second = car_summary(second, second_laps),
        a = first.sample.car_number,
        b = second.sample.car_number,
        a_laps = lap_listing(first_laps),
        b_laps = lap_listing(second_laps),
    )
}

fn question_prompt(question: &str, race: &RaceState, total_laps: u32) -> String {
    let table: Vec<String> = leaderboard(race)
        .into_iter()
        .map(|row| {
            let car = race.get(&row.car_number);
            format!(
                "P{} #{} {} ({}) {} | tire {} laps | fuel {}%",
                row.position,
                row.car_number,
                row.driver_full_name,
                row.team,
                row.headline,
                car.map(|c| c.sample.tire_age).unwrap_or(0),
                car.map(|c| format!("{:.1}", c.sample.fuel.0))
                    .unwrap_or_else(|| "?".to_string()),
            )
        })
        .collect();

    format!(
        r#"You are "Pit Commander", an AI race engineer. It is lap {lap} of {total}.

Current order:
{table}

Question: {question}

Answer concisely in Markdown, using only the data above."#,
        lap = race.lap,
        total = total_laps,
        table = table.join("\n"),
        question = question.trim(),
    )
}
