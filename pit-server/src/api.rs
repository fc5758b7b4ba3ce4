//! REST API and SSE routes

use crate::state::AppState;
use crate::strategy::StrategyPanel;
use crate::web_ui;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt as FuturesStreamExt};
use pit_adapters::analyst;
use pit_core::commentary::{CommentaryRequest, CommentaryResponse, WhatIfScenario};
use pit_core::model::{CarState, RaceResult, TelemetrySample};
use pit_core::ranking::{
    fastest_lap_chart, focus_car, leaderboard, telemetry_panel, track_positions, FastestLapBar,
    LeaderboardRow, Point, TelemetryPanel, TrackPosition,
};
use pit_core::RaceSnapshot;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

const MSGPACK: &str = "application/msgpack";

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web_ui::serve_ui))
        // Race replay
        .route("/api/race", get(race_info))
        .route("/api/race/state", get(race_state))
        .route("/api/race/leaderboard", get(race_leaderboard))
        .route("/api/race/track", get(race_track))
        .route("/api/race/cars/:number", get(race_car))
        .route("/api/race/control", post(race_control))
        .route("/api/race/stream", get(race_stream))
        // Historical results
        .route("/api/results", get(list_results))
        .route("/api/results/fastest-laps", get(fastest_laps))
        // Strategy watch
        .route("/api/strategy/watch", get(get_watch).put(set_watch))
        .route("/api/strategy/panel", get(strategy_panel))
        // Commentary
        .route("/api/commentary/history", post(commentary_history))
        .route("/api/commentary/strategy", post(commentary_strategy))
        .route("/api/commentary/driver", post(commentary_driver))
        .route("/api/commentary/what-if", post(commentary_what_if))
        .route("/api/commentary/head-to-head", post(commentary_head_to_head))
        .route("/api/commentary/ask", post(commentary_ask))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn not_found(what: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, what.to_string())
}

fn bad_request(what: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, what.to_string())
}

// === Race Endpoints ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RaceInfo {
    lap: u32,
    max_laps: u32,
    playing: bool,
    tick_interval_ms: u64,
}

async fn race_info(State(state): State<AppState>) -> Json<RaceInfo> {
    let snapshot = state.controller.snapshot().await;
    Json(RaceInfo {
        lap: snapshot.lap,
        max_laps: snapshot.max_laps,
        playing: snapshot.playing,
        tick_interval_ms: state.controller.tick_interval().as_millis() as u64,
    })
}

fn wants_msgpack(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(MSGPACK))
}

/// Current snapshot as JSON, or MessagePack when asked for
async fn race_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let snapshot = state.controller.snapshot().await;

    if wants_msgpack(&headers) {
        let bytes = rmp_serde::to_vec_named(&snapshot).map_err(|e| {
            tracing::error!("Failed to encode snapshot: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode snapshot: {}", e),
            )
        })?;
        return Ok(([(header::CONTENT_TYPE, MSGPACK)], bytes).into_response());
    }

    Ok(Json(snapshot).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardResponse {
    lap: u32,
    rows: Vec<LeaderboardRow>,
}

async fn race_leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    let race = state.controller.race_state().await;
    Json(LeaderboardResponse {
        lap: race.lap,
        rows: leaderboard(&race),
    })
}

#[derive(Serialize)]
struct TrackResponse {
    outline: Vec<Point>,
    cars: Vec<TrackPosition>,
}

async fn race_track(State(state): State<AppState>) -> Json<TrackResponse> {
    let race = state.controller.race_state().await;
    Json(TrackResponse {
        outline: state.track.points().to_vec(),
        cars: track_positions(&race, state.total_laps(), &state.track),
    })
}

#[derive(Serialize)]
struct CarResponse {
    car: CarState,
    panel: TelemetryPanel,
}

async fn race_car(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<CarResponse> {
    let race = state.controller.race_state().await;
    let car = race
        .get(&number)
        .ok_or_else(|| not_found(format!("Car {} is not on track at lap {}", number, race.lap)))?;

    Ok(Json(CarResponse {
        car: car.clone(),
        panel: telemetry_panel(car),
    }))
}

#[derive(Deserialize)]
struct ControlRequest {
    action: String,
    value: Option<f64>,
}

#[derive(Serialize)]
struct ControlResponse {
    status: &'static str,
    lap: u32,
    playing: bool,
}

async fn race_control(
    State(state): State<AppState>,
    Json(request): Json<ControlRequest>,
) -> ApiResult<ControlResponse> {
    let controller = &state.controller;

    let status = match request.action.as_str() {
        "play" => {
            controller.play().await;
            "playing"
        }
        "pause" => {
            controller.pause().await;
            "paused"
        }
        "reset" => {
            controller.reset().await;
            "reset"
        }
        "seek" => {
            let lap = request
                .value
                .ok_or_else(|| bad_request("Missing 'value' for seek"))?;
            if !lap.is_finite() {
                return Err(bad_request("Seek target must be a number"));
            }
            controller.go_to_lap(lap.round() as i64).await;
            "seeked"
        }
        other => return Err(bad_request(format!("Unknown action: {}", other))),
    };

    let snapshot = controller.snapshot().await;
    Ok(Json(ControlResponse {
        status,
        lap: snapshot.lap,
        playing: snapshot.playing,
    }))
}

fn snapshot_event(snapshot: &RaceSnapshot) -> Option<Event> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Event::default().event("snapshot").data(json)),
        Err(e) => {
            tracing::error!("Failed to serialize snapshot: {}", e);
            None
        }
    }
}

/// Current snapshot, then one event per lap transition
async fn race_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.controller.subscribe();
    let initial = state.controller.snapshot().await;

    let updates = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(snapshot) => snapshot_event(&snapshot).map(Ok::<Event, Infallible>),
            Err(e) => {
                tracing::warn!("Snapshot stream error: {}", e);
                None
            }
        }
    });

    let stream = stream::iter(snapshot_event(&initial).map(Ok::<Event, Infallible>)).chain(updates);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Results Endpoints ===

async fn list_results(State(state): State<AppState>) -> Json<Vec<RaceResult>> {
    Json(state.results.results().to_vec())
}

#[derive(Deserialize)]
struct FastestLapQuery {
    limit: Option<usize>,
}

async fn fastest_laps(
    State(state): State<AppState>,
    Query(query): Query<FastestLapQuery>,
) -> Json<Vec<FastestLapBar>> {
    let limit = query.limit.unwrap_or(10);
    Json(fastest_lap_chart(state.results.results(), limit))
}

// === Strategy Watch Endpoints ===

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchSettings {
    car_number: Option<String>,
    #[serde(default, skip_deserializing)]
    every_laps: u32,
}

async fn get_watch(State(state): State<AppState>) -> Json<WatchSettings> {
    Json(WatchSettings {
        car_number: state.watched_car.read().await.clone(),
        every_laps: state.config.strategy_every_laps,
    })
}

async fn set_watch(
    State(state): State<AppState>,
    Json(request): Json<WatchSettings>,
) -> ApiResult<WatchSettings> {
    let car_number = request
        .car_number
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if let Some(number) = &car_number {
        if state.telemetry.car(number).is_empty() {
            return Err(not_found(format!("Unknown car {}", number)));
        }
    }

    tracing::info!(
        "Strategy watch now following {}",
        car_number.as_deref().unwrap_or("the leader")
    );
    *state.watched_car.write().await = car_number.clone();

    Ok(Json(WatchSettings {
        car_number,
        every_laps: state.config.strategy_every_laps,
    }))
}

async fn strategy_panel(State(state): State<AppState>) -> Json<StrategyPanel> {
    Json(state.strategy_panel.read().await.clone())
}

// === Commentary Endpoints ===

#[derive(Serialize)]
struct CommentaryFailure {
    error: String,
}

type CommentaryResult = Result<Json<CommentaryResponse>, Response>;

fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(CommentaryFailure {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Run a request against the backend; failures become a 502 with a
/// user-facing message and never reach the controller
async fn ask_backend(state: &AppState, request: CommentaryRequest) -> CommentaryResult {
    match analyst::respond(state.commentary.as_ref(), &request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!(
                "{} commentary via {} failed: {}",
                request.kind(),
                state.commentary.name(),
                e
            );
            Err(reject(StatusCode::BAD_GATEWAY, e.user_message()))
        }
    }
}

fn laps_for(state: &AppState, car_number: &str, up_to: Option<u32>) -> Vec<TelemetrySample> {
    state
        .telemetry
        .car(car_number)
        .into_iter()
        .filter(|s| up_to.map_or(true, |lap| s.lap <= lap))
        .cloned()
        .collect()
}

async fn commentary_history(State(state): State<AppState>) -> CommentaryResult {
    let results = state.results.results().to_vec();
    ask_backend(&state, CommentaryRequest::RaceHistory { results }).await
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CarQuery {
    car_number: Option<String>,
}

async fn commentary_strategy(
    State(state): State<AppState>,
    body: Option<Json<CarQuery>>,
) -> CommentaryResult {
    let query = body.map(|Json(q)| q).unwrap_or_default();
    let race = state.controller.race_state().await;
    let car = focus_car(&race, query.car_number.as_deref())
        .cloned()
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "No car on track"))?;

    let total_laps = state.total_laps();
    ask_backend(&state, CommentaryRequest::Strategy { car, total_laps }).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriverQuery {
    car_number: String,
}

async fn commentary_driver(
    State(state): State<AppState>,
    Json(query): Json<DriverQuery>,
) -> CommentaryResult {
    let laps = laps_for(&state, &query.car_number, None);
    let request = CommentaryRequest::DriverAnalysis {
        car_number: query.car_number,
        laps,
    };
    ask_backend(&state, request).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhatIfQuery {
    car_number: String,
    decision_lap: u32,
    action: String,
}

async fn commentary_what_if(
    State(state): State<AppState>,
    Json(query): Json<WhatIfQuery>,
) -> CommentaryResult {
    let laps = laps_for(&state, &query.car_number, None);
    if laps.is_empty() {
        return Err(reject(
            StatusCode::NOT_FOUND,
            format!("No telemetry for car {}", query.car_number),
        ));
    }
    if query.action.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Describe the alternate action"));
    }

    let scenario = WhatIfScenario {
        original_finish: state.results.get(&query.car_number).map(|r| r.position),
        decision_lap: query.decision_lap.clamp(1, state.total_laps()),
        total_laps: state.total_laps(),
        car_number: query.car_number,
        action: query.action.trim().to_string(),
        laps,
    };
    ask_backend(&state, CommentaryRequest::WhatIf(scenario)).await
}

#[derive(Deserialize)]
struct HeadToHeadQuery {
    first: String,
    second: String,
}

async fn commentary_head_to_head(
    State(state): State<AppState>,
    Json(query): Json<HeadToHeadQuery>,
) -> CommentaryResult {
    if query.first == query.second {
        return Err(reject(StatusCode::BAD_REQUEST, "Pick two different cars"));
    }

    let race = state.controller.race_state().await;
    let on_track = |number: &str| {
        race.get(number).cloned().ok_or_else(|| {
            reject(
                StatusCode::NOT_FOUND,
                format!("Car {} is not on track at lap {}", number, race.lap),
            )
        })
    };
    let first = on_track(&query.first)?;
    let second = on_track(&query.second)?;

    let request = CommentaryRequest::HeadToHead {
        first_laps: laps_for(&state, &query.first, Some(race.lap)),
        second_laps: laps_for(&state, &query.second, Some(race.lap)),
        first,
        second,
    };
    ask_backend(&state, request).await
}

#[derive(Deserialize)]
struct AskQuery {
    question: String,
}

async fn commentary_ask(
    State(state): State<AppState>,
    Json(query): Json<AskQuery>,
) -> CommentaryResult {
    if query.question.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Question is empty"));
    }

    let race = state.controller.race_state().await;
    let request = CommentaryRequest::Question {
        question: query.question,
        race,
        total_laps: state.total_laps(),
    };
    ask_backend(&state, request).await
}
