//! Strategy watch
//!
//! Follows the snapshot broadcast and, while playing, asks the commentary
//! backend for a strategy call every `strategy_every_laps` laps. Requests
//! run in their own tasks and only ever write the strategy panel.

use crate::state::AppState;
use pit_adapters::analyst;
use pit_core::commentary::{CommentaryRequest, CommentaryResponse, StrategyRecommendation};
use pit_core::model::CarState;
use pit_core::ranking::focus_car;
use pit_core::RaceSnapshot;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StrategyPanel {
    Idle,
    Loading {
        car_number: String,
        lap: u32,
    },
    Ready {
        car_number: String,
        lap: u32,
        recommendation: StrategyRecommendation,
    },
    Failed {
        car_number: String,
        lap: u32,
        message: String,
    },
}

impl StrategyPanel {
    fn is_loading(&self, car: &str, at_lap: u32) -> bool {
        matches!(self, StrategyPanel::Loading { car_number, lap } if car_number == car && *lap == at_lap)
    }
}

/// Whether a snapshot should trigger a strategy call
pub fn is_strategy_lap(snapshot: &RaceSnapshot, every_laps: u32) -> bool {
    every_laps > 0 && snapshot.playing && snapshot.lap % every_laps == 0
}

/// Run the watch until the snapshot channel closes
pub async fn run(state: AppState) {
    let every = state.config.strategy_every_laps;
    if every == 0 {
        info!("Strategy watch disabled");
        return;
    }

    let mut rx = state.controller.subscribe();
    let mut last_lap = None;
    info!("Strategy watch running every {} laps", every);

    loop {
        let snapshot = match rx.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Strategy watch skipped {} snapshots", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        // Fire once per arrival at a lap; a rewind makes the lap new again
        let arrived = last_lap.replace(snapshot.lap) != Some(snapshot.lap);
        if !arrived || !is_strategy_lap(&snapshot, every) {
            continue;
        }

        let watched = state.watched_car.read().await.clone();
        let Some(car) = focus_car(&snapshot.race, watched.as_deref()).cloned() else {
            continue;
        };

        tokio::spawn(request_strategy(state.clone(), car, snapshot.lap));
    }
}

/// Ask for a strategy call for `car` and record the outcome in the panel
pub async fn request_strategy(state: AppState, car: CarState, lap: u32) {
    let car_number = car.car_number().to_string();
    *state.strategy_panel.write().await = StrategyPanel::Loading {
        car_number: car_number.clone(),
        lap,
    };

    let request = CommentaryRequest::Strategy {
        car,
        total_laps: state.total_laps(),
    };
    let outcome = analyst::respond(state.commentary.as_ref(), &request).await;

    let mut panel = state.strategy_panel.write().await;
    if !panel.is_loading(&car_number, lap) {
        // A newer request owns the panel
        return;
    }

    *panel = match outcome {
        Ok(CommentaryResponse::Recommendation(recommendation)) => {
            info!(
                "Strategy for car {} at lap {}: {}",
                car_number,
                lap,
                recommendation.recommendation.label()
            );
            StrategyPanel::Ready {
                car_number,
                lap,
                recommendation,
            }
        }
        Ok(CommentaryResponse::Text { .. }) => StrategyPanel::Failed {
            car_number,
            lap,
            message: "Commentary backend returned text instead of a recommendation".to_string(),
        },
        Err(e) => {
            warn!("Strategy request for car {} failed: {}", car_number, e);
            StrategyPanel::Failed {
                car_number,
                lap,
                message: e.user_message(),
            }
        }
    };
}
