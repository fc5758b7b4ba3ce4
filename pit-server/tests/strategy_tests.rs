//! Integration tests for the strategy watch loop
//!
//! Drives the real controller on a paused clock and counts backend calls.

use async_trait::async_trait;
use pit_core::commentary::{CommentaryError, CommentaryProvider};
use pit_server::{config::ServerConfig, state::AppState, strategy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const TICK: Duration = Duration::from_millis(500);

/// Commentary backend that counts strategy calls
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl CommentaryProvider for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn complete_text(&self, _prompt: &str) -> Result<String, CommentaryError> {
        Ok("unused".to_string())
    }

    async fn complete_json(&self, _prompt: &str) -> Result<String, CommentaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(r#"{"recommendation":"STAY_OUT","confidence":70,"reasoning":"Tires fine","color":"green"}"#.to_string())
    }
}

/// Demo race, watch every 3 laps, watch loop already subscribed
async fn watched_state() -> (AppState, Arc<Counting>) {
    let counting = Arc::new(Counting::default());
    let state = AppState::from_config(ServerConfig::default())
        .expect("default config should load")
        .with_commentary(counting.clone());
    assert_eq!(state.config.strategy_every_laps, 3);

    tokio::spawn(strategy::run(state.clone()));
    // Let the watch subscribe before anything is published
    sleep(Duration::from_millis(1)).await;
    (state, counting)
}

/// Play from the current lap through two ticks, then pause
async fn play_two_laps(state: &AppState) {
    state.controller.play().await;
    sleep(TICK * 2 + Duration::from_millis(100)).await;
    state.controller.pause().await;
    sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_strategy_watch_fires_again_after_reset() {
    let (state, counting) = watched_state().await;

    play_two_laps(&state).await;
    assert_eq!(state.controller.lap().await, 3);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    state.controller.reset().await;
    play_two_laps(&state).await;
    assert_eq!(state.controller.lap().await, 3);
    assert_eq!(
        counting.calls.load(Ordering::SeqCst),
        2,
        "Replaying lap 3 after a reset must trigger another call"
    );
}

#[tokio::test(start_paused = true)]
async fn test_strategy_watch_fires_again_after_seek_back() {
    let (state, counting) = watched_state().await;

    play_two_laps(&state).await;
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    state.controller.go_to_lap(2).await;
    state.controller.play().await;
    sleep(TICK + Duration::from_millis(100)).await;
    state.controller.pause().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(state.controller.lap().await, 3);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_strategy_watch_ignores_resume_on_same_lap() {
    let (state, counting) = watched_state().await;

    play_two_laps(&state).await;
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    // Resuming on lap 3 and ticking to 4 and 5 is not a new arrival at a watched lap
    play_two_laps(&state).await;
    assert_eq!(state.controller.lap().await, 5);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}
