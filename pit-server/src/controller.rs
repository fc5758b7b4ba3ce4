//! Simulation controller and autoplay task
//!
//! Wraps the synchronous `RaceSimulation` and drives it from a single
//! background task while playing. Every lap transition is broadcast as a
//! `RaceSnapshot`.
//!
//! Lock order is always `playback` then `sim`. `pause`, `reset` and `seek`
//! cancel the autoplay token before taking the simulation lock, and the
//! task re-checks its token once it holds the lock, so a tick that lost the
//! race can never land after a seek.

use pit_core::model::RaceState;
use pit_core::{Projector, RaceSimulation, RaceSnapshot, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SimulationController {
    sim: Arc<RwLock<RaceSimulation>>,

    /// Token of the running autoplay task, if any
    playback: Arc<Mutex<Option<CancellationToken>>>,

    /// Snapshots published after each transition
    snapshot_tx: broadcast::Sender<RaceSnapshot>,

    tick_interval: Duration,
}

impl SimulationController {
    pub fn new(projector: Projector, tick_interval: Duration) -> Self {
        let (snapshot_tx, _) = broadcast::channel(64);

        Self {
            sim: Arc::new(RwLock::new(RaceSimulation::new(projector))),
            playback: Arc::new(Mutex::new(None)),
            snapshot_tx,
            tick_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaceSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub async fn lap(&self) -> u32 {
        self.sim.read().await.lap()
    }

    pub async fn max_laps(&self) -> u32 {
        self.sim.read().await.max_laps()
    }

    pub async fn is_playing(&self) -> bool {
        self.sim.read().await.is_playing()
    }

    pub async fn race_state(&self) -> Arc<RaceState> {
        self.sim.read().await.race_state()
    }

    pub async fn snapshot(&self) -> RaceSnapshot {
        self.sim.read().await.snapshot()
    }

    /// Start autoplay. Returns false (and starts nothing) if already playing.
    pub async fn play(&self) -> bool {
        let mut playback = self.playback.lock().await;

        let snapshot = {
            let mut sim = self.sim.write().await;
            if !sim.play() {
                return false;
            }
            sim.snapshot()
        };

        if let Some(token) = playback.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        *playback = Some(token.clone());
        drop(playback);

        info!("Playback started at lap {}", snapshot.lap);
        self.publish(snapshot);
        self.spawn_autoplay(token);
        true
    }

    /// Stop autoplay. Returns false if it was not running.
    pub async fn pause(&self) -> bool {
        let mut playback = self.playback.lock().await;
        cancel(&mut playback);

        let (changed, snapshot) = {
            let mut sim = self.sim.write().await;
            (sim.pause(), sim.snapshot())
        };
        drop(playback);

        if changed {
            info!("Playback paused at lap {}", snapshot.lap);
            self.publish(snapshot);
        }
        changed
    }

    pub async fn reset(&self) {
        let mut playback = self.playback.lock().await;
        cancel(&mut playback);

        let snapshot = {
            let mut sim = self.sim.write().await;
            sim.reset();
            sim.snapshot()
        };
        drop(playback);

        info!("Simulation reset to lap 1");
        self.publish(snapshot);
    }

    /// Seek (clamped) and pause. Returns the lap landed on.
    pub async fn go_to_lap(&self, target: i64) -> u32 {
        let mut playback = self.playback.lock().await;
        cancel(&mut playback);

        let snapshot = {
            let mut sim = self.sim.write().await;
            sim.go_to_lap(target);
            sim.snapshot()
        };
        drop(playback);

        info!("Seeked to lap {} (requested {})", snapshot.lap, target);
        let lap = snapshot.lap;
        self.publish(snapshot);
        lap
    }

    fn publish(&self, snapshot: RaceSnapshot) {
        // No subscribers is fine
        let _ = self.snapshot_tx.send(snapshot);
    }

    fn spawn_autoplay(&self, token: CancellationToken) {
        let sim = Arc::clone(&self.sim);
        let tx = self.snapshot_tx.clone();
        let interval = self.tick_interval;

        tokio::spawn(async move {
            info!("Autoplay task started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {},
                }

                let (outcome, snapshot) = {
                    let mut sim = sim.write().await;
                    if token.is_cancelled() {
                        break;
                    }
                    let outcome = sim.tick();
                    (outcome, sim.snapshot())
                };

                match outcome {
                    TickOutcome::Advanced(lap) => {
                        debug!("Autoplay advanced to lap {}", lap);
                        let _ = tx.send(snapshot);
                    }
                    TickOutcome::Finished => {
                        info!("Final lap reached, playback paused");
                        let _ = tx.send(snapshot);
                        break;
                    }
                    TickOutcome::Idle => break,
                }
            }

            info!("Autoplay task ended");
        });
    }
}

fn cancel(playback: &mut Option<CancellationToken>) {
    if let Some(token) = playback.take() {
        token.cancel();
    }
}
