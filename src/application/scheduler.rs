use crate::application::engine::LiveSignalEngine;
use crate::application::market_data::CandleClosed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Drives analysis passes: one every `period`, plus one per closed candle.
pub struct AnalysisScheduler {
    handle: Option<JoinHandle<()>>,
}

impl AnalysisScheduler {
    /// Spawns the scheduler task. Without the engine's candle-closed stream
    /// (already taken elsewhere) only the periodic trigger runs.
    pub fn spawn(engine: Arc<LiveSignalEngine>, period: Duration) -> Self {
        let closed_rx = engine.take_candle_closed_events();
        if closed_rx.is_none() {
            warn!("AnalysisScheduler: Candle-closed events unavailable, periodic analysis only");
        }

        let handle = tokio::spawn(async move {
            Self::run(engine, period, closed_rx).await;
        });
        info!(
            "AnalysisScheduler: Started (every {}s and on candle close)",
            period.as_secs()
        );

        Self {
            handle: Some(handle),
        }
    }

    async fn run(
        engine: Arc<LiveSignalEngine>,
        period: Duration,
        closed_rx: Option<mpsc::Receiver<CandleClosed>>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (mut closed_rx, mut events_open) = match closed_rx {
            Some(rx) => (rx, true),
            None => (mpsc::channel(1).1, false),
        };

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    engine.run_analysis().await;
                }
                event = closed_rx.recv(), if events_open => match event {
                    Some(closed) => {
                        debug!("AnalysisScheduler: Candle {} closed", closed.open_time);
                        engine.run_analysis().await;
                    }
                    None => {
                        warn!("AnalysisScheduler: Candle-closed stream ended");
                        events_open = false;
                    }
                },
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("AnalysisScheduler: Stopped");
        }
    }
}

impl Drop for AnalysisScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
