use crate::domain::signals::{Evaluation, Signal, SignalKind, StrategyId};
use std::collections::HashMap;

pub const FALLBACK_CONFIDENCE: u8 = 30;

/// One strategy's stamped output for a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyUpdate {
    pub strategy: StrategyId,
    pub signal: Signal,
    /// The kind differs from what this strategy emitted last time
    /// (or there was no previous signal).
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arbitration {
    pub updates: Vec<StrategyUpdate>,
    pub best: Signal,
}

/// Tracks the last signal per strategy and picks the representative signal
/// of each analysis pass.
#[derive(Debug, Default)]
pub struct SignalArbiter {
    last_signals: HashMap<StrategyId, Signal>,
}

impl SignalArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new_signal(&self, strategy: StrategyId, kind: SignalKind) -> bool {
        self.last_signals
            .get(&strategy)
            .is_none_or(|last| last.kind != kind)
    }

    /// Stores `signal` as the strategy's latest and reports whether it is new.
    pub fn record(&mut self, strategy: StrategyId, signal: Signal) -> bool {
        let is_new = self.is_new_signal(strategy, signal.kind);
        self.last_signals.insert(strategy, signal);
        is_new
    }

    /// Stamps each evaluation, records it, and selects the best signal.
    ///
    /// `evaluations` must be in strategy evaluation order; it decides ties.
    pub fn arbitrate(
        &mut self,
        symbol: &str,
        evaluations: Vec<(StrategyId, Evaluation)>,
        latest_close: f64,
        timestamp: i64,
    ) -> Arbitration {
        let mut updates = Vec::with_capacity(evaluations.len());

        for (strategy, evaluation) in evaluations {
            let signal = evaluation.into_signal(strategy, symbol, timestamp);
            let is_new = self.record(strategy, signal.clone());
            updates.push(StrategyUpdate {
                strategy,
                signal,
                is_new,
            });
        }

        let best = select_best(
            updates.iter().map(|u| &u.signal),
            symbol,
            latest_close,
            timestamp,
        );

        Arbitration { updates, best }
    }

    pub fn last_signal(&self, strategy: StrategyId) -> Option<&Signal> {
        self.last_signals.get(&strategy)
    }

    pub fn reset(&mut self) {
        self.last_signals.clear();
    }
}

/// Highest-confidence actionable signal; the first one wins a tie. Falls back
/// to a combined NEUTRAL at `latest_close` when nothing is actionable.
pub fn select_best<'a>(
    signals: impl IntoIterator<Item = &'a Signal>,
    symbol: &str,
    latest_close: f64,
    timestamp: i64,
) -> Signal {
    let mut best: Option<&Signal> = None;
    let mut max_confidence = 0u8;

    for signal in signals {
        if signal.kind.is_actionable() && signal.confidence > max_confidence {
            max_confidence = signal.confidence;
            best = Some(signal);
        }
    }

    match best {
        Some(signal) => signal.clone(),
        None => Signal {
            kind: SignalKind::Neutral,
            reason: "No clear trading opportunity".to_string(),
            price: Some(latest_close),
            confidence: FALLBACK_CONFIDENCE,
            strategy: None,
            symbol: symbol.to_string(),
            timestamp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(kind: SignalKind, confidence: u8) -> Evaluation {
        Evaluation::new(kind, "test", 100.0, confidence)
    }

    #[test]
    fn test_novelty_sequence() {
        let mut arbiter = SignalArbiter::new();
        let mut notified = Vec::new();

        for kind in [SignalKind::Buy, SignalKind::Buy, SignalKind::Sell] {
            let result = arbiter.arbitrate(
                "BTCUSDT",
                vec![(StrategyId::Trend, eval(kind, 85))],
                100.0,
                0,
            );
            notified.push(result.updates[0].is_new);
        }

        assert_eq!(notified, vec![true, false, true]);
        assert_eq!(
            arbiter.last_signal(StrategyId::Trend).map(|s| s.kind),
            Some(SignalKind::Sell)
        );
    }

    #[test]
    fn test_state_is_per_strategy() {
        let mut arbiter = SignalArbiter::new();
        arbiter.arbitrate(
            "BTCUSDT",
            vec![(StrategyId::Trend, eval(SignalKind::Buy, 85))],
            100.0,
            0,
        );

        let result = arbiter.arbitrate(
            "BTCUSDT",
            vec![
                (StrategyId::Trend, eval(SignalKind::Buy, 85)),
                (StrategyId::Channel, eval(SignalKind::Buy, 70)),
            ],
            100.0,
            1,
        );
        assert!(!result.updates[0].is_new);
        assert!(result.updates[1].is_new);
    }

    #[test]
    fn test_highest_actionable_confidence_wins() {
        let mut arbiter = SignalArbiter::new();
        let result = arbiter.arbitrate(
            "BTCUSDT",
            vec![
                (StrategyId::Trend, eval(SignalKind::Neutral, 40)),
                (StrategyId::Trendline, eval(SignalKind::Breakdown, 80)),
                (StrategyId::Channel, eval(SignalKind::Breakout, 85)),
            ],
            100.0,
            0,
        );
        assert_eq!(result.best.kind, SignalKind::Breakout);
        assert_eq!(result.best.strategy, Some(StrategyId::Channel));
    }

    #[test]
    fn test_tie_goes_to_first_strategy() {
        let mut arbiter = SignalArbiter::new();
        let result = arbiter.arbitrate(
            "BTCUSDT",
            vec![
                (StrategyId::Trend, eval(SignalKind::Buy, 85)),
                (StrategyId::Trendline, eval(SignalKind::Hold, 90)),
                (StrategyId::Channel, eval(SignalKind::Breakout, 85)),
            ],
            100.0,
            0,
        );
        assert_eq!(result.best.strategy, Some(StrategyId::Trend));
        assert_eq!(result.best.kind, SignalKind::Buy);
    }

    #[test]
    fn test_fallback_when_nothing_actionable() {
        let mut arbiter = SignalArbiter::new();
        let result = arbiter.arbitrate(
            "ETHUSDT",
            vec![
                (StrategyId::Trend, eval(SignalKind::Neutral, 40)),
                (StrategyId::Trendline, Evaluation::wait("few swings")),
                (StrategyId::Channel, eval(SignalKind::Hold, 50)),
            ],
            2500.5,
            42,
        );

        assert_eq!(result.best.kind, SignalKind::Neutral);
        assert_eq!(result.best.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.best.price, Some(2500.5));
        assert_eq!(result.best.strategy, None);
        assert_eq!(result.best.symbol, "ETHUSDT");
        assert_eq!(result.best.timestamp, 42);
    }

    #[test]
    fn test_reset_makes_next_signal_new() {
        let mut arbiter = SignalArbiter::new();
        arbiter.record(
            StrategyId::Trend,
            eval(SignalKind::Buy, 85).into_signal(StrategyId::Trend, "BTCUSDT", 0),
        );
        assert!(!arbiter.is_new_signal(StrategyId::Trend, SignalKind::Buy));
        arbiter.reset();
        assert!(arbiter.is_new_signal(StrategyId::Trend, SignalKind::Buy));
    }
}
