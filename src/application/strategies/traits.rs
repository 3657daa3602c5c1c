use crate::domain::market::{Candle, SwingPoint};
use crate::domain::signals::{Evaluation, StrategyId};

/// A pure signal evaluator.
///
/// Implementations never mutate their inputs and must return the same
/// `Evaluation` for the same `(candles, swings)`. Insufficient input yields
/// `Evaluation::wait`.
pub trait SignalStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    fn analyze(&self, candles: &[Candle], swings: &[SwingPoint]) -> Evaluation;
}
