use super::traits::SignalStrategy;
use crate::domain::market::{Candle, SwingPoint};
use crate::domain::signals::{Evaluation, SignalKind, StrategyId};
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Moving-average trend confirmation.
///
/// BUY when each of the last `confirmation_bars` closes is strictly above the
/// SMA value of its own bar, SELL when each is strictly below, NEUTRAL otherwise.
#[derive(Debug, Clone)]
pub struct TrendStrategy {
    pub period: usize,
    pub confirmation_bars: usize,
}

impl TrendStrategy {
    pub fn new(period: usize, confirmation_bars: usize) -> Self {
        Self {
            period,
            confirmation_bars: confirmation_bars.max(1),
        }
    }

    pub fn min_candles(&self) -> usize {
        self.period + self.confirmation_bars
    }
}

impl Default for TrendStrategy {
    fn default() -> Self {
        Self::new(14, 3)
    }
}

impl SignalStrategy for TrendStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Trend
    }

    fn analyze(&self, candles: &[Candle], _swings: &[SwingPoint]) -> Evaluation {
        if candles.len() < self.min_candles() {
            return Evaluation::wait(format!(
                "Not enough data: {} of {} candles",
                candles.len(),
                self.min_candles()
            ));
        }

        let Ok(mut sma) = SimpleMovingAverage::new(self.period) else {
            return Evaluation::wait(format!("Invalid SMA period {}", self.period));
        };

        let averages: Vec<f64> = candles.iter().map(|c| sma.next(c.close)).collect();
        let start = candles.len() - self.confirmation_bars;
        let recent = candles[start..].iter().zip(&averages[start..]);

        let all_above = recent.clone().all(|(c, ma)| c.close > *ma);
        let all_below = recent.clone().all(|(c, ma)| c.close < *ma);

        let price = candles[candles.len() - 1].close;
        let ma = averages[averages.len() - 1];

        if all_above {
            tracing::debug!(
                "Trend: {} closes above SMA{} ({:.2})",
                self.confirmation_bars,
                self.period,
                ma
            );
            return Evaluation::new(
                SignalKind::Buy,
                format!(
                    "{} consecutive closes above SMA{}",
                    self.confirmation_bars, self.period
                ),
                price,
                85,
            );
        }

        if all_below {
            tracing::debug!(
                "Trend: {} closes below SMA{} ({:.2})",
                self.confirmation_bars,
                self.period,
                ma
            );
            return Evaluation::new(
                SignalKind::Sell,
                format!(
                    "{} consecutive closes below SMA{}",
                    self.confirmation_bars, self.period
                ),
                price,
                85,
            );
        }

        Evaluation::new(SignalKind::Neutral, "Trend direction not confirmed", price, 40)
    }
}
