use super::traits::SignalStrategy;
use crate::domain::market::{Candle, SwingPoint};
use crate::domain::signals::{Evaluation, SignalKind, StrategyId};

/// Band around the extrapolated line (in percent) that counts as a touch.
const TOUCH_TOLERANCE_PCT: f64 = 0.5;
const BREAKDOWN_RATIO: f64 = 0.995;

/// Four swing points, oldest first: high, low, higher high, low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscendingPattern {
    pub first_high: SwingPoint,
    pub first_low: SwingPoint,
    pub second_high: SwingPoint,
    pub second_low: SwingPoint,
}

/// Ascending trendline drawn through the two most recent swing lows of a
/// high/low/higher-high/low zig-zag, extrapolated to the latest bar.
#[derive(Debug, Clone, Default)]
pub struct TrendlineStrategy;

impl TrendlineStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Scans from the newest swing backwards and returns the first structurally
/// valid pattern. No attempt is made to find a better fit further back.
pub fn find_ascending_pattern(swings: &[SwingPoint]) -> Option<AscendingPattern> {
    let n = swings.len();
    if n < 4 {
        return None;
    }

    for i in (3..n).rev() {
        if !swings[i].is_low() {
            continue;
        }
        for j in (2..i).rev() {
            if !swings[j].is_high() {
                continue;
            }
            for k in (1..j).rev() {
                if !swings[k].is_low() {
                    continue;
                }
                for l in (0..k).rev() {
                    if !swings[l].is_high() {
                        continue;
                    }
                    if swings[j].price > swings[l].price {
                        return Some(AscendingPattern {
                            first_high: swings[l],
                            first_low: swings[k],
                            second_high: swings[j],
                            second_low: swings[i],
                        });
                    }
                }
            }
        }
    }

    None
}

/// Value at `time` of the line through `a` and `b`.
fn extrapolate(a: &SwingPoint, b: &SwingPoint, time: i64) -> f64 {
    let dt = (b.time - a.time) as f64;
    if dt == 0.0 {
        return b.price;
    }
    let slope = (b.price - a.price) / dt;
    b.price + slope * (time - b.time) as f64
}

impl SignalStrategy for TrendlineStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Trendline
    }

    fn analyze(&self, candles: &[Candle], swings: &[SwingPoint]) -> Evaluation {
        let Some(last) = candles.last() else {
            return Evaluation::wait("No candles");
        };
        if swings.len() < 4 {
            return Evaluation::wait(format!("Not enough swing points: {} of 4", swings.len()));
        }

        let Some(pattern) = find_ascending_pattern(swings) else {
            return Evaluation {
                kind: SignalKind::Neutral,
                reason: "No ascending pattern found".to_string(),
                price: None,
                confidence: 20,
            };
        };

        let price = last.close;
        let line = extrapolate(&pattern.first_low, &pattern.second_low, last.open_time);

        // A line extrapolated to zero or below cannot be touched or broken.
        if line <= 0.0 {
            return Evaluation::new(SignalKind::Hold, "Price above trendline", price, 60);
        }

        let distance_pct = (price - line).abs() / line * 100.0;

        if distance_pct < TOUCH_TOLERANCE_PCT {
            Evaluation::new(
                SignalKind::Touch,
                format!("Touching ascending trendline at {:.2}", line),
                price,
                75,
            )
        } else if price < line * BREAKDOWN_RATIO {
            Evaluation::new(
                SignalKind::Breakdown,
                format!("Broke below trendline at {:.2}", line),
                price,
                80,
            )
        } else {
            Evaluation::new(SignalKind::Hold, "Price above trendline", price, 60)
        }
    }
}
