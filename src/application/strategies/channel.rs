use super::traits::SignalStrategy;
use crate::domain::market::{Candle, SwingPoint};
use crate::domain::signals::{Evaluation, SignalKind, StrategyId};

const UPPER_ZONE: f64 = 0.9;
const LOWER_ZONE: f64 = 0.1;

/// High, low, higher high, oldest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelPattern {
    pub first_high: SwingPoint,
    pub low: SwingPoint,
    pub second_high: SwingPoint,
}

/// Channel boundaries evaluated at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBounds {
    pub upper: f64,
    pub lower: f64,
}

impl ChannelBounds {
    /// Fractional position of `price` between lower (0.0) and upper (1.0).
    /// `None` for a (numerically) zero-width channel.
    pub fn position(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width.abs() <= 1e-9 * self.upper.abs().max(1.0) {
            return None;
        }
        Some((price - self.lower) / width)
    }
}

/// Ascending channel: upper boundary through two swing highs, lower boundary
/// parallel to it through the swing low between them.
#[derive(Debug, Clone, Default)]
pub struct ChannelStrategy;

impl ChannelStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Newest-first search for a high/low/higher-high triple. First match wins.
pub fn find_ascending_channel(swings: &[SwingPoint]) -> Option<ChannelPattern> {
    let n = swings.len();
    if n < 3 {
        return None;
    }

    for i in (2..n).rev() {
        if !swings[i].is_high() {
            continue;
        }
        for j in (1..i).rev() {
            if !swings[j].is_low() {
                continue;
            }
            for k in (0..j).rev() {
                if !swings[k].is_high() {
                    continue;
                }
                if swings[i].price > swings[k].price {
                    return Some(ChannelPattern {
                        first_high: swings[k],
                        low: swings[j],
                        second_high: swings[i],
                    });
                }
            }
        }
    }

    None
}

impl ChannelPattern {
    pub fn bounds_at(&self, time: i64) -> ChannelBounds {
        let dt = (self.second_high.time - self.first_high.time) as f64;
        let slope = if dt == 0.0 {
            0.0
        } else {
            (self.second_high.price - self.first_high.price) / dt
        };

        let upper = self.second_high.price + slope * (time - self.second_high.time) as f64;
        let upper_at_low =
            self.first_high.price + slope * (self.low.time - self.first_high.time) as f64;
        let offset = self.low.price - upper_at_low;

        ChannelBounds {
            upper,
            lower: upper + offset,
        }
    }
}

impl SignalStrategy for ChannelStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Channel
    }

    fn analyze(&self, candles: &[Candle], swings: &[SwingPoint]) -> Evaluation {
        let Some(last) = candles.last() else {
            return Evaluation::wait("No candles");
        };
        if swings.len() < 3 {
            return Evaluation::wait(format!("Not enough swing points: {} of 3", swings.len()));
        }

        let Some(channel) = find_ascending_channel(swings) else {
            return Evaluation {
                kind: SignalKind::Neutral,
                reason: "No ascending channel found".to_string(),
                price: None,
                confidence: 30,
            };
        };

        let price = last.close;
        let bounds = channel.bounds_at(last.open_time);

        // Zone checks come first; outside-channel checks only decide when the
        // position does not.
        if let Some(position) = bounds.position(price) {
            if position >= UPPER_ZONE {
                return Evaluation::new(
                    SignalKind::Sell,
                    format!("Price at upper channel boundary ({:.2})", bounds.upper),
                    price,
                    70,
                );
            }
            if position <= LOWER_ZONE {
                return Evaluation::new(
                    SignalKind::Buy,
                    format!("Price at lower channel boundary ({:.2})", bounds.lower),
                    price,
                    70,
                );
            }
        }

        if price > bounds.upper {
            Evaluation::new(
                SignalKind::Breakout,
                format!("Broke above channel at {:.2}", bounds.upper),
                price,
                85,
            )
        } else if price < bounds.lower {
            Evaluation::new(
                SignalKind::Breakdown,
                format!("Broke below channel at {:.2}", bounds.lower),
                price,
                85,
            )
        } else {
            Evaluation::new(SignalKind::Hold, "Price inside channel", price, 50)
        }
    }
}
