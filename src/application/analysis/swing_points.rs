use crate::domain::market::{Candle, SwingKind, SwingPoint};

pub const DEFAULT_SWING_LOOKBACK: usize = 3;

/// Extracts local extrema from a candle window.
///
/// Index `i` is a swing high when its high is strictly greater than the high of
/// every other bar in `[i - lookback, i + lookback]`, and a swing low when its
/// low is strictly below every other low in that range. Both may hold for the
/// same bar; the high is emitted first. Output is in ascending index order.
/// Windows shorter than `2 * lookback + 1` yield nothing.
pub fn detect_swing_points(candles: &[Candle], lookback: usize) -> Vec<SwingPoint> {
    let len = candles.len();
    if lookback == 0 || len < 2 * lookback + 1 {
        return Vec::new();
    }

    let mut swings = Vec::new();

    for i in lookback..len - lookback {
        let pivot = &candles[i];
        let mut is_high = true;
        let mut is_low = true;

        for (j, other) in candles.iter().enumerate().take(i + lookback + 1).skip(i - lookback) {
            if j == i {
                continue;
            }
            if other.high >= pivot.high {
                is_high = false;
            }
            if other.low <= pivot.low {
                is_low = false;
            }
            if !is_high && !is_low {
                break;
            }
        }

        if is_high {
            swings.push(SwingPoint {
                index: i,
                price: pivot.high,
                kind: SwingKind::High,
                time: pivot.open_time,
            });
        }
        if is_low {
            swings.push(SwingPoint {
                index: i,
                price: pivot.low,
                kind: SwingKind::Low,
                time: pivot.open_time,
            });
        }
    }

    swings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hl(i: i64, high: f64, low: f64) -> Candle {
        Candle::new(i * 60_000, low, high, low, high, 1.0)
    }

    #[test]
    fn test_short_window_yields_nothing() {
        let candles: Vec<Candle> = (0..6).map(|i| hl(i, 10.0 + i as f64, 5.0)).collect();
        assert!(detect_swing_points(&candles, 3).is_empty());
        assert!(detect_swing_points(&[], 3).is_empty());
    }

    #[test]
    fn test_single_peak_and_trough() {
        let highs = [10.0, 11.0, 12.0, 20.0, 12.0, 11.0, 10.0];
        let candles: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, h)| hl(i as i64, *h, h - 5.0))
            .collect();

        let swings = detect_swing_points(&candles, 3);
        assert_eq!(swings.len(), 1);
        assert_eq!(swings[0].index, 3);
        assert_eq!(swings[0].kind, SwingKind::High);
        assert_eq!(swings[0].price, 20.0);
        assert_eq!(swings[0].time, 3 * 60_000);

        let lows = [10.0, 9.0, 8.0, 1.0, 8.0, 9.0, 10.0];
        let candles: Vec<Candle> = lows
            .iter()
            .enumerate()
            .map(|(i, l)| hl(i as i64, 50.0 + i as f64 % 2.0, *l))
            .collect();
        let swings = detect_swing_points(&candles, 3);
        assert!(swings.iter().any(|s| s.index == 3 && s.kind == SwingKind::Low && s.price == 1.0));
    }

    #[test]
    fn test_monotonic_highs_have_no_interior_lows() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| hl(i, 100.0 + i as f64, 95.0 + i as f64))
            .collect();
        let swings = detect_swing_points(&candles, 3);
        assert!(swings.iter().all(|s| s.kind != SwingKind::Low));
        assert!(swings.iter().all(|s| s.kind != SwingKind::High));
    }

    #[test]
    fn test_flat_data_has_no_swings() {
        let candles: Vec<Candle> = (0..20).map(|i| Candle::flat(i * 60_000, 100.0)).collect();
        assert!(detect_swing_points(&candles, 3).is_empty());
    }

    #[test]
    fn test_bar_can_be_both_high_and_low() {
        // Outside bar: highest high and lowest low of its neighbourhood.
        let mut candles: Vec<Candle> = (0..7).map(|i| hl(i, 10.0, 9.0)).collect();
        candles[3] = hl(3, 15.0, 1.0);

        let swings = detect_swing_points(&candles, 3);
        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].kind, SwingKind::High);
        assert_eq!(swings[1].kind, SwingKind::Low);
        assert!(swings.iter().all(|s| s.index == 3));
    }

    #[test]
    fn test_output_is_index_ordered() {
        let highs = [1.0, 2.0, 3.0, 9.0, 3.0, 2.0, 1.0, 2.0, 3.0, 9.5, 3.0, 2.0, 1.0];
        let candles: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, h)| hl(i as i64, *h, h - 0.5))
            .collect();
        let swings = detect_swing_points(&candles, 3);
        assert!(swings.windows(2).all(|w| w[0].index <= w[1].index));
        assert!(swings.iter().any(|s| s.index == 3 && s.is_high()));
        assert!(swings.iter().any(|s| s.index == 9 && s.is_high()));
        assert!(swings.iter().any(|s| s.index == 6 && s.is_low()));
    }
}
