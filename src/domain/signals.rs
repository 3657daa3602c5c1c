use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Breakout,
    Breakdown,
    Touch,
    Hold,
    Neutral,
    Wait,
}

impl SignalKind {
    /// Kinds that compete in best-signal selection.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            SignalKind::Buy
                | SignalKind::Sell
                | SignalKind::Breakout
                | SignalKind::Breakdown
                | SignalKind::Touch
        )
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Breakout => "BREAKOUT",
            SignalKind::Breakdown => "BREAKDOWN",
            SignalKind::Touch => "TOUCH",
            SignalKind::Hold => "HOLD",
            SignalKind::Neutral => "NEUTRAL",
            SignalKind::Wait => "WAIT",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    Trend,
    Trendline,
    Channel,
}

impl StrategyId {
    /// Evaluation order; also the tie-break order for best-signal selection.
    pub const ALL: [StrategyId; 3] = [StrategyId::Trend, StrategyId::Trendline, StrategyId::Channel];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Trend => "trend",
            StrategyId::Trendline => "trendline",
            StrategyId::Channel => "channel",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw output of one strategy evaluator, before it is stamped with
/// strategy, symbol and time.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub kind: SignalKind,
    pub reason: String,
    pub price: Option<f64>,
    pub confidence: u8,
}

impl Evaluation {
    pub fn new(kind: SignalKind, reason: impl Into<String>, price: f64, confidence: u8) -> Self {
        Self {
            kind,
            reason: reason.into(),
            price: Some(price),
            confidence: confidence.min(100),
        }
    }

    /// Insufficient input: no price, zero confidence.
    pub fn wait(reason: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Wait,
            reason: reason.into(),
            price: None,
            confidence: 0,
        }
    }

    pub fn into_signal(self, strategy: StrategyId, symbol: &str, timestamp: i64) -> Signal {
        Signal {
            kind: self.kind,
            reason: self.reason,
            price: self.price,
            confidence: self.confidence,
            strategy: Some(strategy),
            symbol: symbol.to_string(),
            timestamp,
        }
    }
}

/// A stamped signal. `strategy` is `None` for the combined fallback produced
/// when no strategy has anything actionable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub reason: String,
    pub price: Option<f64>,
    pub confidence: u8,
    pub strategy: Option<StrategyId>,
    pub symbol: String,
    pub timestamp: i64,
}

impl Signal {
    pub fn source_label(&self) -> &'static str {
        self.strategy.map(|s| s.as_str()).unwrap_or("combined")
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price {
            Some(price) => write!(
                f,
                "{} {} @ {:.2} ({}%, {}): {}",
                self.symbol,
                self.kind,
                price,
                self.confidence,
                self.source_label(),
                self.reason
            ),
            None => write!(
                f,
                "{} {} ({}%, {}): {}",
                self.symbol,
                self.kind,
                self.confidence,
                self.source_label(),
                self.reason
            ),
        }
    }
}
