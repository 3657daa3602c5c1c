use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kline interval accepted by the exchange for both the bulk query and the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    OneMin,
    ThreeMin,
    FiveMin,
    #[default]
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
    SixHour,
    EightHour,
    TwelveHour,
    OneDay,
    ThreeDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    /// Nominal duration of one candle in minutes (a month counts as 30 days)
    pub fn to_minutes(&self) -> u64 {
        match self {
            Interval::OneMin => 1,
            Interval::ThreeMin => 3,
            Interval::FiveMin => 5,
            Interval::FifteenMin => 15,
            Interval::ThirtyMin => 30,
            Interval::OneHour => 60,
            Interval::TwoHour => 120,
            Interval::FourHour => 240,
            Interval::SixHour => 360,
            Interval::EightHour => 480,
            Interval::TwelveHour => 720,
            Interval::OneDay => 1440,
            Interval::ThreeDay => 4320,
            Interval::OneWeek => 10080,
            Interval::OneMonth => 43200,
        }
    }

    /// Interval string used in REST query parameters and stream names
    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Interval::OneMin => "1m",
            Interval::ThreeMin => "3m",
            Interval::FiveMin => "5m",
            Interval::FifteenMin => "15m",
            Interval::ThirtyMin => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHour => "2h",
            Interval::FourHour => "4h",
            Interval::SixHour => "6h",
            Interval::EightHour => "8h",
            Interval::TwelveHour => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDay => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    // Case matters: "1m" is a minute, "1M" is a month.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1m" => Ok(Interval::OneMin),
            "3m" => Ok(Interval::ThreeMin),
            "5m" => Ok(Interval::FiveMin),
            "15m" => Ok(Interval::FifteenMin),
            "30m" => Ok(Interval::ThirtyMin),
            "1h" => Ok(Interval::OneHour),
            "2h" => Ok(Interval::TwoHour),
            "4h" => Ok(Interval::FourHour),
            "6h" => Ok(Interval::SixHour),
            "8h" => Ok(Interval::EightHour),
            "12h" => Ok(Interval::TwelveHour),
            "1d" => Ok(Interval::OneDay),
            "3d" => Ok(Interval::ThreeDay),
            "1w" => Ok(Interval::OneWeek),
            "1M" => Ok(Interval::OneMonth),
            _ => Err(anyhow!(
                "Invalid interval: '{}'. Valid options: 1m 3m 5m 15m 30m 1h 2h 4h 6h 8h 12h 1d 3d 1w 1M",
                s
            )),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_binance_str())
    }
}
