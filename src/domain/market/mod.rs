// Market data domain
pub mod swing;
pub mod timeframe;
pub mod types;

pub use swing::{SwingKind, SwingPoint};
pub use timeframe::Interval;
pub use types::{Candle, KlineTick, normalize_symbol};
