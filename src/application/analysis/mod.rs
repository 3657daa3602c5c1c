pub mod swing_points;

pub use swing_points::{DEFAULT_SWING_LOOKBACK, detect_swing_points};
