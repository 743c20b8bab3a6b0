//! # Local Prediction
//!
//! | Module | Role |
//! |--------|------|
//! | [`heuristic`] | Window-count trend call, probabilities, rationale |
//! | [`technical`] | RSI, MACD, EMA/SMA, volume trend |

pub mod heuristic;
pub mod technical;

pub use heuristic::{LocalPredictor, WindowStats, DEMO_MODE_WARNING};
pub use technical::TechnicalCalculator;
