//! # Domain Models
//!
//! Value types shared by the extraction pipeline, the predictors, and the
//! remote collaborator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Candle`] | OHLCV bar, validated on construction |
//! | [`ChartData`] | Symbol, timeframe, candles, and indicator readings |
//! | [`IndicatorData`] | Raw values scraped from one indicator legend |
//! | [`PriceScale`] | Pixel-to-price calibration |
//! | [`CandleVisual`] | Per-stripe silhouette found in pixel data |
//! | [`Prediction`] | Direction, confidence, and class probabilities |
//! | [`Insight`] | Complete analysis result for one cycle |
//! | [`UtcDateTime`] | UTC clock value |
//!
//! All wire types serialize with snake_case field names. Insight fields also
//! accept their camelCase spelling on input.

mod insight;
mod models;
mod timestamp;

pub use insight::{
    Direction, Impact, Insight, MacdReading, NewsSentiment, Prediction, Probabilities, RiskLevel,
    SentimentLabel, TechnicalAnalysis, VolumeAnalysis, VolumeTrend,
};
pub use models::{Candle, CandleVisual, ChartData, IndicatorData, IndicatorKind, PriceScale};
pub use timestamp::UtcDateTime;
