//! # Chart Extraction
//!
//! Turns a [`PageSnapshot`](crate::page::PageSnapshot) into [`ChartData`](crate::ChartData).
//!
//! | Module | Role |
//! |--------|------|
//! | [`text`] | OHLCV, indicators, symbol, and timeframe from legend text |
//! | [`calibration`] | Pixel-to-price scale from axis labels |
//! | [`visual`] | Candle silhouettes from pixel colors |
//! | [`demo`] | Synthetic placeholder candles |
//! | [`reconcile`] | Priority chain over the producers above |
//!
//! Nothing in this module returns an error: a miss at any layer is an empty
//! result that moves the chain on to the next producer.

pub mod calibration;
pub mod demo;
pub mod reconcile;
pub mod text;
pub mod visual;

use crate::UtcDateTime;

pub use calibration::calibrate;
pub use reconcile::{ChartDataReconciler, DataOrigin, Reconciled};
pub use text::{TextExtraction, TextExtractor};
pub use visual::VisualDetector;

/// Inputs shared by every producer in one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionContext {
    /// Instant stamped on candles read from live legends.
    pub now: UtcDateTime,
}

impl ExtractionContext {
    pub fn now() -> Self {
        Self::at(UtcDateTime::now())
    }

    pub const fn at(now: UtcDateTime) -> Self {
        Self { now }
    }
}
