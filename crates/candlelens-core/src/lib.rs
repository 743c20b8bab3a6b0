//! # CandleLens Core
//!
//! Reconstructs a candle series from a rendered chart page and turns it into
//! a short-horizon trend call.
//!
//! ## Overview
//!
//! - **Page model** for serialized DOM text nodes and RGBA pixel surfaces
//! - **Extraction chain**: structured text, then pixel silhouettes, then
//!   synthetic demo candles, so a series is never empty
//! - **Local heuristic predictor** with an indicator snapshot
//! - **Remote inference client** over a pluggable HTTP transport
//! - **Analysis session** that coalesces overlapping cycles and publishes
//!   each insight to listeners
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Settings: defaults, JSON file, environment overrides |
//! | [`domain`] | Candle, ChartData, Insight and friends |
//! | [`error`] | Core error types |
//! | [`extract`] | Text, calibration, visual, demo, reconciliation |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`page`] | Page snapshot and structural selectors |
//! | [`predict`] | Local predictor and technical calculator |
//! | [`remote`] | Inference service client |
//! | [`session`] | Analysis cycle orchestration |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  PageSnapshot   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Reconciler    │────▶│ text │ visual │ demo │
//! └────────┬────────┘     └──────────────────┘
//!          │ ChartData
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ AnalysisSession │────▶│ InferenceClient  │
//! └────────┬────────┘     └────────┬─────────┘
//!          │ on failure            │
//!          ▼                       ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ LocalPredictor  │     │ HttpClient       │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use candlelens_core::{AnalysisSession, PageSnapshot, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let session = AnalysisSession::from_settings(settings);
//!     let page = PageSnapshot::load("page.json")?;
//!
//!     if let Some(report) = session.run_cycle(&page).await.report() {
//!         println!("{}", report.insight.explanation);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Extraction never fails: a miss is an empty result that moves the chain on.
//! Remote failures are classified by [`RemoteErrorKind`] and recovered locally
//! within the same cycle.

pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod page;
pub mod predict;
pub mod remote;
pub mod session;

pub use config::Settings;

pub use domain::{
    Candle, CandleVisual, ChartData, Direction, Impact, IndicatorData, IndicatorKind, Insight,
    MacdReading, NewsSentiment, Prediction, PriceScale, Probabilities, RiskLevel, SentimentLabel,
    TechnicalAnalysis, UtcDateTime, VolumeAnalysis, VolumeTrend,
};

pub use error::{CoreError, PublishError, ValidationError};

pub use extract::{
    ChartDataReconciler, DataOrigin, ExtractionContext, Reconciled, TextExtractor, VisualDetector,
};

pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

pub use page::{PageElement, PageSnapshot, Selector, Surface};

pub use predict::{LocalPredictor, TechnicalCalculator};

pub use remote::{HealthReport, InferenceClient, NewsDigest, RemoteError, RemoteErrorKind};

pub use session::{AnalysisSession, ChannelListener, CycleOutcome, CycleReport, InsightListener};
