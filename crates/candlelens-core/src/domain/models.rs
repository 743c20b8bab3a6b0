use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// OHLCV price bar for one time bucket.
///
/// `timestamp` is unix milliseconds. Construction through [`Candle::new`]
/// enforces `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidCandleBounds);
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Indicator family a legend reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Momentum,
    Trend,
    Volume,
    Volatility,
}

impl IndicatorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::Trend => "trend",
            Self::Volume => "volume",
            Self::Volatility => "volatility",
        }
    }

    /// Classify an indicator by the name shown in its legend.
    pub fn infer(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        let has = |needle: &str| {
            upper
                .split(|ch: char| !ch.is_ascii_alphanumeric())
                .any(|word| word == needle)
        };

        const MOMENTUM: [&str; 8] = [
            "RSI", "STOCH", "STOCHRSI", "CCI", "MFI", "MOM", "ROC", "MACD",
        ];
        const VOLUME: [&str; 3] = ["VOL", "VOLUME", "OBV"];
        const VOLATILITY: [&str; 5] = ["BB", "BBANDS", "ATR", "BOLLINGER", "KC"];

        if MOMENTUM.iter().any(|needle| has(needle)) {
            Self::Momentum
        } else if VOLUME.iter().any(|needle| has(needle)) {
            Self::Volume
        } else if VOLATILITY.iter().any(|needle| has(needle)) || upper.contains("KELTNER") {
            Self::Volatility
        } else {
            Self::Trend
        }
    }
}

/// Raw numeric readings scraped from one indicator legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorData {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl IndicatorData {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        let name = name.into();
        Self {
            kind: IndicatorKind::infer(&name),
            name,
            values,
        }
    }
}

/// Reconstructed price series handed to a predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub symbol: String,
    pub timeframe: String,
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub indicators: Vec<IndicatorData>,
}

impl ChartData {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        candles: Vec<Candle>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            candles,
            indicators: Vec::new(),
        }
    }

    pub fn with_indicators(mut self, indicators: Vec<IndicatorData>) -> Self {
        self.indicators = indicators;
        self
    }
}

/// Linear pixel-to-price calibration read off the price axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScale {
    pub min: f64,
    pub max: f64,
}

impl PriceScale {
    /// Price at pixel row `y` of a surface `height` rows tall. Row 0 is the top
    /// of the surface and maps to `max`.
    pub fn price_at(&self, y: f64, height: f64) -> f64 {
        if height <= 0.0 {
            return self.min;
        }
        self.min + (1.0 - y / height) * (self.max - self.min)
    }
}

/// Silhouette of one pixel stripe that contained candle-colored pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleVisual {
    pub x: u32,
    pub width: u32,
    pub top: u32,
    pub bottom: u32,
    pub body_top: f64,
    pub body_bottom: f64,
    pub is_bullish: bool,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
