//! Rule-based trend call used when no remote model answers.

use tracing::debug;

use crate::{
    Candle, ChartData, Direction, Insight, Prediction, Probabilities, RiskLevel, UtcDateTime,
    VolumeTrend,
};

use super::technical::TechnicalCalculator;

pub const WINDOW: usize = 10;
const MOMENTUM_THRESHOLD: f64 = 0.02;
const CONFIDENCE_BASE: f64 = 70.0;
const CONFIDENCE_PER_CANDLE: f64 = 3.0;
const CONFIDENCE_CAP: f64 = 85.0;
const NEUTRAL_CONFIDENCE: f64 = 50.0;
const NEUTRAL_FLOOR: f64 = 5.0;

pub const DEMO_MODE_WARNING: &str =
    "Demo mode: backend not connected, showing local heuristic analysis";
pub const OVERBOUGHT_WARNING: &str = "RSI above 70: overbought, reversal risk";
pub const OVERSOLD_WARNING: &str = "RSI below 30: oversold, reversal risk";
pub const LOW_VOLUME_WARNING: &str = "Low volume may not support directional move";

/// Counts and momentum over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub size: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub momentum: f64,
}

impl WindowStats {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let window = &candles[candles.len().saturating_sub(WINDOW)..];
        let bullish = window.iter().filter(|candle| candle.is_bullish()).count();
        let bearish = window.iter().filter(|candle| candle.is_bearish()).count();

        let momentum = match (window.first(), window.last()) {
            (Some(first), Some(last)) if window.len() > 1 && first.close > 0.0 => {
                (last.close - first.close) / first.close
            }
            _ => 0.0,
        };

        Self {
            size: window.len(),
            bullish,
            bearish,
            momentum,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.momentum > MOMENTUM_THRESHOLD && self.bullish > self.bearish {
            Direction::Bullish
        } else if self.momentum < -MOMENTUM_THRESHOLD && self.bearish > self.bullish {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn confidence(&self, direction: Direction) -> f64 {
        let count = match direction {
            Direction::Bullish => self.bullish,
            Direction::Bearish => self.bearish,
            Direction::Neutral => return NEUTRAL_CONFIDENCE,
        };
        (CONFIDENCE_BASE + CONFIDENCE_PER_CANDLE * count as f64).min(CONFIDENCE_CAP)
    }

    /// Laplace-smoothed class split. The neutral share is floored at 5 and
    /// the excess is taken from the larger directional class (split evenly on
    /// a tie), so the three always sum to 100.
    pub fn probabilities(&self) -> Probabilities {
        let total = (self.bullish + self.bearish + 2) as f64;
        let mut bullish = ((self.bullish + 1) as f64 / total * 100.0).round();
        let mut bearish = ((self.bearish + 1) as f64 / total * 100.0).round();
        let mut neutral = 100.0 - bullish - bearish;

        if neutral < NEUTRAL_FLOOR {
            let excess = NEUTRAL_FLOOR - neutral;
            neutral = NEUTRAL_FLOOR;
            if bullish > bearish {
                bullish -= excess;
            } else if bearish > bullish {
                bearish -= excess;
            } else {
                let half = (excess / 2.0).floor();
                bullish -= half;
                bearish -= excess - half;
            }
        }

        Probabilities {
            bullish,
            bearish,
            neutral,
        }
    }

    fn pattern(&self) -> &'static str {
        if self.bullish > self.bearish {
            "bullish candles dominating"
        } else if self.bearish > self.bullish {
            "bearish candles dominating"
        } else {
            "mixed signals"
        }
    }

    fn momentum_words(&self) -> &'static str {
        if self.momentum > 0.0 {
            "positive"
        } else if self.momentum < 0.0 {
            "negative"
        } else {
            "flat"
        }
    }
}

/// Synchronous, I/O-free predictor. Always returns a complete [`Insight`],
/// including for empty or single-candle input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPredictor {
    technical: TechnicalCalculator,
}

impl LocalPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predict(&self, data: &ChartData, now: UtcDateTime) -> Insight {
        let stats = WindowStats::from_candles(&data.candles);
        let direction = stats.direction();
        let confidence = stats.confidence(direction);
        let probabilities = stats.probabilities();
        let technical_analysis = self.technical.calculate(&data.candles);

        let mut warnings = vec![String::from(DEMO_MODE_WARNING)];
        match technical_analysis.rsi {
            Some(rsi) if rsi > 70.0 => warnings.push(String::from(OVERBOUGHT_WARNING)),
            Some(rsi) if rsi < 30.0 => warnings.push(String::from(OVERSOLD_WARNING)),
            _ => {}
        }
        let fading_volume = technical_analysis
            .volume_analysis
            .is_some_and(|volume| volume.trend == VolumeTrend::Decreasing);
        if fading_volume && direction != Direction::Neutral {
            warnings.push(String::from(LOW_VOLUME_WARNING));
        }

        debug!(
            symbol = %data.symbol,
            direction = direction.as_str(),
            confidence,
            bullish = stats.bullish,
            bearish = stats.bearish,
            momentum = stats.momentum,
            "local prediction computed"
        );

        let timestamp = now.unix_millis();
        Insight {
            prediction: Prediction {
                direction,
                confidence,
                probabilities,
                timestamp,
            },
            technical_analysis,
            sentiment: None,
            explanation: explain(&stats, direction, confidence),
            risk_level: RiskLevel::from_confidence(confidence),
            warnings,
            generated_at: timestamp,
        }
    }
}

fn explain(stats: &WindowStats, direction: Direction, confidence: f64) -> String {
    let lead = match direction {
        Direction::Bullish => "Upward bias",
        Direction::Bearish => "Downward bias",
        Direction::Neutral => "No clear trend",
    };
    format!(
        "{lead}: {} with {} momentum ({:+.2}%) over the last {} candles. \
         Confidence {confidence:.0}%.",
        stats.pattern(),
        stats.momentum_words(),
        stats.momentum * 100.0,
        stats.size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1_000.0,
        }
    }

    fn stats(bullish: usize, bearish: usize, momentum: f64) -> WindowStats {
        WindowStats {
            size: bullish + bearish,
            bullish,
            bearish,
            momentum,
        }
    }

    #[test]
    fn window_uses_last_ten_candles() {
        let mut candles = vec![candle(10.0, 5.0); 5];
        candles.extend((0..10).map(|step| candle(100.0 + step as f64, 101.0 + step as f64)));

        let stats = WindowStats::from_candles(&candles);
        assert_eq!(stats.size, 10);
        assert_eq!(stats.bullish, 10);
        assert_eq!(stats.bearish, 0);
        assert!((stats.momentum - 9.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn classification_needs_momentum_and_majority() {
        assert_eq!(stats(6, 4, 0.03).direction(), Direction::Bullish);
        assert_eq!(stats(6, 4, 0.02).direction(), Direction::Neutral);
        assert_eq!(stats(4, 6, 0.03).direction(), Direction::Neutral);
        assert_eq!(stats(3, 7, -0.05).direction(), Direction::Bearish);
        assert_eq!(stats(5, 5, -0.05).direction(), Direction::Neutral);
    }

    #[test]
    fn confidence_is_capped() {
        assert_eq!(stats(4, 1, 0.1).confidence(Direction::Bullish), 82.0);
        assert_eq!(stats(6, 1, 0.1).confidence(Direction::Bullish), 85.0);
        assert_eq!(stats(1, 2, -0.1).confidence(Direction::Bearish), 76.0);
        assert_eq!(stats(9, 1, 0.0).confidence(Direction::Neutral), 50.0);
    }

    #[test]
    fn probabilities_floor_neutral_and_sum_to_hundred() {
        let all_bullish = stats(10, 0, 0.05).probabilities();
        assert_eq!(all_bullish.bullish, 87.0);
        assert_eq!(all_bullish.bearish, 8.0);
        assert_eq!(all_bullish.neutral, 5.0);

        let empty = stats(0, 0, 0.0).probabilities();
        assert_eq!(empty.bullish, 48.0);
        assert_eq!(empty.bearish, 47.0);
        assert_eq!(empty.neutral, 5.0);

        for bullish in 0..=10 {
            for bearish in 0..=(10 - bullish) {
                let split = stats(bullish, bearish, 0.0).probabilities();
                assert_eq!(split.total(), 100.0);
                assert!(split.bullish >= 5.0 && split.bearish >= 5.0 && split.neutral >= 5.0);
            }
        }
    }

    #[test]
    fn empty_series_yields_neutral_insight() {
        let data = ChartData::new("X", "1D", Vec::new());
        let insight = LocalPredictor::new().predict(&data, UtcDateTime::now());

        assert_eq!(insight.prediction.direction, Direction::Neutral);
        assert_eq!(insight.prediction.confidence, 50.0);
        assert_eq!(insight.risk_level, RiskLevel::High);
        assert_eq!(insight.warnings, vec![String::from(DEMO_MODE_WARNING)]);
        assert!(insight.explanation.contains("mixed signals"));
    }

    #[test]
    fn strong_uptrend_warns_about_overbought_rsi() {
        let candles = (0..20)
            .map(|step| candle(100.0 + step as f64, 101.0 + step as f64))
            .collect::<Vec<_>>();
        let data = ChartData::new("X", "1D", candles);
        let insight = LocalPredictor::new().predict(&data, UtcDateTime::now());

        assert_eq!(insight.prediction.direction, Direction::Bullish);
        assert_eq!(insight.prediction.confidence, 85.0);
        assert_eq!(insight.risk_level, RiskLevel::Low);
        assert_eq!(
            insight.warnings,
            vec![String::from(DEMO_MODE_WARNING), String::from(OVERBOUGHT_WARNING)]
        );
        assert!(insight.explanation.starts_with("Upward bias: bullish candles dominating"));
        assert!(insight.explanation.ends_with("Confidence 85%."));
    }
}
