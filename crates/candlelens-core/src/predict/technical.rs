//! Indicator snapshot computed from a candle series.

use std::collections::BTreeMap;

use crate::{Candle, MacdReading, TechnicalAnalysis, VolumeAnalysis, VolumeTrend};

pub const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
/// The signal line is approximated from the latest MACD value instead of a
/// full EMA of the MACD series.
const SIGNAL_FACTOR: f64 = 0.9;
const EMA_PERIODS: [usize; 4] = [9, 20, 50, 200];
const SMA_PERIODS: [usize; 3] = [20, 50, 200];
const RECENT_VOLUME_WINDOW: usize = 5;
const BASELINE_VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalCalculator;

impl TechnicalCalculator {
    pub fn calculate(&self, candles: &[Candle]) -> TechnicalAnalysis {
        let closes = candles.iter().map(|candle| candle.close).collect::<Vec<_>>();
        let volumes = candles.iter().map(|candle| candle.volume).collect::<Vec<_>>();

        TechnicalAnalysis {
            rsi: Some(rsi(&closes, RSI_PERIOD)),
            macd: Some(macd(&closes)),
            ema: non_empty(
                EMA_PERIODS
                    .iter()
                    .filter(|period| closes.len() >= **period)
                    .map(|period| (*period as u32, round_to(ema(&closes, *period), 4)))
                    .collect(),
            ),
            sma: non_empty(
                SMA_PERIODS
                    .iter()
                    .filter(|period| closes.len() >= **period)
                    .map(|period| {
                        let window = &closes[closes.len() - period..];
                        (*period as u32, round_to(mean(window), 4))
                    })
                    .collect(),
            ),
            volume_analysis: Some(volume_analysis(&volumes)),
        }
    }
}

/// Simple-average RSI over the last `period` changes; 50 when there are not
/// enough closes, 100 when nothing declined.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    if losses == 0.0 {
        return 100.0;
    }

    let relative_strength = gains / losses;
    round_to(100.0 - 100.0 / (1.0 + relative_strength), 2)
}

pub fn macd(closes: &[f64]) -> MacdReading {
    if closes.len() < MACD_SLOW + MACD_SIGNAL {
        return MacdReading {
            macd: 0.0,
            signal: 0.0,
            histogram: 0.0,
        };
    }

    let line = ema(closes, MACD_FAST) - ema(closes, MACD_SLOW);
    let signal = line * SIGNAL_FACTOR;
    MacdReading {
        macd: round_to(line, 4),
        signal: round_to(signal, 4),
        histogram: round_to(line - signal, 4),
    }
}

/// EMA seeded with the SMA of the first `period` values. Shorter input
/// returns the last value, or zero when empty.
pub fn ema(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return values.last().copied().unwrap_or(0.0);
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    values[period..]
        .iter()
        .fold(mean(&values[..period]), |ema, value| {
            value * multiplier + ema * (1.0 - multiplier)
        })
}

pub fn volume_analysis(volumes: &[f64]) -> VolumeAnalysis {
    if volumes.len() < RECENT_VOLUME_WINDOW {
        return VolumeAnalysis {
            trend: VolumeTrend::Stable,
            ratio: 1.0,
            recent_average: None,
            overall_average: None,
        };
    }

    let recent = mean(&volumes[volumes.len() - RECENT_VOLUME_WINDOW..]);
    let baseline = mean(&volumes[volumes.len().saturating_sub(BASELINE_VOLUME_WINDOW)..]);
    let ratio = if baseline > 0.0 { recent / baseline } else { 1.0 };

    let trend = if ratio > 1.2 {
        VolumeTrend::Increasing
    } else if ratio < 0.8 {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Stable
    };

    VolumeAnalysis {
        trend,
        ratio: round_to(ratio, 2),
        recent_average: Some(round_to(recent, 2)),
        overall_average: Some(round_to(baseline, 2)),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn non_empty(map: BTreeMap<u32, f64>) -> Option<BTreeMap<u32, f64>> {
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(index, close)| Candle {
                timestamp: index as i64,
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume,
            })
            .collect()
    }

    #[test]
    fn rsi_defaults_to_neutral_on_short_input() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], RSI_PERIOD), 50.0);
        assert_eq!(rsi(&[], RSI_PERIOD), 50.0);
    }

    #[test]
    fn rsi_saturates_without_losses() {
        let closes = (1..=15).map(f64::from).collect::<Vec<_>>();
        assert_eq!(rsi(&closes, RSI_PERIOD), 100.0);
    }

    #[test]
    fn rsi_balances_equal_moves() {
        let closes = (0..15)
            .map(|index| if index % 2 == 0 { 10.0 } else { 11.0 })
            .collect::<Vec<_>>();
        assert_eq!(rsi(&closes, RSI_PERIOD), 50.0);
    }

    #[test]
    fn ema_of_constant_series_is_constant() {
        assert_eq!(ema(&[5.0; 30], 9), 5.0);
        assert_eq!(ema(&[1.0, 2.0], 9), 2.0);
        assert_eq!(ema(&[], 9), 0.0);
    }

    #[test]
    fn macd_needs_thirty_five_closes() {
        let short = macd(&[1.0; 34]);
        assert_eq!(short.macd, 0.0);

        let rising = (1..=40).map(f64::from).collect::<Vec<_>>();
        let reading = macd(&rising);
        assert!(reading.macd > 0.0);
        assert!((reading.signal - round_to(reading.macd * 0.9, 4)).abs() < 1e-3);
    }

    #[test]
    fn volume_trend_compares_recent_to_baseline() {
        let mut volumes = vec![100.0; 15];
        volumes.extend([300.0; 5]);
        let analysis = volume_analysis(&volumes);
        assert_eq!(analysis.trend, VolumeTrend::Increasing);
        assert_eq!(analysis.ratio, 2.0);
        assert_eq!(analysis.overall_average, Some(150.0));

        let mut fading = vec![100.0; 15];
        fading.extend([10.0; 5]);
        assert_eq!(volume_analysis(&fading).trend, VolumeTrend::Decreasing);

        assert_eq!(volume_analysis(&[1.0, 2.0]).trend, VolumeTrend::Stable);
    }

    #[test]
    fn periods_are_omitted_until_enough_data() {
        let analysis = TechnicalCalculator.calculate(&candles_from_closes(&[10.0; 25], 1.0));
        let ema = analysis.ema.expect("ema present");
        assert_eq!(ema.keys().copied().collect::<Vec<_>>(), vec![9, 20]);
        let sma = analysis.sma.expect("sma present");
        assert_eq!(sma.get(&20), Some(&10.0));

        let empty = TechnicalCalculator.calculate(&[]);
        assert_eq!(empty.rsi, Some(50.0));
        assert!(empty.ema.is_none());
        assert!(empty.sma.is_none());
    }
}
