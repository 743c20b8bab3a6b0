//! Placeholder candles used when nothing could be read off the page.

use crate::{Candle, UtcDateTime};

pub const DEMO_CANDLE_COUNT: usize = 31;

const BASE_PRICE: f64 = 100.0;
/// Per-candle upward drift.
const DRIFT: f64 = 0.002;
/// Full width of the uniform noise band around the drift.
const NOISE: f64 = 0.04;
/// Maximum wick extension beyond the body, as a fraction of price.
const WICK: f64 = 0.01;

/// Biased random walk of daily candles ending at `now`, oldest first.
pub fn synthesize(now: UtcDateTime, rng: &mut fastrand::Rng) -> Vec<Candle> {
    let mut price = BASE_PRICE;
    let mut candles = Vec::with_capacity(DEMO_CANDLE_COUNT);

    for index in 0..DEMO_CANDLE_COUNT {
        let days_back = (DEMO_CANDLE_COUNT - 1 - index) as i64;
        let open = price;
        let change = DRIFT + (rng.f64() - 0.5) * NOISE;
        let close = (open * (1.0 + change)).max(0.01);
        let high = open.max(close) * (1.0 + rng.f64() * WICK);
        let low = open.min(close) * (1.0 - rng.f64() * WICK);
        let volume = (1_000_000.0 + rng.f64() * 4_000_000.0).round();

        // low <= min(open, close) <= max(open, close) <= high by construction
        candles.push(Candle {
            timestamp: now.minus_days(days_back).unix_millis(),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }

    candles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_daily_candles_ending_now() {
        let now = UtcDateTime::parse("2024-03-01T00:00:00Z").expect("timestamp");
        let candles = synthesize(now, &mut fastrand::Rng::with_seed(7));

        assert_eq!(candles.len(), DEMO_CANDLE_COUNT);
        assert_eq!(candles.last().map(|c| c.timestamp), Some(now.unix_millis()));
        for pair in candles.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, 86_400_000);
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn every_candle_respects_bounds() {
        let now = UtcDateTime::now();
        for seed in 0..50 {
            for candle in synthesize(now, &mut fastrand::Rng::with_seed(seed)) {
                assert!(candle.low <= candle.open.min(candle.close));
                assert!(candle.open.max(candle.close) <= candle.high);
                assert!(candle.low > 0.0);
                assert!(Candle::new(
                    candle.timestamp,
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume
                )
                .is_ok());
            }
        }
    }
}
