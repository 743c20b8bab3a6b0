//! Candle reconstruction from rendered pixel data.
//!
//! The chart surface is cut into vertical stripes. Each stripe that holds
//! candle-green or candle-red pixels becomes one [`CandleVisual`], which the
//! price-axis calibration turns into a [`Candle`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::page::{PageSnapshot, PixelView, Selector, Surface};
use crate::{Candle, CandleVisual, PriceScale};

use super::calibration::calibrate;
use super::text::sanitize_symbol;
use super::ExtractionContext;

const CHART_SURFACE: [Selector; 3] = [
    Selector::AttrEquals("data-name", "pane-canvas"),
    Selector::ClassContains("chart-markup-table"),
    Selector::ClassContains("chart"),
];

/// Pixels with alpha below this are background.
const MIN_ALPHA: u8 = 128;
/// A channel must exceed this to count as a candle color.
const MIN_CHANNEL: u8 = 100;
/// Fraction of the wick span trimmed from each end to estimate the body.
/// Color alone cannot separate body from wick, so this stays an approximation.
const BODY_TRIM: f64 = 0.1;
/// One simulated minute per horizontal pixel.
const MILLIS_PER_PIXEL: i64 = 60_000;

/// Accessible label some hosts put on the chart canvas, e.g.
/// `Chart for NASDAQ:AAPL, 1D`.
static SURFACE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfor\s+([a-z0-9:._!-]+)(?:\s*,\s*([0-9]+[a-z]?|[a-z]))?")
        .expect("surface label pattern is valid")
});

/// Symbol and timeframe hints carried by the chart surface itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceLabels {
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandleColor {
    Green,
    Red,
}

fn classify([r, g, b, a]: [u8; 4]) -> Option<CandleColor> {
    if a < MIN_ALPHA {
        return None;
    }
    if g > r && g > b && g > MIN_CHANNEL {
        Some(CandleColor::Green)
    } else if r > g && r > b && r > MIN_CHANNEL {
        Some(CandleColor::Red)
    } else {
        None
    }
}

/// Stripe width used to partition a surface `surface_width` pixels wide.
pub fn stripe_width(surface_width: u32) -> u32 {
    (surface_width / 100).max(3)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VisualDetector;

impl VisualDetector {
    /// The chart's main pixel surface: first structural match, else the
    /// largest surface on the page.
    pub fn locate<'a>(&self, page: &'a PageSnapshot) -> Option<&'a Surface> {
        CHART_SURFACE
            .iter()
            .find_map(|selector| {
                page.surfaces
                    .iter()
                    .find(|surface| selector.matches_surface(surface))
            })
            .or_else(|| page.surfaces.iter().max_by_key(|surface| surface.area()))
    }

    /// Read symbol and timeframe hints from the located surface's
    /// `aria-label`. Pixels themselves carry neither.
    pub fn infer_labels(&self, page: &PageSnapshot) -> SurfaceLabels {
        let Some(label) = self
            .locate(page)
            .and_then(|surface| surface.attributes.get("aria-label"))
        else {
            return SurfaceLabels::default();
        };
        let Some(captures) = SURFACE_LABEL.captures(label) else {
            return SurfaceLabels::default();
        };

        SurfaceLabels {
            symbol: captures
                .get(1)
                .and_then(|found| sanitize_symbol(found.as_str())),
            timeframe: captures.get(2).map(|found| found.as_str().to_owned()),
        }
    }

    /// Detect candles on the page. A missing surface, unreadable pixels, or
    /// missing calibration all produce an empty result.
    pub fn detect(&self, page: &PageSnapshot, ctx: &ExtractionContext) -> Vec<Candle> {
        let Some(surface) = self.locate(page) else {
            debug!("no chart surface on page");
            return Vec::new();
        };
        let Some(view) = surface.pixel_view() else {
            debug!(
                width = surface.width,
                height = surface.height,
                "chart surface has no readable pixel data"
            );
            return Vec::new();
        };
        let Some(scale) = calibrate(page) else {
            return Vec::new();
        };

        let now = ctx.now.unix_millis();
        scan_stripes(&view)
            .iter()
            .filter_map(|visual| visual_to_candle(visual, scale, view.height, now))
            .collect()
    }
}

/// Scan every stripe left to right and keep those containing candle colors
/// over more than one row.
pub fn scan_stripes(view: &PixelView<'_>) -> Vec<CandleVisual> {
    let width = stripe_width(view.width);
    let mut visuals = Vec::new();

    let mut x = 0;
    while x < view.width {
        let end = (x + width).min(view.width);
        if let Some(visual) = scan_stripe(view, x, end) {
            visuals.push(visual);
        }
        x = end;
    }

    visuals
}

fn scan_stripe(view: &PixelView<'_>, start: u32, end: u32) -> Option<CandleVisual> {
    let mut top: Option<u32> = None;
    let mut bottom = 0;
    let mut green = 0usize;
    let mut red = 0usize;

    for y in 0..view.height {
        for x in start..end {
            let Some(color) = classify(view.rgba(x, y)) else {
                continue;
            };
            match color {
                CandleColor::Green => green += 1,
                CandleColor::Red => red += 1,
            }
            top.get_or_insert(y);
            bottom = y;
        }
    }

    let top = top?;
    if top == bottom {
        return None;
    }

    let span = f64::from(bottom - top);
    Some(CandleVisual {
        x: start,
        width: end - start,
        top,
        bottom,
        body_top: f64::from(top) + span * BODY_TRIM,
        body_bottom: f64::from(bottom) - span * BODY_TRIM,
        is_bullish: green > red,
    })
}

/// Convert a silhouette to a candle. Volume is unrecoverable from color and
/// is always zero; the timestamp is `now - x` simulated minutes.
pub fn visual_to_candle(
    visual: &CandleVisual,
    scale: PriceScale,
    height: u32,
    now_millis: i64,
) -> Option<Candle> {
    let height = f64::from(height);
    let price = |y: f64| scale.price_at(y, height);

    let body_upper = price(visual.body_top);
    let body_lower = price(visual.body_bottom);
    let (open, close) = if visual.is_bullish {
        (body_lower, body_upper)
    } else {
        (body_upper, body_lower)
    };
    let timestamp = now_millis - i64::from(visual.x) * MILLIS_PER_PIXEL;

    match Candle::new(
        timestamp,
        open,
        price(f64::from(visual.top)),
        price(f64::from(visual.bottom)),
        close,
        0.0,
    ) {
        Ok(candle) => Some(candle),
        Err(error) => {
            debug!(%error, x = visual.x, "stripe does not map to a valid candle");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: [u8; 4] = [20, 200, 60, 255];
    const RED: [u8; 4] = [220, 40, 40, 255];

    fn paint(width: u32, height: u32, fills: &[(u32, u32, u32, [u8; 4])]) -> Vec<u8> {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for &(x, y_from, y_to, color) in fills {
            for y in y_from..=y_to {
                let offset = ((y * width + x) * 4) as usize;
                pixels[offset..offset + 4].copy_from_slice(&color);
            }
        }
        pixels
    }

    #[test]
    fn stripe_width_has_a_floor_of_three() {
        assert_eq!(stripe_width(120), 3);
        assert_eq!(stripe_width(800), 8);
    }

    #[test]
    fn classifies_candle_colors() {
        assert_eq!(classify(GREEN), Some(CandleColor::Green));
        assert_eq!(classify(RED), Some(CandleColor::Red));
        assert_eq!(classify([20, 200, 60, 100]), None);
        assert_eq!(classify([90, 95, 20, 255]), None);
        assert_eq!(classify([128, 128, 128, 255]), None);
    }

    #[test]
    fn finds_one_silhouette_per_colored_stripe() {
        let surface = Surface::new(
            9,
            100,
            paint(9, 100, &[(1, 10, 50, GREEN), (4, 40, 40, RED), (7, 20, 90, RED)]),
        )
        .expect("valid buffer");
        let view = surface.pixel_view().expect("readable");

        let visuals = scan_stripes(&view);
        assert_eq!(visuals.len(), 2, "single-row stripe is dropped");

        assert_eq!(visuals[0].x, 0);
        assert_eq!(visuals[0].top, 10);
        assert_eq!(visuals[0].bottom, 50);
        assert_eq!(visuals[0].body_top, 14.0);
        assert_eq!(visuals[0].body_bottom, 46.0);
        assert!(visuals[0].is_bullish);

        assert_eq!(visuals[1].x, 6);
        assert!(!visuals[1].is_bullish);
    }

    #[test]
    fn majority_color_decides_direction() {
        let surface = Surface::new(
            3,
            40,
            paint(3, 40, &[(0, 0, 9, GREEN), (1, 5, 39, RED)]),
        )
        .expect("valid buffer");
        let visuals = scan_stripes(&surface.pixel_view().expect("readable"));

        assert_eq!(visuals.len(), 1);
        assert_eq!(visuals[0].top, 0);
        assert_eq!(visuals[0].bottom, 39);
        assert!(!visuals[0].is_bullish);
    }

    #[test]
    fn bullish_visual_opens_at_body_bottom() {
        let visual = CandleVisual {
            x: 3,
            width: 3,
            top: 0,
            bottom: 100,
            body_top: 10.0,
            body_bottom: 90.0,
            is_bullish: true,
        };
        let scale = PriceScale { min: 100.0, max: 200.0 };

        let candle = visual_to_candle(&visual, scale, 100, 1_000_000).expect("valid candle");
        assert_eq!(candle.high, 200.0);
        assert_eq!(candle.low, 100.0);
        assert!((candle.open - 110.0).abs() < 1e-9);
        assert!((candle.close - 190.0).abs() < 1e-9);
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.timestamp, 1_000_000 - 3 * 60_000);

        let bearish = CandleVisual {
            is_bullish: false,
            ..visual
        };
        let candle = visual_to_candle(&bearish, scale, 100, 0).expect("valid candle");
        assert!(candle.open > candle.close);
    }

    #[test]
    fn reads_symbol_hint_from_surface_label() {
        let surface = Surface::unreadable(300, 200)
            .with_class("chart-gui")
            .with_attr("aria-label", "Chart for BINANCE:BTCUSDT, 4h");
        let page = PageSnapshot::default().with_surface(surface);

        let labels = VisualDetector.infer_labels(&page);
        assert_eq!(labels.symbol.as_deref(), Some("BINANCE:BTCUSDT"));
        assert_eq!(labels.timeframe.as_deref(), Some("4h"));
        assert_eq!(
            VisualDetector.infer_labels(&PageSnapshot::default()),
            SurfaceLabels::default()
        );
    }

    #[test]
    fn locates_largest_surface_without_structural_match() {
        let page = PageSnapshot::default()
            .with_surface(Surface::unreadable(10, 10))
            .with_surface(Surface::unreadable(300, 200))
            .with_surface(Surface::unreadable(40, 40));

        let surface = VisualDetector.locate(&page).expect("surface present");
        assert_eq!(surface.width, 300);
    }
}
