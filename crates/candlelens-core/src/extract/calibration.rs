use tracing::debug;

use crate::page::{PageSnapshot, Selector};
use crate::PriceScale;

const AXIS_LABELS: [Selector; 3] = [
    Selector::AttrEquals("data-name", "price-axis-label"),
    Selector::ClassContains("price-axis"),
    Selector::ClassContains("priceAxis"),
];

/// Derive a pixel-to-price scale from the price-axis labels.
///
/// Returns `None` unless at least two labels parse; callers treat that as
/// "calibration unavailable" and skip visual detection.
pub fn calibrate(page: &PageSnapshot) -> Option<PriceScale> {
    let values = page
        .first_matching_group(&AXIS_LABELS)
        .into_iter()
        .filter_map(|element| parse_axis_label(&element.text))
        .collect::<Vec<_>>();

    if values.len() < 2 {
        debug!(parsed = values.len(), "price axis calibration unavailable");
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(PriceScale { min, max })
}

/// Strip everything but digits, `.` and `-`, then parse.
pub fn parse_axis_label(text: &str) -> Option<f64> {
    let numeric: String = text
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
        .collect();
    numeric.parse::<f64>().ok().filter(|value| value.is_finite())
}
