//! Structured-text extraction from legends, tooltips, and the data window.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::page::{PageElement, PageSnapshot, Selector};
use crate::{Candle, IndicatorData};

use super::ExtractionContext;

/// Main-series legend, first structural match wins.
const SERIES_LEGEND: [Selector; 3] = [
    Selector::AttrEquals("data-name", "legend-series-item"),
    Selector::ClassContains("legend-series"),
    Selector::ClassContains("legendMainSourceWrapper"),
];

const CROSSHAIR_TOOLTIP: [Selector; 2] = [
    Selector::ClassContains("floating-tooltip"),
    Selector::All(&[Selector::ClassContains("tooltip"), Selector::Attr("data-ohlc")]),
];

const DATA_WINDOW: [Selector; 3] = [
    Selector::AttrEquals("data-name", "data-window"),
    Selector::Class("chart-data-window"),
    Selector::ClassContains("dataWindow"),
];

const PRICE_REGIONS: [&[Selector]; 3] = [&SERIES_LEGEND, &CROSSHAIR_TOOLTIP, &DATA_WINDOW];

const STUDY_LEGEND: [Selector; 2] = [
    Selector::AttrEquals("data-name", "legend-study-item"),
    Selector::ClassContains("legend-study"),
];

const FULL_SYMBOL_ATTR: &str = "data-symbol-full";

const SYMBOL_HEADER: [Selector; 3] = [
    Selector::AttrEquals("id", "header-toolbar-symbol-search"),
    Selector::AttrContains("data-name", "symbol-search"),
    Selector::ClassContains("symbolHeader"),
];

const SYMBOL_TITLE: [Selector; 2] = [
    Selector::ClassContains("symbol-title"),
    Selector::All(&[Selector::ClassContains("symbol"), Selector::ClassContains("title")]),
];

const ACTIVE_INTERVAL: [Selector; 3] = [
    Selector::All(&[Selector::Attr("data-value"), Selector::ClassContains("isActive")]),
    Selector::All(&[
        Selector::Tag("button"),
        Selector::AttrEquals("data-role", "interval"),
        Selector::AttrEquals("aria-checked", "true"),
    ]),
    Selector::AttrEquals("data-name", "header-toolbar-intervals"),
];

const MAX_SYMBOL_LEN: usize = 20;

static PRICE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(open|high|low|close|[ohlc])",
        r"\s*[:=]?\s*([0-9][0-9,]*(?:\.[0-9]+)?|\.[0-9]+)"
    ))
        .expect("price token pattern is valid")
});

static VOLUME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:vol(?:ume)?|v)\s*[:=]?\s*([0-9][0-9,]*(?:\.[0-9]+)?\s*[kmb]?)")
        .expect("volume token pattern is valid")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?[0-9][0-9,]*(?:\.[0-9]+)?").expect("number pattern is valid")
});

static TITLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]+").expect("title prefix pattern is valid"));

/// Everything the text layer could read off the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextExtraction {
    pub candles: Vec<Candle>,
    pub indicators: Vec<IndicatorData>,
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
}

/// Reads OHLCV candles, indicator readings, symbol, and timeframe from text
/// nodes. Never fails; anything it cannot find comes back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn extract(&self, page: &PageSnapshot, ctx: &ExtractionContext) -> TextExtraction {
        TextExtraction {
            candles: self.candles(page, ctx),
            indicators: self.indicators(page),
            symbol: resolve_symbol(page),
            timeframe: resolve_timeframe(page),
        }
    }

    pub fn candles(&self, page: &PageSnapshot, ctx: &ExtractionContext) -> Vec<Candle> {
        let timestamp = ctx.now.unix_millis();
        let mut candles = Vec::new();

        for region in PRICE_REGIONS {
            for element in page.first_matching_group(region) {
                match parse_ohlcv(&element.text, timestamp) {
                    Some(candle) => candles.push(candle),
                    None => debug!(text = %element.text, "legend region has no usable OHLC values"),
                }
            }
        }

        candles
    }

    pub fn indicators(&self, page: &PageSnapshot) -> Vec<IndicatorData> {
        page.first_matching_group(&STUDY_LEGEND)
            .into_iter()
            .filter_map(parse_indicator)
            .collect()
    }
}

/// Parse one legend text into a candle. All four price tokens must be present
/// and non-negative; volume falls back to zero.
pub fn parse_ohlcv(text: &str, timestamp: i64) -> Option<Candle> {
    let mut prices: [Option<f64>; 4] = [None; 4];

    for captures in PRICE_TOKEN.captures_iter(text) {
        let (Some(whole), Some(label), Some(value)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        if preceded_by_letter(text, whole.start()) {
            continue;
        }

        // Word labels share their slot with the leading letter.
        let slot = match label.as_str().chars().next().map(|ch| ch.to_ascii_lowercase()) {
            Some('o') => 0,
            Some('h') => 1,
            Some('l') => 2,
            _ => 3,
        };
        if prices[slot].is_none() {
            prices[slot] = Some(parse_price(value.as_str())?);
        }
    }

    let [Some(open), Some(high), Some(low), Some(close)] = prices else {
        return None;
    };

    let volume = VOLUME_TOKEN
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            if preceded_by_letter(text, whole.start()) {
                return None;
            }
            captures.get(1).map(|value| parse_volume(value.as_str()))
        })
        .next()
        .unwrap_or(0.0);

    match Candle::new(timestamp, open, high, low, close, volume) {
        Ok(candle) => Some(candle),
        Err(error) => {
            debug!(%error, "legend values violate candle bounds");
            None
        }
    }
}

/// Parse a price, allowing comma thousands separators. Negative or
/// non-finite values are rejected.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|ch| *ch != ',').collect();
    let value = cleaned.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Parse a volume reading such as `1.5M`, `2,300`, or `870k`. Anything
/// malformed reads as zero.
pub fn parse_volume(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();

    let (digits, multiplier) = match cleaned.chars().last().map(|ch| ch.to_ascii_uppercase()) {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value * multiplier,
        _ => 0.0,
    }
}

fn parse_indicator(element: &PageElement) -> Option<IndicatorData> {
    let text = element.text.replace('\u{2212}', "-");
    let first_number = NUMBER.find(&text).map(|found| found.start()).unwrap_or(text.len());

    let name = element
        .attr("data-title")
        .map(str::to_owned)
        .unwrap_or_else(|| text[..first_number].trim().to_owned());
    if name.is_empty() {
        return None;
    }

    let values = NUMBER
        .find_iter(&text[first_number..])
        .filter_map(|found| found.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();
    if values.is_empty() {
        return None;
    }

    Some(IndicatorData::new(name, values))
}

/// Resolve the chart symbol: explicit full-symbol attribute, symbol header,
/// generic symbol title, then the page-title prefix.
pub fn resolve_symbol(page: &PageSnapshot) -> Option<String> {
    let explicit = page
        .elements
        .iter()
        .find_map(|element| element.attr(FULL_SYMBOL_ATTR))
        .map(str::to_owned);
    let header = page.first_match(&SYMBOL_HEADER).map(|element| element.text.clone());
    let title = page.first_match(&SYMBOL_TITLE).map(|element| element.text.clone());
    let prefix = TITLE_PREFIX
        .find(page.title.trim_start())
        .map(|found| found.as_str().to_owned());

    [explicit, header, title, prefix]
        .into_iter()
        .flatten()
        .find_map(|candidate| sanitize_symbol(&candidate))
}

/// Keep letters, digits, and colons; reject empty results and anything of
/// 20 characters or more.
pub fn sanitize_symbol(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ':')
        .collect();

    (!cleaned.is_empty() && cleaned.len() < MAX_SYMBOL_LEN).then_some(cleaned)
}

pub fn resolve_timeframe(page: &PageSnapshot) -> Option<String> {
    let element = page.first_match(&ACTIVE_INTERVAL)?;
    let text = element.text.trim();
    let value = if text.is_empty() {
        element.attr("data-value")?.trim()
    } else {
        text
    };

    (!value.is_empty()).then(|| value.to_owned())
}

fn preceded_by_letter(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .is_some_and(char::is_alphabetic)
}
