//! Priority chain over the candle producers.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::page::PageSnapshot;
use crate::{Candle, ChartData};

use super::demo;
use super::text::{sanitize_symbol, TextExtractor};
use super::visual::VisualDetector;
use super::ExtractionContext;

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_TIMEFRAME: &str = "1D";

pub const SYNTHETIC_DATA_WARNING: &str =
    "Synthetic demo data: no chart data could be read from the page";
pub const VISUAL_DATA_WARNING: &str =
    "Candles reconstructed from pixels; timestamps and volume are approximate";

/// Which producer supplied the candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Text,
    Visual,
    Synthetic,
}

impl DataOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Visual => "visual",
            Self::Synthetic => "synthetic",
        }
    }
}

impl Display for DataOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled series plus the trail of how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciled {
    pub data: ChartData,
    pub origin: DataOrigin,
    pub source_chain: Vec<DataOrigin>,
    pub warnings: Vec<String>,
}

impl Reconciled {
    pub fn is_synthetic(&self) -> bool {
        self.origin == DataOrigin::Synthetic
    }
}

type Producer<'a> = (DataOrigin, Box<dyn FnOnce() -> Vec<Candle> + 'a>);

fn producer<'a>(origin: DataOrigin, produce: impl FnOnce() -> Vec<Candle> + 'a) -> Producer<'a> {
    (origin, Box::new(produce))
}

/// Run producers in order and stop at the first non-empty result. Returns the
/// winner, if any, and every origin that was attempted.
fn first_non_empty(
    producers: Vec<Producer<'_>>,
) -> (Option<(DataOrigin, Vec<Candle>)>, Vec<DataOrigin>) {
    let mut chain = Vec::with_capacity(producers.len());

    for (origin, produce) in producers {
        chain.push(origin);
        let candles = produce();
        if !candles.is_empty() {
            return (Some((origin, candles)), chain);
        }
        debug!(origin = origin.as_str(), "producer yielded no candles");
    }

    (None, chain)
}

/// Merges text and visual extraction into one [`ChartData`] whose candle
/// sequence is never empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartDataReconciler {
    text: TextExtractor,
    visual: VisualDetector,
    demo_seed: Option<u64>,
}

impl ChartDataReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the demo generator's seed so synthetic output is reproducible.
    pub fn with_demo_seed(mut self, seed: u64) -> Self {
        self.demo_seed = Some(seed);
        self
    }

    pub fn reconcile(&self, page: &PageSnapshot, ctx: &ExtractionContext) -> Reconciled {
        let text = self.text.extract(page, ctx);
        let labels = self.visual.infer_labels(page);

        let text_candles = text.candles;
        let (winner, mut source_chain) = first_non_empty(vec![
            producer(DataOrigin::Text, move || text_candles),
            producer(DataOrigin::Visual, || self.visual.detect(page, ctx)),
        ]);

        let mut warnings = Vec::new();
        let (origin, candles) = match winner {
            Some((DataOrigin::Visual, candles)) => {
                warnings.push(String::from(VISUAL_DATA_WARNING));
                (DataOrigin::Visual, candles)
            }
            Some(found) => found,
            None => {
                source_chain.push(DataOrigin::Synthetic);
                warnings.push(String::from(SYNTHETIC_DATA_WARNING));
                let mut rng = match self.demo_seed {
                    Some(seed) => fastrand::Rng::with_seed(seed),
                    None => fastrand::Rng::new(),
                };
                (DataOrigin::Synthetic, demo::synthesize(ctx.now, &mut rng))
            }
        };

        let symbol = [
            text.symbol,
            labels.symbol,
            url_param(page, "symbol").and_then(|raw| sanitize_symbol(&raw)),
        ]
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_else(|| String::from(UNKNOWN_SYMBOL));
        let timeframe = [
            text.timeframe.and_then(|raw| normalize_interval(&raw)),
            labels.timeframe.and_then(|raw| normalize_interval(&raw)),
            url_param(page, "interval").and_then(|raw| normalize_interval(&raw)),
        ]
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_else(|| String::from(DEFAULT_TIMEFRAME));

        // Pixel data carries no indicator readings, so the text layer's list
        // is the full concatenation.
        let data = ChartData::new(symbol, timeframe, candles).with_indicators(text.indicators);

        info!(
            symbol = %data.symbol,
            timeframe = %data.timeframe,
            candles = data.candles.len(),
            origin = origin.as_str(),
            "chart data reconciled"
        );

        Reconciled {
            data,
            origin,
            source_chain,
            warnings,
        }
    }
}

fn url_param(page: &PageSnapshot, name: &str) -> Option<String> {
    let url = Url::parse(&page.url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Normalize an interval as written by the URL, the interval toolbar or the
/// surface label: `D`/`W`/`M` gain a leading `1`, bare minute counts become
/// `<n>m` or `<h>H` when they divide into hours, `<n>h` becomes `<n>H`.
/// Anything else is kept as written.
pub fn normalize_interval(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(minutes) = raw.parse::<u32>() {
        if minutes == 0 {
            return None;
        }
        return Some(if minutes % 60 == 0 {
            format!("{}H", minutes / 60)
        } else {
            format!("{minutes}m")
        });
    }

    let upper = raw.to_ascii_uppercase();
    if matches!(upper.as_str(), "D" | "W" | "M") {
        return Some(format!("1{upper}"));
    }

    match raw.strip_suffix(['h', 'H']) {
        Some(hours) if hours.parse::<u32>().is_ok_and(|hours| hours > 0) => {
            Some(format!("{hours}H"))
        }
        _ => Some(raw.to_owned()),
    }
}
