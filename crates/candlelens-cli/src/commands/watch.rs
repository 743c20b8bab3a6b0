use std::path::Path;
use std::sync::Arc;

use candlelens_core::{
    AnalysisSession, CycleOutcome, Insight, InsightListener, PageSnapshot, PublishError, Settings,
};
use serde_json::Value;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

/// Prints each insight as one JSON document on stdout.
struct StdoutListener {
    pretty: bool,
}

impl InsightListener for StdoutListener {
    fn name(&self) -> &str {
        "stdout"
    }

    fn deliver(&self, insight: &Insight) -> Result<(), PublishError> {
        let value = serde_json::to_value(insight).map_err(|error| self.failed(error))?;
        let line = output::to_json(&value, self.pretty).map_err(|error| self.failed(error))?;
        println!("{line}");
        Ok(())
    }
}

impl StdoutListener {
    fn failed(&self, error: impl std::fmt::Display) -> PublishError {
        PublishError::Failed {
            listener: String::from(self.name()),
            reason: error.to_string(),
        }
    }
}

pub async fn run(args: &WatchArgs, settings: Settings, pretty: bool) -> Result<Value, CliError> {
    let limit = if settings.auto_analyze {
        args.cycles
    } else {
        warn!("autoAnalyze is disabled; running a single cycle");
        Some(1)
    };
    if limit == Some(0) {
        return Err(CliError::Command(String::from("--cycles must be at least 1")));
    }

    let period = settings.analysis_interval();
    let session = if args.offline {
        AnalysisSession::offline(settings)
    } else {
        AnalysisSession::from_settings(settings)
    };
    let session = session.with_listener(Arc::new(StdoutListener { pretty }));

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut completed = 0u64;
    let mut skipped = 0u64;

    info!(interval_secs = period.as_secs(), "watching page snapshot");
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        let Some(page) = reload(&args.page.page) else {
            continue;
        };
        match session.run_cycle(&page).await {
            CycleOutcome::Completed(_) => completed += 1,
            CycleOutcome::Skipped => skipped += 1,
        }
        if limit.is_some_and(|limit| completed >= limit) {
            break;
        }
    }

    // Insights were already streamed; the summary goes to the log.
    info!(completed, skipped, connected = session.is_connected(), "watch finished");
    Ok(Value::Null)
}

/// A page that fails to load skips this tick only.
fn reload(path: &Path) -> Option<PageSnapshot> {
    match PageSnapshot::load(path) {
        Ok(page) => Some(page),
        Err(error) => {
            warn!(path = %path.display(), %error, "page snapshot unreadable; skipping tick");
            None
        }
    }
}
