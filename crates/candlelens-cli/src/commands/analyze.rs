use candlelens_core::{AnalysisSession, CycleOutcome, PageSnapshot, Settings};
use serde_json::Value;

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

pub async fn run(args: &AnalyzeArgs, settings: Settings) -> Result<Value, CliError> {
    let page = PageSnapshot::load(&args.page.page)?;
    let session = if args.offline {
        AnalysisSession::offline(settings)
    } else {
        AnalysisSession::from_settings(settings)
    };

    match session.run_cycle(&page).await {
        CycleOutcome::Completed(report) => Ok(serde_json::to_value(report)?),
        CycleOutcome::Skipped => Err(CliError::Command(String::from(
            "analysis cycle was skipped because another cycle is in flight",
        ))),
    }
}
