use candlelens_core::{ChartDataReconciler, ExtractionContext, PageSnapshot};
use serde_json::Value;

use crate::cli::PageArgs;
use crate::error::CliError;

pub fn run(args: &PageArgs) -> Result<Value, CliError> {
    let page = PageSnapshot::load(&args.page)?;
    let reconciled = ChartDataReconciler::new().reconcile(&page, &ExtractionContext::now());
    Ok(serde_json::to_value(reconciled)?)
}
