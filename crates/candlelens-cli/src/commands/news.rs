use candlelens_core::InferenceClient;
use serde_json::{json, Value};

use crate::cli::NewsArgs;
use crate::error::CliError;

pub async fn run(args: &NewsArgs, client: &InferenceClient) -> Result<Value, CliError> {
    let symbol = args.symbol.trim();
    if symbol.is_empty() {
        return Err(CliError::Command(String::from("symbol must not be empty")));
    }

    let sentiment = client.news(symbol).await?.into_sentiment();
    Ok(json!({
        "symbol": symbol,
        "sentiment": sentiment,
    }))
}
