mod analyze;
mod extract;
mod health;
mod news;
mod settings;
mod watch;

use candlelens_core::{InferenceClient, ReqwestHttpClient, Settings};
use serde_json::Value;
use std::sync::Arc;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let settings = load_settings(cli)?;

    match &cli.command {
        Command::Extract(args) => extract::run(args),
        Command::Analyze(args) => analyze::run(args, settings).await,
        Command::Watch(args) => watch::run(args, settings, cli.pretty).await,
        Command::Health => health::run(&inference_client(&settings)).await,
        Command::News(args) => news::run(args, &inference_client(&settings)).await,
        Command::Settings => settings::run(&settings),
    }
}

/// File and environment first, then the `--endpoint` flag.
fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        settings.api_endpoint = endpoint.trim().to_owned();
        settings.validate()?;
    }
    Ok(settings)
}

fn inference_client(settings: &Settings) -> InferenceClient {
    InferenceClient::new(
        Arc::new(ReqwestHttpClient::new()),
        settings.api_endpoint.clone(),
    )
    .with_api_key(settings.api_key.clone())
    .with_timeout_ms(settings.request_timeout_ms)
}
