use candlelens_core::Settings;
use serde_json::Value;

use crate::error::CliError;

/// The API key is replaced by a marker; the effective value never reaches
/// stdout.
pub fn run(settings: &Settings) -> Result<Value, CliError> {
    let redacted = Settings {
        api_key: settings.api_key.as_ref().map(|_| String::from("<redacted>")),
        ..settings.clone()
    };
    Ok(serde_json::to_value(redacted)?)
}
