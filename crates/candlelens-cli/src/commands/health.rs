use candlelens_core::{InferenceClient, RemoteErrorKind};
use serde_json::{json, Value};

use crate::error::CliError;

/// An unreachable service is reported in the payload, not as a failure, so
/// the check can be scripted. Any other remote error fails the command.
pub async fn run(client: &InferenceClient) -> Result<Value, CliError> {
    match client.health().await {
        Ok(report) => Ok(json!({
            "endpoint": client.endpoint(),
            "healthy": report.is_healthy(),
            "report": report,
        })),
        Err(error) if error.kind() == RemoteErrorKind::Transport => Ok(json!({
            "endpoint": client.endpoint(),
            "healthy": false,
            "error": { "code": error.code(), "message": error.message() },
        })),
        Err(error) => Err(error.into()),
    }
}
