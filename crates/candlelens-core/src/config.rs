//! Runtime settings: defaults, optional JSON file, environment overrides.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CANDLELENS_API_ENDPOINT` | `api_endpoint` |
//! | `CANDLELENS_API_KEY` | `api_key` |
//! | `CANDLELENS_AUTO_ANALYZE` | `auto_analyze` |
//! | `CANDLELENS_ANALYSIS_INTERVAL_SECONDS` | `analysis_interval_seconds` |
//! | `CANDLELENS_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::{CoreError, ValidationError};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8000";
pub const MIN_INTERVAL_SECONDS: u32 = 10;
pub const MAX_INTERVAL_SECONDS: u32 = 300;
pub const DEFAULT_INTERVAL_SECONDS: u32 = 60;

const ENV_API_ENDPOINT: &str = "CANDLELENS_API_ENDPOINT";
const ENV_API_KEY: &str = "CANDLELENS_API_KEY";
const ENV_AUTO_ANALYZE: &str = "CANDLELENS_AUTO_ANALYZE";
const ENV_INTERVAL: &str = "CANDLELENS_ANALYSIS_INTERVAL_SECONDS";
const ENV_TIMEOUT: &str = "CANDLELENS_REQUEST_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_endpoint: String,
    pub auto_analyze: bool,
    pub overlay_enabled: bool,
    pub show_confidence: bool,
    pub show_explanation: bool,
    pub analysis_interval_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: String::from(DEFAULT_API_ENDPOINT),
            auto_analyze: true,
            overlay_enabled: true,
            show_confidence: true,
            show_explanation: true,
            analysis_interval_seconds: DEFAULT_INTERVAL_SECONDS,
            api_key: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Defaults, then `path` if given, then process environment; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|name| env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(endpoint) = read(ENV_API_ENDPOINT) {
            self.api_endpoint = endpoint.trim().to_owned();
        }
        if let Some(key) = read(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(value) = read(ENV_AUTO_ANALYZE) {
            self.auto_analyze = parse_bool(&value).ok_or_else(|| ValidationError::InvalidEnvValue {
                name: ENV_AUTO_ANALYZE,
                value: value.clone(),
            })?;
        }
        if let Some(value) = read(ENV_INTERVAL) {
            self.analysis_interval_seconds =
                value.trim().parse().map_err(|_| ValidationError::InvalidEnvValue {
                    name: ENV_INTERVAL,
                    value: value.clone(),
                })?;
        }
        if let Some(value) = read(ENV_TIMEOUT) {
            self.request_timeout_ms =
                value.trim().parse().map_err(|_| ValidationError::InvalidEnvValue {
                    name: ENV_TIMEOUT,
                    value: value.clone(),
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let endpoint_ok = Url::parse(&self.api_endpoint)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !endpoint_ok {
            return Err(ValidationError::InvalidEndpoint {
                value: self.api_endpoint.clone(),
            });
        }

        let interval_range = MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS;
        if !interval_range.contains(&self.analysis_interval_seconds) {
            return Err(ValidationError::IntervalOutOfRange {
                value: self.analysis_interval_seconds,
                min: MIN_INTERVAL_SECONDS,
                max: MAX_INTERVAL_SECONDS,
            });
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }

        Ok(())
    }

    pub fn analysis_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.analysis_interval_seconds))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(settings.analysis_interval(), Duration::from_secs(60));
    }

    const PARTIAL_SETTINGS: &str = r#"{
        "apiEndpoint": "https://insight.example",
        "analysisIntervalSeconds": 120,
        "overlayEnabled": false
    }"#;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(PARTIAL_SETTINGS.as_bytes()).expect("write settings");

        let settings = Settings::from_file(file.path()).expect("settings parse");
        assert_eq!(settings.api_endpoint, "https://insight.example");
        assert_eq!(settings.analysis_interval_seconds, 120);
        assert!(!settings.overlay_enabled);
        assert!(settings.show_confidence);
        assert_eq!(settings.request_timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = Settings::from_file(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(error, CoreError::Io(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(lookup(&[
                (ENV_API_ENDPOINT, "http://10.0.0.2:9000"),
                (ENV_API_KEY, "k-123"),
                (ENV_AUTO_ANALYZE, "off"),
                (ENV_INTERVAL, "30"),
                (ENV_TIMEOUT, " "),
            ]))
            .expect("valid overrides");

        assert_eq!(settings.api_endpoint, "http://10.0.0.2:9000");
        assert_eq!(settings.api_key.as_deref(), Some("k-123"));
        assert!(!settings.auto_analyze);
        assert_eq!(settings.analysis_interval_seconds, 30);
        assert_eq!(settings.request_timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn malformed_override_names_the_variable() {
        let error = Settings::default()
            .apply_overrides(lookup(&[(ENV_INTERVAL, "soon")]))
            .expect_err("not a number");
        assert_eq!(
            error,
            ValidationError::InvalidEnvValue {
                name: ENV_INTERVAL,
                value: String::from("soon"),
            }
        );
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let short = Settings {
            analysis_interval_seconds: 5,
            ..Settings::default()
        };
        assert!(matches!(
            short.validate(),
            Err(ValidationError::IntervalOutOfRange { value: 5, .. })
        ));

        let ftp = Settings {
            api_endpoint: String::from("ftp://localhost"),
            ..Settings::default()
        };
        assert!(matches!(ftp.validate(), Err(ValidationError::InvalidEndpoint { .. })));

        let no_timeout = Settings {
            request_timeout_ms: 0,
            ..Settings::default()
        };
        assert_eq!(no_timeout.validate(), Err(ValidationError::ZeroTimeout));

        let edge = Settings {
            analysis_interval_seconds: MAX_INTERVAL_SECONDS,
            ..Settings::default()
        };
        assert!(edge.validate().is_ok());
    }
}
