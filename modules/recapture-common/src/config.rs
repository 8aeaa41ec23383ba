use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::RecaptureError;

/// Settings consumed by the listening scheduler.
#[derive(Debug, Clone)]
pub struct ListeningConfig {
    /// Nominal time between the starts of two poll cycles.
    pub poll_interval: Duration,
    /// Passed to every connector's `fetch(limit)`.
    pub fetch_limit: u32,
    /// Stored content is cut to this many characters.
    pub content_preview_chars: usize,
    /// Only this many characters of content are sent to the classifier.
    pub classifier_input_chars: usize,
    /// Classified results scoring below this are triaged as discarded.
    pub discard_below: f64,
}

impl Default for ListeningConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            fetch_limit: 20,
            content_preview_chars: 500,
            classifier_input_chars: 2000,
            discard_below: 0.1,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listening: ListeningConfig,
    pub authority_top_n: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, RecaptureError> {
        let defaults = ListeningConfig::default();
        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            listening: ListeningConfig {
                poll_interval: poll_interval(parsed_env(
                    "LISTEN_POLL_INTERVAL_SECS",
                    defaults.poll_interval.as_secs(),
                )?)?,
                fetch_limit: parsed_env("LISTEN_FETCH_LIMIT", defaults.fetch_limit)?,
                content_preview_chars: parsed_env(
                    "LISTEN_CONTENT_PREVIEW_CHARS",
                    defaults.content_preview_chars,
                )?,
                classifier_input_chars: defaults.classifier_input_chars,
                discard_below: parsed_env("CLASSIFIER_DISCARD_BELOW", defaults.discard_below)?,
            },
            authority_top_n: parsed_env("AUTHORITY_TOP_N", 3)?,
        })
    }

    /// Log the effective configuration with database credentials masked.
    pub fn log_redacted(&self) {
        info!(
            database_url = redact_url(&self.database_url).as_str(),
            poll_interval_secs = self.listening.poll_interval.as_secs(),
            fetch_limit = self.listening.fetch_limit,
            content_preview_chars = self.listening.content_preview_chars,
            discard_below = self.listening.discard_below,
            authority_top_n = self.authority_top_n,
            "Loaded configuration"
        );
    }
}

fn required_env(key: &str) -> Result<String, RecaptureError> {
    env::var(key).map_err(|_| RecaptureError::Config(format!("{key} environment variable is required")))
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, RecaptureError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RecaptureError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// A zero interval would turn the poll loop into a busy spin.
fn poll_interval(secs: u64) -> Result<Duration, RecaptureError> {
    if secs == 0 {
        return Err(RecaptureError::Config(
            "LISTEN_POLL_INTERVAL_SECS must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}
