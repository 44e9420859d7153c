/// Structured logging for the rainfall service
///
/// Installs a `tracing` subscriber and provides helpers that attach a data
/// source tag and a failure classification to refresh errors, so an
/// operator can tell a CHG maintenance window from a page layout change.

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::ingest::decode::DecodeSummary;
use crate::model::RainfallError;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Chg,
    Cache,
    Api,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Chg => write!(f, "CHG"),
            DataSource::Cache => write!(f, "CACHE"),
            DataSource::Api => write!(f, "API"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the CHG site is in maintenance or throttling us
    Expected,
    /// Unexpected failure - the page changed shape or the service is misconfigured
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a refresh failure.
pub fn classify_failure(err: &RainfallError) -> FailureType {
    match err {
        // 503 is what the SAIH site returns during its maintenance windows
        RainfallError::HttpStatus(503) | RainfallError::HttpStatus(429) => FailureType::Expected,
        RainfallError::HttpStatus(code) if *code >= 500 => FailureType::Unknown,
        RainfallError::HttpStatus(_) => FailureType::Unexpected,
        // connection resets and timeouts come and go
        RainfallError::Transport(_) => FailureType::Unknown,
        // the GridView id changed or the page is an error page
        RainfallError::TableNotFound(_) => FailureType::Unexpected,
        RainfallError::Config(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// Install the global subscriber. `RUST_LOG` wins over `cfg.level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_ok() {
        tracing::debug!(source = %DataSource::System, level = %cfg.level, json = cfg.json, "logging initialized");
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a refresh failure with automatic classification
pub fn log_refresh_failure(source: &str, operation: &str, err: &RainfallError) {
    let failure = classify_failure(err);

    match failure {
        FailureType::Expected => {
            tracing::info!(source, %failure, error = %err, "{} failed", operation)
        }
        FailureType::Unexpected => {
            tracing::error!(source, %failure, error = %err, "{} failed", operation)
        }
        FailureType::Unknown => {
            tracing::warn!(source, %failure, error = %err, "{} failed", operation)
        }
    }
}

// ---------------------------------------------------------------------------
// Decode Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of one decode pass
pub fn log_decode_summary(source: &str, summary: &DecodeSummary) {
    if summary.rows == 0 {
        tracing::warn!(source, "rainfall table had no data rows");
    } else if summary.degraded > 0 || summary.unresolved > 0 {
        tracing::warn!(
            source,
            rows = summary.rows,
            degraded = summary.degraded,
            unresolved = summary.unresolved,
            "decoded readings with irregular rows"
        );
    } else {
        tracing::info!(source, rows = summary.rows, "decoded readings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_failure(&RainfallError::HttpStatus(503)), FailureType::Expected);
        assert_eq!(classify_failure(&RainfallError::HttpStatus(502)), FailureType::Unknown);
        assert_eq!(classify_failure(&RainfallError::HttpStatus(404)), FailureType::Unexpected);
        assert_eq!(
            classify_failure(&RainfallError::Transport("connection reset".into())),
            FailureType::Unknown
        );
        assert_eq!(
            classify_failure(&RainfallError::TableNotFound("grid".into())),
            FailureType::Unexpected
        );
    }

    #[test]
    fn test_display_tags() {
        assert_eq!(DataSource::Chg.to_string(), "CHG");
        assert_eq!(DataSource::Cache.to_string(), "CACHE");
        assert_eq!(FailureType::Unexpected.to_string(), "UNEXPECTED");
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        let cfg = LoggingConfig::default();
        init_logging(&cfg);
        init_logging(&cfg);
    }
}
