/// Core data types for the CHG rainfall gauge service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: only types, the fallback province, and the error enum.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fallback province
// ---------------------------------------------------------------------------

/// Province code reported when a gauge label matches no directory entry.
pub const FALLBACK_PROVINCE_CODE: &str = "ER";

/// Province name paired with `FALLBACK_PROVINCE_CODE`.
pub const FALLBACK_PROVINCE_NAME: &str = "ERROR";

// ---------------------------------------------------------------------------
// Raw capture
// ---------------------------------------------------------------------------

/// One data row of the real-time rainfall table, exactly as captured.
///
/// Fields follow the table's column order. Missing cells are captured as
/// empty strings; nothing here is trimmed or normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub gauge_label: String,
    pub current_hour: String,
    pub last_12_hours: String,
    pub today_accumulated: String,
    pub yesterday_accumulated: String,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Normalized reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gauge {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub code: String,
    pub name: String,
}

impl Province {
    /// The `ER` / `ERROR` placeholder used when no province can be inferred.
    pub fn fallback() -> Self {
        Province {
            code: FALLBACK_PROVINCE_CODE.to_string(),
            name: FALLBACK_PROVINCE_NAME.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.code == FALLBACK_PROVINCE_CODE
    }
}

/// WGS84 position of a gauge. Never filled in by this service; kept so a
/// downstream collaborator can attach it without changing the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One gauge's precipitation figures at fetch time.
///
/// Amounts stay as text: the source renders them pre-formatted, and the
/// decoder only swaps the locale decimal comma for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub gauge: Gauge,
    pub province: Province,
    pub current_hour: String,
    #[serde(rename = "last12Hours")]
    pub last_12_hours: String,
    pub today_accumulated: String,
    pub yesterday_accumulated: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can abort a refresh of the rainfall readings.
///
/// Per-row formatting anomalies are deliberately absent: the decoder
/// degrades those rows instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RainfallError {
    /// The CHG page could not be reached or its body could not be read.
    #[error("error loading the CHG rainfall page: {0}")]
    Transport(String),
    /// Non-2xx response from the CHG page.
    #[error("error loading the CHG rainfall page: HTTP {0}")]
    HttpStatus(u16),
    /// The page loaded but the rainfall table anchor was not in it.
    #[error("error reading the CHG rainfall page: table '{0}' not found")]
    TableNotFound(String),
    /// Invalid configuration detected while building the service.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RainfallError {
    /// Transport or status failures from the remote page.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, RainfallError::Transport(_) | RainfallError::HttpStatus(_))
    }

    /// The page was fetched but could not be interpreted.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, RainfallError::TableNotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reading() -> Reading {
        Reading {
            gauge: Gauge {
                code: "M13".to_string(),
                name: "CAÑADA DE CAÑEPLA".to_string(),
            },
            province: Province {
                code: "AL".to_string(),
                name: "Almería".to_string(),
            },
            current_hour: "0.2".to_string(),
            last_12_hours: "1.4".to_string(),
            today_accumulated: "3.0".to_string(),
            yesterday_accumulated: "12.6".to_string(),
            unit: "mm".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_reading_serializes_with_client_field_names() {
        let json = serde_json::to_value(sample_reading()).expect("reading should serialize");
        assert_eq!(json["gauge"]["code"], "M13");
        assert_eq!(json["gauge"]["name"], "CAÑADA DE CAÑEPLA");
        assert_eq!(json["province"]["code"], "AL");
        assert_eq!(json["currentHour"], "0.2");
        assert_eq!(json["last12Hours"], "1.4");
        assert_eq!(json["todayAccumulated"], "3.0");
        assert_eq!(json["yesterdayAccumulated"], "12.6");
        assert_eq!(json["unit"], "mm");
    }

    #[test]
    fn test_absent_location_is_omitted_from_json() {
        let json = serde_json::to_value(sample_reading()).expect("reading should serialize");
        assert!(json.get("location").is_none(), "location should be omitted when absent");

        let mut located = sample_reading();
        located.location = Some(Coordinates { lat: 37.2, lng: -2.5 });
        let json = serde_json::to_value(located).expect("reading should serialize");
        assert_eq!(json["location"]["lat"], 37.2);
        assert_eq!(json["location"]["lng"], -2.5);
    }

    #[test]
    fn test_fallback_province_is_er_error() {
        let p = Province::fallback();
        assert_eq!(p.code, "ER");
        assert_eq!(p.name, "ERROR");
        assert!(p.is_fallback());
    }

    #[test]
    fn test_error_classification() {
        assert!(RainfallError::Transport("timed out".into()).is_fetch_failure());
        assert!(RainfallError::HttpStatus(503).is_fetch_failure());
        assert!(!RainfallError::HttpStatus(503).is_parse_failure());
        assert!(RainfallError::TableNotFound("x".into()).is_parse_failure());
        assert!(!RainfallError::Config("x".into()).is_fetch_failure());
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        assert_eq!(
            RainfallError::HttpStatus(500).to_string(),
            "error loading the CHG rainfall page: HTTP 500"
        );
    }
}
