//! Source verification.
//!
//! Fetches the rainfall page once, outside the cache, and reports how well
//! it decodes: how many rows came through, which gauges had irregular labels,
//! and which fell back to the `ER` province. Maintainers run this after the
//! CHG page changes, then extend the province directory from the report.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ingest::chg;
use crate::ingest::decode::{self, DecodeSummary};
use crate::ingest::PageSource;
use crate::model::Reading;
use crate::provinces::ProvinceDirectory;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Every row decoded and resolved a province.
    Success,
    /// Rows came through, but some were degraded or unresolved.
    PartialSuccess,
    /// The page could not be fetched, had no table, or had no rows.
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub source: String,
    pub status: VerificationStatus,
    pub rows_found: usize,
    pub degraded_rows: usize,
    /// Labels of gauges resolved to the fallback province.
    pub unresolved_gauges: Vec<String>,
    /// Readings per province code, fallback included.
    pub province_counts: BTreeMap<String, usize>,
    /// Directory provinces no gauge resolved to in this pass.
    pub silent_provinces: Vec<String>,
    pub error_message: Option<String>,
}

// ============================================================================
// Verification
// ============================================================================

fn status_for(summary: &DecodeSummary) -> VerificationStatus {
    if summary.rows == 0 {
        VerificationStatus::Failed
    } else if summary.degraded == 0 && summary.unresolved == 0 {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    }
}

/// Builds the report for an already-decoded pass.
pub fn summarize(
    source: &str,
    directory: &ProvinceDirectory,
    readings: &[Reading],
    summary: &DecodeSummary,
) -> VerificationReport {
    let mut province_counts = BTreeMap::new();
    let mut unresolved_gauges = Vec::new();

    for r in readings {
        *province_counts.entry(r.province.code.clone()).or_insert(0) += 1;
        if r.province.is_fallback() {
            let label = if r.gauge.name.is_empty() {
                r.gauge.code.clone()
            } else {
                format!("{} {}", r.gauge.code, r.gauge.name)
            };
            unresolved_gauges.push(label);
        }
    }

    let silent_provinces = directory
        .codes()
        .into_iter()
        .filter(|code| !province_counts.contains_key(*code))
        .map(String::from)
        .collect();

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        source: source.to_string(),
        status: status_for(summary),
        rows_found: summary.rows,
        degraded_rows: summary.degraded,
        unresolved_gauges,
        province_counts,
        silent_provinces,
        error_message: (summary.rows == 0).then(|| "rainfall table has no data rows".to_string()),
    }
}

/// Fetches and decodes the page once and reports the outcome.
/// Never fails: fetch and parse errors are recorded in the report.
pub async fn verify_source(source: &dyn PageSource, directory: &ProvinceDirectory) -> VerificationReport {
    let outcome = match source.fetch_page().await {
        Ok(markup) => chg::parse_rain_table(&markup),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(rows) => {
            let (readings, summary) = decode::decode_rows(&rows, directory);
            summarize(source.name(), directory, &readings, &summary)
        }
        Err(e) => VerificationReport {
            timestamp: Utc::now().to_rfc3339(),
            source: source.name().to_string(),
            status: VerificationStatus::Failed,
            rows_found: 0,
            degraded_rows: 0,
            unresolved_gauges: Vec::new(),
            province_counts: BTreeMap::new(),
            silent_provinces: Vec::new(),
            error_message: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::StaticPageSource;

    fn page(rows: &str) -> String {
        format!(
            r#"<table id="{}"><tr><th>Pluviómetro</th></tr>{}</table>"#,
            chg::RAIN_TABLE_ID,
            rows
        )
    }

    fn row(label: &str) -> String {
        format!("<tr><td>{}</td><td>0</td><td>0</td><td>0</td><td>0</td><td>mm</td></tr>", label)
    }

    #[tokio::test]
    async fn test_clean_page_is_success() {
        let src = StaticPageSource::new(page(&(row("A01 UNO (JA)") + &row("B02 LAS ADELFAS-MELILLA"))));
        let report = verify_source(&src, &ProvinceDirectory::from_registry()).await;
        assert_eq!(report.status, VerificationStatus::Success);
        assert_eq!(report.rows_found, 2);
        assert_eq!(report.province_counts.get("JA"), Some(&1));
        assert_eq!(report.province_counts.get("ME"), Some(&1));
        assert!(report.unresolved_gauges.is_empty());
        assert!(report.error_message.is_none());
        assert!(!report.silent_provinces.contains(&"JA".to_string()));
        assert!(report.silent_provinces.contains(&"SE".to_string()));
    }

    #[tokio::test]
    async fn test_silent_provinces_follow_directory_order() {
        let src = StaticPageSource::new(page(&row("A01 UNO (AL)")));
        let directory = ProvinceDirectory::from_registry();
        let report = verify_source(&src, &directory).await;

        let expected: Vec<String> = directory
            .codes()
            .into_iter()
            .filter(|c| *c != "AL")
            .map(String::from)
            .collect();
        assert_eq!(report.silent_provinces, expected);
        assert_eq!(report.silent_provinces.first().map(String::as_str), Some("AB"));
    }

    #[tokio::test]
    async fn test_unresolved_gauges_are_listed() {
        let src = StaticPageSource::new(page(&(row("A01 UNO (JA)") + &row("Z07 CORTIJO NUEVO") + &row("BROKEN"))));
        let report = verify_source(&src, &ProvinceDirectory::from_registry()).await;
        assert_eq!(report.status, VerificationStatus::PartialSuccess);
        assert_eq!(report.degraded_rows, 1);
        assert_eq!(report.unresolved_gauges, vec!["Z07 CORTIJO NUEVO".to_string(), "BROKEN".to_string()]);
        assert_eq!(report.province_counts.get("ER"), Some(&2));
    }

    #[tokio::test]
    async fn test_missing_table_is_failed_with_message() {
        let src = StaticPageSource::new("<html></html>");
        let report = verify_source(&src, &ProvinceDirectory::from_registry()).await;
        assert_eq!(report.status, VerificationStatus::Failed);
        assert!(report.error_message.unwrap().contains(chg::RAIN_TABLE_ID));
    }

    #[tokio::test]
    async fn test_empty_table_is_failed() {
        let src = StaticPageSource::new(page(""));
        let report = verify_source(&src, &ProvinceDirectory::from_registry()).await;
        assert_eq!(report.status, VerificationStatus::Failed);
        assert_eq!(report.rows_found, 0);
    }
}
