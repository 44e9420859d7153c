/// CHG (Confederación Hidrográfica del Guadalquivir) SAIH page client.
///
/// Retrieves the real-time rainfall table page and extracts its rows.
/// The page is an ASP.NET GridView rendered as
/// `<table id="ContentPlaceHolder1_GridLluviaTiempoReal">`, whose first row
/// holds the column headers.
///
/// Page: https://www.chguadalquivir.es/saih/LluviaTabla.aspx

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html};

use crate::config::SourceConfig;
use crate::ingest::PageSource;
use crate::model::{RainfallError, RawRow};

/// Element id of the real-time rainfall table.
pub const RAIN_TABLE_ID: &str = "ContentPlaceHolder1_GridLluviaTiempoReal";

// ============================================================================
// Fetcher
// ============================================================================

/// Live page source: one GET per call, no retries.
pub struct ChgPageSource {
    client: reqwest::Client,
    url: String,
}

impl ChgPageSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        ChgPageSource {
            client,
            url: url.into(),
        }
    }

    /// Builds the HTTP client from configuration.
    pub fn from_config(cfg: &SourceConfig) -> Result<Self, RainfallError> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RainfallError::Config(format!("building HTTP client: {}", e)))?;
        Ok(Self::new(client, cfg.url.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PageSource for ChgPageSource {
    async fn fetch_page(&self) -> Result<String, RainfallError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RainfallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RainfallError::HttpStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| RainfallError::Transport(format!("reading body: {}", e)))
    }

    fn name(&self) -> &'static str {
        "CHG"
    }
}

// ============================================================================
// Page parser
// ============================================================================

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Table rows in document order: `tr` children of the table's row groups,
/// or of the anchor itself.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|c| c.value().name() == "tr"));
            }
            _ => {}
        }
    }
    rows
}

fn row_from_cells(tr: ElementRef<'_>) -> RawRow {
    let mut cells = child_elements(tr)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(|c| c.text().collect::<String>());
    let mut next = || cells.next().unwrap_or_default();

    RawRow {
        gauge_label: next(),
        current_hour: next(),
        last_12_hours: next(),
        today_accumulated: next(),
        yesterday_accumulated: next(),
        unit: next(),
    }
}

/// Extracts the data rows of the real-time rainfall table.
///
/// The header row is skipped. Cells beyond the sixth are ignored and missing
/// cells come back as empty strings. A page with the table but no data rows
/// yields an empty vector; a page without the table is a `TableNotFound`.
pub fn parse_rain_table(markup: &str) -> Result<Vec<RawRow>, RainfallError> {
    let document = Html::parse_document(markup);
    let table = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(RAIN_TABLE_ID))
        .ok_or_else(|| RainfallError::TableNotFound(RAIN_TABLE_ID.to_string()))?;

    Ok(table_rows(table).into_iter().skip(1).map(row_from_cells).collect())
}

// ============================================================================
// Tests
// ============================================================================
