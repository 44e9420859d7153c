/// Row decoding: raw CHG table rows into normalized readings.
///
/// Gauge labels arrive in two shapes:
///   `M13 CAÑADA DE CAÑEPLA (AL)`  usual, embedded province code
///   `B02 LAS ADELFAS-MELILLA`     exceptional, resolved by name
/// and sometimes with a doubled space after the code (`A28  PTE. JONTOYA (JA)`).
///
/// Decoding never fails. A label that does not start with `<code> ` yields a
/// degraded reading (empty name, fallback province) and decoding moves on.

use crate::logging::DataSource;
use crate::model::{Gauge, Province, RawRow, Reading};
use crate::provinces::ProvinceDirectory;

/// Length of the ` (XX)` suffix stripped from names ending in `)`.
const PROVINCE_SUFFIX_CHARS: usize = 5;

/// Counts from one decode pass, for logging and verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub rows: usize,
    /// Rows whose label did not have the `<code> <name>` shape.
    pub degraded: usize,
    /// Rows resolved to the fallback province.
    pub unresolved: usize,
}

/// Splits a label into (code, name).
///
/// Returns `None` when the label has no space after a non-empty code.
fn split_label(label: &str) -> Option<(&str, String)> {
    let code = label.split(' ').next().unwrap_or_default();
    if code.is_empty() || code.len() == label.len() {
        return None;
    }

    // code plus exactly one separator character
    let mut name = &label[code.len()..];
    let mut chars = name.chars();
    chars.next();
    name = chars.as_str();

    if let Some(rest) = name.strip_prefix([' ', '\u{a0}']) {
        name = rest;
    }

    let name = if name.ends_with(')') {
        let keep = name.chars().count().saturating_sub(PROVINCE_SUFFIX_CHARS);
        name.chars().take(keep).collect()
    } else {
        name.to_string()
    };

    Some((code, name))
}

/// Rewrites the locale decimal comma to a period.
///
/// Only the first comma is rewritten; anything after it is kept verbatim.
pub fn normalize_amount(raw: &str) -> String {
    raw.replacen(',', ".", 1)
}

fn decode_row_checked(raw: &RawRow, directory: &ProvinceDirectory) -> (Reading, bool) {
    let (gauge, province, degraded) = match split_label(&raw.gauge_label) {
        Some((code, name)) => (
            Gauge {
                code: code.to_string(),
                name,
            },
            directory.resolve(&raw.gauge_label),
            false,
        ),
        None => (
            Gauge {
                code: raw.gauge_label.clone(),
                name: String::new(),
            },
            Province::fallback(),
            true,
        ),
    };

    let reading = Reading {
        gauge,
        province,
        current_hour: normalize_amount(&raw.current_hour),
        last_12_hours: normalize_amount(&raw.last_12_hours),
        today_accumulated: normalize_amount(&raw.today_accumulated),
        yesterday_accumulated: normalize_amount(&raw.yesterday_accumulated),
        unit: raw.unit.clone(),
        location: None,
    };
    (reading, degraded)
}

/// Decodes one captured row. Side-effect free.
pub fn decode_row(raw: &RawRow, directory: &ProvinceDirectory) -> Reading {
    decode_row_checked(raw, directory).0
}

/// Decodes every row in order, returning the readings and pass counts.
pub fn decode_rows(rows: &[RawRow], directory: &ProvinceDirectory) -> (Vec<Reading>, DecodeSummary) {
    let mut summary = DecodeSummary {
        rows: rows.len(),
        ..DecodeSummary::default()
    };
    let mut readings = Vec::with_capacity(rows.len());

    for raw in rows {
        let (reading, degraded) = decode_row_checked(raw, directory);
        if degraded {
            summary.degraded += 1;
            tracing::debug!(source = %DataSource::Chg, label = %raw.gauge_label, "irregular gauge label, decoded degraded");
        }
        if reading.province.is_fallback() {
            summary.unresolved += 1;
        }
        readings.push(reading);
    }

    (readings, summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
