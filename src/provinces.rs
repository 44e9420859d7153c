/// Province registry for the CHG rainfall gauge service.
///
/// Gauge labels on the CHG page usually end with an embedded province code,
/// e.g. `P03 CAÑADA DE CAÑEPLA (AL)`. A handful of gauges omit it
/// (`B02 LAS ADELFAS-MELILLA`); those are matched by known name substrings.
/// The seed registry below is the single source of truth for province codes;
/// configuration can extend it as new exceptional gauges appear.
///
/// Resolution order is a contract: an embedded `(XX)` code always outranks
/// an exceptional-name match, regardless of registry order.

use crate::config::ProvinceOverride;
use crate::model::{Province, RainfallError, FALLBACK_PROVINCE_CODE};

// ---------------------------------------------------------------------------
// Seed registry
// ---------------------------------------------------------------------------

/// A province known to the registry.
pub struct ProvinceEntry {
    /// Two-letter code as embedded in gauge labels, e.g. `JA`.
    pub code: &'static str,
    /// Display name served to clients.
    pub name: &'static str,
    /// Label substrings identifying gauges of this province that carry no
    /// embedded code.
    pub exceptional_names: &'static [&'static str],
}

/// Provinces within the Guadalquivir basin, plus the two autonomous cities
/// whose gauges also appear on the CHG page.
pub static PROVINCE_REGISTRY: &[ProvinceEntry] = &[
    ProvinceEntry { code: "AB", name: "Albacete", exceptional_names: &[] },
    ProvinceEntry { code: "AL", name: "Almería", exceptional_names: &[] },
    ProvinceEntry { code: "BA", name: "Badajoz", exceptional_names: &[] },
    ProvinceEntry { code: "CE", name: "Ceuta", exceptional_names: &["RENEGADO - CEUTA"] },
    ProvinceEntry { code: "CR", name: "Ciudad Real", exceptional_names: &[] },
    ProvinceEntry { code: "CO", name: "Córdoba", exceptional_names: &["GUADALQUIVIR CORDOBA"] },
    ProvinceEntry { code: "GR", name: "Granada", exceptional_names: &[] },
    ProvinceEntry { code: "HU", name: "Huelva", exceptional_names: &[] },
    ProvinceEntry { code: "JA", name: "Jaén", exceptional_names: &[] },
    ProvinceEntry { code: "ME", name: "Melilla", exceptional_names: &["LAS ADELFAS-MELILLA"] },
    ProvinceEntry { code: "SE", name: "Sevilla", exceptional_names: &[] },
];

/// Looks up a seed entry by code. Returns `None` if not found.
pub fn find_province(code: &str) -> Option<&'static ProvinceEntry> {
    PROVINCE_REGISTRY.iter().find(|p| p.code == code)
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct DirectoryEntry {
    code: String,
    name: String,
    exceptional_names: Vec<String>,
    // precomputed "(XX)" needle
    embedded: String,
}

impl DirectoryEntry {
    fn new(code: &str, name: &str, exceptional_names: Vec<String>) -> Self {
        DirectoryEntry {
            code: code.to_string(),
            name: name.to_string(),
            exceptional_names,
            embedded: format!("({})", code),
        }
    }

    fn province(&self) -> Province {
        Province {
            code: self.code.clone(),
            name: self.name.clone(),
        }
    }
}

/// The lookup table the row decoder resolves provinces against.
///
/// Built from `PROVINCE_REGISTRY`, optionally extended from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceDirectory {
    entries: Vec<DirectoryEntry>,
}

impl Default for ProvinceDirectory {
    fn default() -> Self {
        Self::from_registry()
    }
}

impl ProvinceDirectory {
    /// Directory containing only the seed registry.
    pub fn from_registry() -> Self {
        let entries = PROVINCE_REGISTRY
            .iter()
            .map(|p| {
                DirectoryEntry::new(
                    p.code,
                    p.name,
                    p.exceptional_names.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        ProvinceDirectory { entries }
    }

    /// Applies maintainer overrides on top of the current entries.
    ///
    /// An override for an existing code appends its exceptional names (and
    /// replaces the display name if one is given). An override for a new code
    /// adds an entry and must carry a name. The fallback code cannot be
    /// registered.
    pub fn with_overrides(mut self, overrides: &[ProvinceOverride]) -> Result<Self, RainfallError> {
        for ov in overrides {
            let code = ov.code.trim();
            if code.is_empty() {
                return Err(RainfallError::Config("province override with empty code".to_string()));
            }
            if code == FALLBACK_PROVINCE_CODE {
                return Err(RainfallError::Config(format!(
                    "province code '{}' is reserved for unresolved gauges",
                    FALLBACK_PROVINCE_CODE
                )));
            }

            let names: Vec<String> = ov
                .exceptional_names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();

            match self.entries.iter_mut().find(|e| e.code == code) {
                Some(entry) => {
                    if let Some(name) = &ov.name {
                        entry.name = name.clone();
                    }
                    for n in names {
                        if !entry.exceptional_names.contains(&n) {
                            entry.exceptional_names.push(n);
                        }
                    }
                }
                None => {
                    let name = ov.name.as_deref().ok_or_else(|| {
                        RainfallError::Config(format!("new province '{}' needs a name", code))
                    })?;
                    self.entries.push(DirectoryEntry::new(code, name, names));
                }
            }
        }
        Ok(self)
    }

    /// Resolves the province for a raw, unstripped gauge label.
    ///
    /// 1. `(CODE)` embedded anywhere in the label, over all entries;
    /// 2. any entry's exceptional name contained in the label;
    /// 3. the `ER` / `ERROR` fallback.
    pub fn resolve(&self, label: &str) -> Province {
        if let Some(entry) = self.entries.iter().find(|e| label.contains(&e.embedded)) {
            return entry.province();
        }

        self.entries
            .iter()
            .find(|e| {
                e.exceptional_names
                    .iter()
                    .any(|n| !n.is_empty() && label.contains(n.as_str()))
            })
            .map(DirectoryEntry::province)
            .unwrap_or_else(Province::fallback)
    }

    /// Codes currently in the directory, in resolution order.
    pub fn codes(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
