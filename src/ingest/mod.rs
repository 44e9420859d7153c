/// Ingestion of the CHG real-time rainfall page.
///
/// Submodules:
/// - `chg`:    fetches the page and extracts the raw table rows.
/// - `decode`: turns raw rows into normalized `Reading`s.

pub mod chg;
pub mod decode;

use async_trait::async_trait;

use crate::model::RainfallError;

/// Something that can hand back the rainfall page markup.
///
/// The live implementation is `chg::ChgPageSource`; `StaticPageSource`
/// serves a saved copy of the page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self) -> Result<String, RainfallError>;
    fn name(&self) -> &'static str;
}

/// Serves fixed markup, e.g. a page saved to disk.
pub struct StaticPageSource {
    markup: String,
}

impl StaticPageSource {
    pub fn new(markup: impl Into<String>) -> Self {
        StaticPageSource {
            markup: markup.into(),
        }
    }

    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn fetch_page(&self) -> Result<String, RainfallError> {
        Ok(self.markup.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
