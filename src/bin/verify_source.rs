//! Prints a decode report for the CHG rainfall page as JSON.
//!
//! Usage:
//!   verify_source              # fetch the configured live page
//!   verify_source page.html    # check a saved copy instead

use std::path::PathBuf;

use anyhow::{Context, Result};
use pluvmon_service::{
    config::AppConfig,
    ingest::{chg::ChgPageSource, PageSource, StaticPageSource},
    logging,
    provinces::ProvinceDirectory,
    verify::{self, VerificationStatus},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cfg = AppConfig::load()?;
    logging::init_logging(&cfg.logging);

    let directory = ProvinceDirectory::from_registry().with_overrides(&cfg.provinces)?;

    let source: Box<dyn PageSource> = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Box::new(
            StaticPageSource::from_file(&path).with_context(|| format!("reading {}", path.display()))?,
        ),
        None => Box::new(ChgPageSource::from_config(&cfg.source)?),
    };

    let report = verify::verify_source(source.as_ref(), &directory).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status == VerificationStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}
