/// pluvmon_service: real-time rain gauge readings from the CHG SAIH page.
///
/// # Module structure
///
/// ```text
/// pluvmon_service
/// ├── model        shared data types (RawRow, Reading, Province, RainfallError, …)
/// ├── provinces    province registry and label → province resolution
/// ├── ingest
/// │   ├── chg      CHG page fetcher + rainfall table extraction
/// │   └── decode   raw row → normalized reading
/// ├── cache        freshness window and the single cached entry
/// ├── pipeline     fetch → parse → decode behind the cache
/// ├── api          axum routes and the response envelope
/// ├── verify       one-off decode report for maintainers
/// ├── config       TOML + environment configuration
/// └── logging      tracing subscriber and failure classification
/// ```

pub mod api;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod provinces;
pub mod verify;
