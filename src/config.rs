//! Service configuration.
//!
//! Loaded from a TOML file (`$PLUVMON_CONFIG`, default `pluvmon.toml`), with
//! a few environment overrides applied on top. Every field has a default,
//! so an absent default file simply yields the built-in configuration.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "PLUVMON_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "pluvmon.toml";

const ENV_BIND_ADDR: &str = "PLUVMON_BIND_ADDR";
const ENV_CACHE_VALIDITY_MS: &str = "PLUVMON_CACHE_VALIDITY_MS";
const ENV_SOURCE_URL: &str = "PLUVMON_SOURCE_URL";

/// CHG SAIH real-time rainfall table.
pub const DEFAULT_SOURCE_URL: &str = "https://www.chguadalquivir.es/saih/LluviaTabla.aspx";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Ten minutes.
pub const DEFAULT_CACHE_VALIDITY_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub user_agent: String,
    /// Upper bound on one page fetch, connect to last body byte.
    /// `None` removes the bound.
    pub timeout_secs: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            url: DEFAULT_SOURCE_URL.to_string(),
            user_agent: concat!("pluvmon_service/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub validity_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            validity_ms: DEFAULT_CACHE_VALIDITY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
            cors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Maintainer extension of the province directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvinceOverride {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "aliases")]
    pub exceptional_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub provinces: Vec<ProvinceOverride>,
}

impl AppConfig {
    /// Load configuration using env var + fallback:
    /// 1) `$PLUVMON_CONFIG` (must exist if set)
    /// 2) `pluvmon.toml` in the working directory (optional)
    ///
    /// Environment overrides are applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(anyhow!(
                        "{} points to non-existent path {}",
                        ENV_CONFIG_PATH,
                        path.display()
                    ));
                }
                Self::load_from(&path)?
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    AppConfig::default()
                }
            }
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    /// Applies environment overrides. `lookup` is injected so tests need not
    /// touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(url) = lookup(ENV_SOURCE_URL) {
            self.source.url = url;
        }
        if let Some(ms) = lookup(ENV_CACHE_VALIDITY_MS) {
            self.cache.validity_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got '{}'", ENV_CACHE_VALIDITY_MS, ms))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(anyhow!("source.url must not be empty"));
        }
        if self.cache.validity_ms == 0 {
            return Err(anyhow!("cache.validity_ms must be greater than zero"));
        }
        if self.source.timeout_secs == Some(0) {
            return Err(anyhow!("source.timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Bound on a single page fetch, if any.
    pub fn fetch_timeout(&self) -> Option<std::time::Duration> {
        self.source.timeout_secs.map(std::time::Duration::from_secs)
    }

    pub fn cache_validity(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.cache.validity_ms).unwrap_or(i64::MAX))
    }
}
