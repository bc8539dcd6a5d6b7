// src/config.rs
//! Service configuration: defaults, then an optional TOML file, then env overrides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "MEAL_PROXY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";
pub const DEFAULT_NEIS_BASE_URL: &str = "https://open.neis.go.kr/hub";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub neis_base_url: String,
    pub neis_api_key: String,
    /// Per-request upstream timeout. Unset keeps the HTTP client's default.
    pub upstream_timeout_secs: Option<u64>,
    pub static_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub page_size: usize,
    pub max_pages: usize,
    pub sample_size: usize,
    pub fanout_concurrency: usize,
    pub search_page_size: usize,
    pub meal_page_size: usize,
    pub day_meal_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            neis_base_url: DEFAULT_NEIS_BASE_URL.to_string(),
            neis_api_key: String::new(),
            upstream_timeout_secs: None,
            static_dir: PathBuf::from("frontend"),
            cache_ttl_secs: 7 * 24 * 3600,
            sweep_interval_secs: 24 * 3600,
            page_size: 100,
            max_pages: 10,
            sample_size: 100,
            fanout_concurrency: 100,
            search_page_size: 10,
            meal_page_size: 100,
            day_meal_page_size: 10,
        }
    }
}

impl Config {
    /// Load using:
    /// 1) $MEAL_PROXY_CONFIG (must exist when set)
    /// 2) config/server.toml (optional)
    /// 3) environment overrides on top
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::from_file(Path::new(&p))?,
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        override_from_env("PORT", &mut self.port)?;
        override_from_env("NEIS_BASE_URL", &mut self.neis_base_url)?;
        override_from_env("NEIS_API_KEY", &mut self.neis_api_key)?;
        override_from_env("STATIC_DIR", &mut self.static_dir)?;
        override_from_env("DISTRICT_CACHE_TTL_SECS", &mut self.cache_ttl_secs)?;
        override_from_env("DISTRICT_CACHE_SWEEP_SECS", &mut self.sweep_interval_secs)?;
        override_from_env("DISTRICT_MAX_PAGES", &mut self.max_pages)?;
        override_from_env("DISTRICT_SAMPLE_SIZE", &mut self.sample_size)?;
        override_from_env("DISTRICT_FANOUT_CONCURRENCY", &mut self.fanout_concurrency)?;
        if let Ok(raw) = std::env::var("NEIS_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid NEIS_TIMEOUT_SECS value '{raw}'"))?;
            self.upstream_timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.max_pages == 0 {
            bail!("max_pages must be at least 1");
        }
        if self.fanout_concurrency == 0 {
            bail!("fanout_concurrency must be at least 1");
        }
        if self.sweep_interval_secs == 0 {
            bail!("sweep_interval_secs must be at least 1");
        }
        if self.neis_base_url.trim().is_empty() {
            bail!("neis_base_url must not be empty");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }
}

fn override_from_env<T>(key: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *slot = raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))?;
    }
    Ok(())
}
