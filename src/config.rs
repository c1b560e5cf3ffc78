use std::time::Duration;

use crate::constants::{DEFAULT_API_DELAY_SECS, REQUEST_TIMEOUT_SECS};
use crate::error::{CountyError, Result};

/// Settings for one run, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub census_url: String,
    /// Reserved regional endpoints, not queried yet
    pub fulton_county_url: Option<String>,
    pub dekalb_county_url: Option<String>,
    pub storage: StorageConfig,
    pub api_delay: Duration,
    pub request_timeout: Duration,
}

/// Document-store settings. Declared for deployments that set them; nothing
/// in the pipeline connects to the store.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub mongo_uri: Option<String>,
    pub db_name: Option<String>,
    pub collection_name: Option<String>,
}

impl Config {
    /// Load settings from the process environment, seeding it from `.env`
    /// when that file exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let census_url = get("CENSUS_URL")
            .ok_or_else(|| CountyError::Config("CENSUS_URL is not set".to_string()))?;

        let api_delay = match get("API_DELAY") {
            Some(raw) => parse_delay(&raw)?,
            None => Duration::from_secs_f64(DEFAULT_API_DELAY_SECS),
        };

        Ok(Self {
            census_url,
            fulton_county_url: get("FULTON_COUNTY_URL"),
            // Older .env files spell this DEALB_COUNTY_URL
            dekalb_county_url: get("DEKALB_COUNTY_URL").or_else(|| get("DEALB_COUNTY_URL")),
            storage: StorageConfig {
                mongo_uri: get("MONGO_URI"),
                db_name: get("DB_NAME"),
                collection_name: get("COLLECTION_NAME"),
            },
            api_delay,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        })
    }
}

fn parse_delay(raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| CountyError::Config(format!("API_DELAY must be a number of seconds, got '{}'", raw)))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(CountyError::Config(format!(
            "API_DELAY must be a non-negative number of seconds, got '{}'",
            raw
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}
