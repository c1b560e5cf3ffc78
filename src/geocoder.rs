use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{CENSUS_BENCHMARK, CENSUS_FORMAT, CENSUS_VINTAGE};
use crate::error::Result;

/// A street address as it appears in one property row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
        }
    }

    /// Case- and padding-insensitive identity used for memoization
    fn cache_key(&self) -> AddressKey {
        let norm = |s: &str| s.trim().to_uppercase();
        AddressKey([
            norm(&self.street),
            norm(&self.city),
            norm(&self.state),
            norm(&self.zip),
        ])
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AddressKey([String; 4]);

/// Resolves an address to a county name.
///
/// `lookup` is best-effort: transport and parsing failures come back as
/// `None`, the same as an address with no match. Callers should read `None`
/// as "unresolved", not "has no county".
#[async_trait]
pub trait CountyLookup: Send + Sync {
    async fn lookup(&self, address: &Address) -> Option<String>;

    /// Pause between consecutive lookups.
    async fn wait(&self);
}

/// Client for the US Census geographies address endpoint
pub struct CensusGeocoder {
    client: reqwest::Client,
    api_url: String,
    delay: Duration,
}

impl CensusGeocoder {
    pub fn new(api_url: impl Into<String>, delay: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            delay,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.census_url.clone(), config.api_delay, config.request_timeout)
    }

    async fn fetch(&self, address: &Address) -> Result<Option<String>> {
        let params = [
            ("street", address.street.as_str()),
            ("city", address.city.as_str()),
            ("state", address.state.as_str()),
            ("zip", address.zip.as_str()),
            ("benchmark", CENSUS_BENCHMARK),
            ("vintage", CENSUS_VINTAGE),
            ("format", CENSUS_FORMAT),
        ];

        debug!("GET {} for {}", self.api_url, address);
        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        extract_county(&body)
    }
}

#[async_trait]
impl CountyLookup for CensusGeocoder {
    async fn lookup(&self, address: &Address) -> Option<String> {
        match self.fetch(address).await {
            Ok(county) => county,
            Err(e) => {
                warn!("Error geocoding {}: {}", address.street, e);
                None
            }
        }
    }

    async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[derive(Debug, Deserialize)]
struct CensusResponse {
    result: Option<CensusResult>,
}

#[derive(Debug, Deserialize)]
struct CensusResult {
    #[serde(rename = "addressMatches", default)]
    address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Deserialize)]
struct AddressMatch {
    geographies: Option<Geographies>,
}

#[derive(Debug, Deserialize)]
struct Geographies {
    #[serde(rename = "Counties", default)]
    counties: Vec<County>,
}

#[derive(Debug, Deserialize)]
struct County {
    #[serde(rename = "NAME")]
    name: Option<String>,
}

/// Pull the first match's first county name out of a geocoder response body.
///
/// A body that is valid JSON but lacks any part of the expected path yields
/// `Ok(None)`; a body that is not JSON, or has the path with the wrong types,
/// is an error.
pub fn extract_county(body: &str) -> Result<Option<String>> {
    let response: CensusResponse = serde_json::from_str(body)?;
    let county = response
        .result
        .and_then(|r| r.address_matches.into_iter().next())
        .and_then(|m| m.geographies)
        .and_then(|g| g.counties.into_iter().next())
        .and_then(|c| c.name)
        .filter(|name| !name.trim().is_empty());
    Ok(county)
}

/// Memoizing wrapper around another lookup.
///
/// Only resolved counties are cached; an unresolved address is asked again
/// on the next call.
pub struct CachedGeocoder<L> {
    inner: L,
    cache: Mutex<HashMap<AddressKey, String>>,
    stats: Mutex<CacheStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl<L: CountyLookup> CachedGeocoder<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        *self.stats.lock().await
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

#[async_trait]
impl<L: CountyLookup> CountyLookup for CachedGeocoder<L> {
    async fn lookup(&self, address: &Address) -> Option<String> {
        let key = address.cache_key();
        if let Some(county) = self.cache.lock().await.get(&key) {
            debug!("Cache hit for {}", address);
            self.stats.lock().await.hits += 1;
            return Some(county.clone());
        }

        self.stats.lock().await.misses += 1;
        let county = self.inner.lookup(address).await?;
        self.cache.lock().await.insert(key, county.clone());
        Some(county)
    }

    async fn wait(&self) {
        self.inner.wait().await;
    }
}
