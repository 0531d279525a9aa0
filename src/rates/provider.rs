use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{BASE_CURRENCY, Currency};

/// Free exchange-rate sources, tried in order. Both return
/// `{ "rates": { "GBP": 0.11, ... } }` relative to the base currency.
const RATE_ENDPOINTS: [&str; 2] = [
    "https://api.exchangerate-api.com/v4/latest/CNY",
    "https://open.er-api.com/v6/latest/CNY",
];

/// How long a fetched rate set stays fresh before `get_rates` tries
/// to refresh it.
const MAX_RATE_AGE_HOURS: i64 = 4;

/// Per-request timeout for the rate sources.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Static fallback rates per 1 RMB. These cover every supported currency,
/// so a rate lookup can never come up empty.
fn fallback_rate(currency: Currency) -> Decimal {
    match currency {
        Currency::Rmb => Decimal::ONE,
        Currency::Gbp => Decimal::new(11, 2),
        Currency::Aed => Decimal::new(52, 2),
        Currency::Usd => Decimal::new(14, 2),
        Currency::Eur => Decimal::new(13, 2),
    }
}

/// A snapshot of exchange rates relative to the base currency, with the
/// time it was last refreshed. Read-only to everything but `RateProvider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    pub rates: HashMap<Currency, Decimal>,
    pub last_refreshed: DateTime<Utc>,
}

impl ExchangeRateSet {
    /// The static fallback set, used until a fetch succeeds. Stamped at
    /// the epoch so a never-fetched cache always counts as stale and the
    /// first `get_rates` attempts a live fetch.
    pub fn fallback() -> Self {
        let rates = Currency::ALL
            .into_iter()
            .map(|c| (c, fallback_rate(c)))
            .collect();
        Self {
            rates,
            last_refreshed: DateTime::UNIX_EPOCH,
        }
    }

    /// Build a set from explicit rates; missing currencies fall back to
    /// the static defaults. Useful for fixed-rate providers in tests.
    pub fn with_rates(rates: HashMap<Currency, Decimal>) -> Self {
        let mut full: HashMap<Currency, Decimal> = Currency::ALL
            .into_iter()
            .map(|c| (c, fallback_rate(c)))
            .collect();
        full.extend(rates);
        Self {
            rates: full,
            last_refreshed: Utc::now(),
        }
    }

    /// Rate for converting 1 unit of the base currency into `currency`.
    pub fn rate(&self, currency: Currency) -> Decimal {
        if currency == BASE_CURRENCY {
            return Decimal::ONE;
        }
        self.rates
            .get(&currency)
            .copied()
            .unwrap_or_else(|| fallback_rate(currency))
    }

    /// Whether any rates were ever fetched (or loaded from a cache file),
    /// as opposed to the built-in fallback table.
    pub fn fetched(&self) -> bool {
        self.last_refreshed != DateTime::UNIX_EPOCH
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.last_refreshed
    }

    fn is_stale(&self) -> bool {
        self.age() > Duration::hours(MAX_RATE_AGE_HOURS)
    }
}

/// Failure to fetch rates from any configured source. Internal to the
/// rates module: ledger callers always get a cached or fallback set.
#[derive(Error, Debug)]
pub enum RateFetchError {
    #[error("no rate endpoints configured")]
    NoEndpoints,

    #[error("rate source request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rate source returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("rate source response missing usable rates")]
    MalformedResponse,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rates: HashMap<String, f64>,
}

/// Fetches and caches exchange rates.
///
/// The cache starts from static fallback defaults and is refreshed when
/// older than 4 hours. Fetch failures are logged and absorbed: a stale or
/// default rate is always preferable to blocking expense entry. With a
/// cache file attached, fetched rates survive process restarts, so
/// staleness accrues across invocations instead of resetting each run.
pub struct RateProvider {
    client: reqwest::Client,
    endpoints: Vec<String>,
    cache: Mutex<ExchangeRateSet>,
    cache_file: Option<PathBuf>,
}

impl RateProvider {
    /// Provider with the default public endpoints and fallback cache.
    pub fn new() -> Self {
        Self::with_endpoints(RATE_ENDPOINTS.iter().map(|s| s.to_string()).collect())
    }

    /// Provider fetching from the given endpoints, in order.
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            cache: Mutex::new(ExchangeRateSet::fallback()),
            cache_file: None,
        }
    }

    /// Attach a cache file: previously fetched rates are loaded from it
    /// now, and every successful refresh is written back. An unreadable
    /// file is treated as absent.
    pub fn with_cache_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if let Some(saved) = load_cache_file(&path) {
            *self.cache.lock().expect("rate cache poisoned") = saved;
        }
        self.cache_file = Some(path);
        self
    }

    /// Provider pinned to a fixed rate set; never touches the network.
    pub fn fixed(rates: ExchangeRateSet) -> Self {
        let provider = Self::with_endpoints(Vec::new());
        *provider.cache.lock().expect("rate cache poisoned") = rates;
        provider
    }

    /// Current rates, refreshing first if the cache is stale. Never fails:
    /// on fetch failure the last-known-good (or fallback) set is returned.
    pub async fn get_rates(&self) -> ExchangeRateSet {
        let stale = {
            let cache = self.cache.lock().expect("rate cache poisoned");
            !self.endpoints.is_empty() && cache.is_stale()
        };

        if stale {
            if let Err(err) = self.refresh().await {
                warn!("rate refresh failed, keeping cached rates: {err}");
            }
        }

        self.cache.lock().expect("rate cache poisoned").clone()
    }

    /// Fetch fresh rates from the first endpoint that answers, replacing
    /// the cache. Currencies missing from the response keep their cached
    /// value.
    pub async fn refresh(&self) -> Result<ExchangeRateSet, RateFetchError> {
        if self.endpoints.is_empty() {
            return Err(RateFetchError::NoEndpoints);
        }

        let mut last_err = RateFetchError::MalformedResponse;
        for endpoint in &self.endpoints {
            match self.fetch_from(endpoint).await {
                Ok(fetched) => {
                    let updated = {
                        let mut cache = self.cache.lock().expect("rate cache poisoned");
                        let mut rates = cache.rates.clone();
                        for (currency, rate) in fetched {
                            rates.insert(currency, rate);
                        }
                        *cache = ExchangeRateSet {
                            rates,
                            last_refreshed: Utc::now(),
                        };
                        cache.clone()
                    };
                    info!(
                        "exchange rates updated: 1 RMB = {} GBP, {} AED",
                        updated.rate(Currency::Gbp),
                        updated.rate(Currency::Aed)
                    );
                    self.store_cache(&updated);
                    return Ok(updated);
                }
                Err(err) => {
                    warn!("rate source {endpoint} failed: {err}");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }

    async fn fetch_from(
        &self,
        endpoint: &str,
    ) -> Result<HashMap<Currency, Decimal>, RateFetchError> {
        let response = self
            .client
            .get(endpoint)
            .timeout(StdDuration::from_secs(FETCH_TIMEOUT_SECS))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RateFetchError::Status(response.status()));
        }

        let body: RateResponse = response
            .json()
            .await
            .map_err(|_| RateFetchError::MalformedResponse)?;

        let mut rates = HashMap::new();
        for currency in Currency::ALL {
            if currency == BASE_CURRENCY {
                continue;
            }
            if let Some(value) = body.rates.get(currency.as_str()) {
                if let Ok(rate) = Decimal::try_from(*value) {
                    if rate > Decimal::ZERO {
                        rates.insert(currency, rate);
                    }
                }
            }
        }

        if rates.is_empty() {
            return Err(RateFetchError::MalformedResponse);
        }
        Ok(rates)
    }

    /// Write the given set to the cache file, if one is attached.
    /// Failures are logged and absorbed like fetch failures.
    fn store_cache(&self, rates: &ExchangeRateSet) {
        if let Some(path) = &self.cache_file {
            if let Err(err) = save_cache_file(path, rates) {
                warn!("failed to persist rate cache: {err:#}");
            }
        }
    }
}

fn load_cache_file(path: &Path) -> Option<ExchangeRateSet> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(saved) => Some(saved),
            Err(err) => {
                warn!("ignoring unparsable rate cache {}: {err}", path.display());
                None
            }
        },
        Err(err) => {
            warn!("ignoring unreadable rate cache {}: {err}", path.display());
            None
        }
    }
}

fn save_cache_file(path: &Path, rates: &ExchangeRateSet) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(rates).context("Failed to serialize rate cache")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl Default for RateProvider {
    fn default() -> Self {
        Self::new()
    }
}
