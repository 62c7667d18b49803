use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// GDELT caps `maxrecords` at 250 per request.
pub const GDELT_MAX_RECORDS: u32 = 250;

/// Longest accepted search window, about a century.
pub const GDELT_MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Resolve a variable by name. `from_env` constructors pass `std::env::var`,
/// tests pass a map lookup.
pub trait Lookup {
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Read a required, non-empty variable.
pub fn require(lookup: &impl Lookup, name: &str) -> ConfigResult<String> {
    match lookup.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name.to_string())),
    }
}

/// Read an optional variable, falling back to `default` when unset or empty.
pub fn parse_or<T>(lookup: &impl Lookup, name: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup.get(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn string_or(lookup: &impl Lookup, name: &str, default: &str) -> String {
    lookup
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn invalid(name: &str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> ConfigResult<Self> {
        Ok(Self {
            url: require(lookup, "DATABASE_URL")?,
        })
    }
}

/// Article ingest settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdeltConfig {
    pub query: String,
    pub lookback_days: i64,
    pub num_records: u32,
    pub max_retries: u32,
    pub base_sleep_seconds: u64,
    /// Pause before the first request; rapid re-runs otherwise hit the limiter immediately.
    pub initial_delay_seconds: u64,
}

impl Default for GdeltConfig {
    fn default() -> Self {
        Self {
            query: "Apple".to_string(),
            lookback_days: 1,
            num_records: 10,
            max_retries: 8,
            base_sleep_seconds: 6,
            initial_delay_seconds: 2,
        }
    }
}

impl GdeltConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> ConfigResult<Self> {
        let d = Self::default();
        let config = Self {
            query: string_or(lookup, "GDELT_QUERY", &d.query),
            lookback_days: parse_or(lookup, "GDELT_LOOKBACK_DAYS", d.lookback_days)?,
            num_records: parse_or(lookup, "GDELT_NUM_RECORDS", d.num_records)?,
            max_retries: parse_or(lookup, "GDELT_MAX_RETRIES", d.max_retries)?,
            base_sleep_seconds: parse_or(lookup, "GDELT_BASE_SLEEP_SECONDS", d.base_sleep_seconds)?,
            initial_delay_seconds: parse_or(
                lookup,
                "GDELT_INITIAL_DELAY_SECONDS",
                d.initial_delay_seconds,
            )?,
        };

        if !(0..=GDELT_MAX_LOOKBACK_DAYS).contains(&config.lookback_days) {
            return Err(invalid("GDELT_LOOKBACK_DAYS", config.lookback_days, "must be within 0..=36500"));
        }
        if config.num_records == 0 || config.num_records > GDELT_MAX_RECORDS {
            return Err(invalid("GDELT_NUM_RECORDS", config.num_records, "must be within 1..=250"));
        }
        if config.max_retries == 0 {
            return Err(invalid("GDELT_MAX_RETRIES", config.max_retries, "must be at least 1"));
        }

        Ok(config)
    }
}

/// Price ingest settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceConfig {
    pub ticker: String,
    pub period: String,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            period: "100d".to_string(),
        }
    }
}

impl PriceConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> ConfigResult<Self> {
        let d = Self::default();
        Ok(Self {
            ticker: string_or(lookup, "PRICE_TICKER", &d.ticker).to_ascii_uppercase(),
            period: string_or(lookup, "PRICE_PERIOD", &d.period),
        })
    }
}

/// Scoring job settings. Model/backend settings live with the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub limit: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { limit: 200 }
    }
}

impl ScoringConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> ConfigResult<Self> {
        let limit = parse_or(lookup, "SCORE_LIMIT", Self::default().limit)?;
        if limit <= 0 {
            return Err(invalid("SCORE_LIMIT", limit, "must be positive"));
        }
        Ok(Self { limit })
    }
}
