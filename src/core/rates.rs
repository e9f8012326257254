//! Exchange rate tables and the provider abstraction

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Rates for one base currency, keyed by currency code.
///
/// Each rate is the amount of that currency per one unit of `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RateTable {
    pub fn new(base: &str, rates: BTreeMap<String, f64>) -> Self {
        Self {
            base: base.to_uppercase(),
            rates,
            last_updated: None,
        }
    }

    /// Rate for `code`, rejecting entries that are missing or not a usable rate.
    pub fn rate(&self, code: &str) -> Result<f64> {
        let rate = *self
            .rates
            .get(code)
            .ok_or_else(|| anyhow!("No rate for {} in {} table", code, self.base))?;
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Invalid rate {} for {} in {} table", rate, code, self.base);
        }
        Ok(rate)
    }
}

/// Currency codes of `table` without the excluded sentinel keys.
pub fn currency_codes(table: &RateTable, excluded: &[String]) -> Vec<String> {
    table
        .rates
        .keys()
        .filter(|code| !excluded.iter().any(|e| e.eq_ignore_ascii_case(code)))
        .cloned()
        .collect()
}

/// Case-insensitive substring search over `codes`, keeping their order.
pub fn search_codes<'a>(codes: &'a [String], query: &str) -> Vec<&'a str> {
    let query = query.trim().to_uppercase();
    codes
        .iter()
        .filter(|code| code.to_uppercase().contains(&query))
        .map(String::as_str)
        .collect()
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<RateTable>;
}
