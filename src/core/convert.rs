//! Amount parsing and conversion formatting

use super::rates::RateTable;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    /// Amount as the user typed it, echoed back in the result line
    pub amount_text: String,
    pub source: String,
    pub target: String,
}

impl ConversionRequest {
    /// Validates the raw amount. Empty or non-finite input is rejected.
    pub fn parse(amount: &str, source: &str, target: &str) -> Result<Self> {
        let amount_text = amount.trim();
        if amount_text.is_empty() {
            return Err(anyhow!("Amount is empty"));
        }
        let value: f64 = amount_text
            .parse()
            .map_err(|_| anyhow!("Amount is not a number: {}", amount_text))?;
        if !value.is_finite() {
            return Err(anyhow!("Amount is not finite: {}", amount_text));
        }

        Ok(Self {
            amount: value,
            amount_text: amount_text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub request: ConversionRequest,
    pub rate: f64,
    /// Unrounded `amount * rate`; rounded to 2 places only when displayed
    pub converted: f64,
    pub rates_updated: Option<DateTime<Utc>>,
}

impl Display for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} = {:.2} {}",
            self.request.amount_text, self.request.source, self.converted, self.request.target
        )
    }
}

/// Converts `request` using a table anchored at the request's source currency.
pub fn convert(request: ConversionRequest, table: &RateTable) -> Result<ConversionResult> {
    if !table.base.eq_ignore_ascii_case(&request.source) {
        return Err(anyhow!(
            "Rate table base {} does not match source {}",
            table.base,
            request.source
        ));
    }
    let rate = table.rate(&request.target)?;
    let converted = request.amount * rate;
    if !converted.is_finite() {
        return Err(anyhow!(
            "Converted amount overflows: {} {} at rate {}",
            request.amount_text,
            request.source,
            rate
        ));
    }

    Ok(ConversionResult {
        request,
        rate,
        converted,
        rates_updated: table.last_updated,
    })
}
