//! Converter screen state and the two operations that mutate it.
//!
//! [`Screen`] owns everything the user sees: the amount being typed, the two
//! picker selections, the loaded currency list, the last successful result,
//! the loading flag and a one-shot notification. Drivers pass it by `&mut` to
//! each handler; nothing else writes to it.

use super::config::AppConfig;
use super::convert::{ConversionRequest, ConversionResult, convert};
use super::rates::{RateProvider, RateTable, currency_codes, search_codes};
use anyhow::Result;
use std::fmt::Display;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    InvalidInput,
    Error,
}

/// A user-visible message raised once and then taken by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, message: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    fn invalid_amount() -> Self {
        Self::new(
            NoticeKind::InvalidInput,
            "Invalid Input",
            "Please enter a valid amount.",
        )
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Settled(Outcome),
}

/// An issued conversion awaiting its rate table.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    pub request: ConversionRequest,
}

pub struct Screen {
    base_currency: String,
    excluded_codes: Vec<String>,
    amount: String,
    source: String,
    target: String,
    currencies: Vec<String>,
    result: Option<ConversionResult>,
    status: Status,
    notice: Option<Notice>,
    mounted: bool,
    last_ticket: u64,
}

impl Screen {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_currency: config.base_currency.to_uppercase(),
            excluded_codes: config.excluded_codes.clone(),
            amount: String::new(),
            source: config.default_source.to_uppercase(),
            target: config.default_target.to_uppercase(),
            currencies: Vec::new(),
            result: None,
            status: Status::Idle,
            notice: None,
            mounted: false,
            last_ticket: 0,
        }
    }

    /// Loads the currency list. Only the first call per screen does any work.
    pub async fn mount(&mut self, provider: &dyn RateProvider) {
        let Some(base) = self.begin_mount() else {
            return;
        };
        let fetched = provider.fetch_rates(&base).await;
        self.finish_mount(fetched);
    }

    /// Marks the screen mounted and returns the base currency to fetch, or
    /// `None` when the list was already requested.
    pub fn begin_mount(&mut self) -> Option<String> {
        if self.mounted {
            debug!("Screen already mounted, skipping currency load");
            return None;
        }
        self.mounted = true;
        Some(self.base_currency.clone())
    }

    pub fn finish_mount(&mut self, fetched: Result<RateTable>) {
        match fetched {
            Ok(table) => {
                self.currencies = currency_codes(&table, &self.excluded_codes);
                info!(count = self.currencies.len(), "Loaded currency list");
            }
            Err(e) => {
                warn!(error = %e, "Failed to load currency list");
                self.notice = Some(Notice::new(
                    NoticeKind::Error,
                    "Error",
                    "Failed to fetch currencies.",
                ));
            }
        }
    }

    pub fn set_amount(&mut self, amount: &str) {
        self.amount = amount.to_string();
    }

    pub fn select_source(&mut self, code: &str) -> bool {
        match self.validate_code(code) {
            Some(code) => {
                self.source = code;
                true
            }
            None => false,
        }
    }

    pub fn select_target(&mut self, code: &str) -> bool {
        match self.validate_code(code) {
            Some(code) => {
                self.target = code;
                true
            }
            None => false,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.source, &mut self.target);
    }

    fn validate_code(&mut self, code: &str) -> Option<String> {
        let code = code.trim().to_uppercase();
        if self.currencies.contains(&code) {
            return Some(code);
        }
        let message = if self.currencies.is_empty() {
            "The currency list is not loaded.".to_string()
        } else {
            format!("{code} is not an available currency.")
        };
        self.notice = Some(Notice::new(
            NoticeKind::InvalidInput,
            "Invalid Currency",
            &message,
        ));
        None
    }

    pub fn search(&self, query: &str) -> Vec<&str> {
        search_codes(&self.currencies, query)
    }

    /// Validates the current input and moves to `Loading`.
    ///
    /// Returns `None` without touching the network state when the amount is
    /// invalid; an invalid-input notice is raised instead.
    pub fn begin_convert(&mut self) -> Option<Ticket> {
        let request = match ConversionRequest::parse(&self.amount, &self.source, &self.target) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected amount");
                self.notice = Some(Notice::invalid_amount());
                return None;
            }
        };

        self.last_ticket += 1;
        self.status = Status::Loading;
        debug!(ticket = self.last_ticket, ?request, "Conversion started");
        Some(Ticket {
            id: self.last_ticket,
            request,
        })
    }

    /// Applies the fetched table for `ticket`. Completions of superseded
    /// tickets are dropped and reported as `false`.
    pub fn finish_convert(&mut self, ticket: Ticket, fetched: Result<RateTable>) -> bool {
        if ticket.id != self.last_ticket {
            debug!(
                ticket = ticket.id,
                latest = self.last_ticket,
                "Discarding stale conversion"
            );
            return false;
        }

        match fetched.and_then(|table| convert(ticket.request, &table)) {
            Ok(result) => {
                info!(result = %result, "Conversion succeeded");
                self.result = Some(result);
                self.status = Status::Settled(Outcome::Success);
            }
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                self.notice = Some(Notice::new(
                    NoticeKind::Error,
                    "Error",
                    "Failed to fetch exchange rates.",
                ));
                self.status = Status::Settled(Outcome::Error);
            }
        }
        true
    }

    /// Runs one full conversion against `provider`.
    pub async fn convert(&mut self, provider: &dyn RateProvider) {
        let Some(ticket) = self.begin_convert() else {
            return;
        };
        let fetched = provider.fetch_rates(&ticket.request.source).await;
        self.finish_convert(ticket, fetched);
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockRateProvider {
        call_count: AtomicUsize,
        tables: BTreeMap<String, BTreeMap<String, f64>>,
        fail: bool,
        requested: Mutex<Vec<String>>,
    }

    impl MockRateProvider {
        fn new() -> Self {
            let usd = [("USD", 1.0), ("EUR", 0.9), ("JPY", 150.0), ("ALL", 1.0)];
            let eur = [("EUR", 1.0), ("USD", 1.1), ("JPY", 165.0)];
            let to_map = |rates: &[(&str, f64)]| -> BTreeMap<String, f64> {
                rates.iter().map(|(k, v)| (k.to_string(), *v)).collect()
            };
            Self {
                call_count: AtomicUsize::new(0),
                tables: [
                    ("USD".to_string(), to_map(&usd[..])),
                    ("EUR".to_string(), to_map(&eur[..])),
                ]
                .into_iter()
                .collect(),
                fail: false,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for MockRateProvider {
        async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(base.to_string());
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            self.tables
                .get(base)
                .map(|rates| RateTable::new(base, rates.clone()))
                .ok_or_else(|| anyhow!("unsupported-code"))
        }
    }

    async fn mounted_screen(provider: &MockRateProvider) -> Screen {
        let mut screen = Screen::new(&AppConfig::default());
        screen.mount(provider).await;
        screen
    }

    #[tokio::test]
    async fn test_mount_loads_currencies_without_sentinel() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;

        assert_eq!(screen.currencies(), ["EUR", "JPY", "USD"]);
        assert_eq!(*provider.requested.lock().unwrap(), vec!["USD"]);
        assert!(screen.take_notice().is_none());
        assert_eq!(screen.status(), Status::Idle);
    }

    #[tokio::test]
    async fn test_mount_runs_once() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;
        screen.mount(&provider).await;
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_begin_mount_only_once() {
        let mut screen = Screen::new(&AppConfig::default());
        assert_eq!(screen.begin_mount().as_deref(), Some("USD"));
        assert!(screen.begin_mount().is_none());

        screen.finish_mount(Err(anyhow!("dns failure")));
        assert!(screen.currencies().is_empty());
        assert_eq!(screen.take_notice().unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_mount_failure_leaves_list_empty() {
        let provider = MockRateProvider::failing();
        let mut screen = mounted_screen(&provider).await;

        assert!(screen.currencies().is_empty());
        let notice = screen.take_notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.to_string(), "Error: Failed to fetch currencies.");
        assert!(screen.take_notice().is_none());
    }

    #[tokio::test]
    async fn test_convert_success() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;

        screen.set_amount("10");
        screen.convert(&provider).await;

        assert_eq!(screen.result().unwrap().to_string(), "10 USD = 9.00 EUR");
        assert_eq!(screen.status(), Status::Settled(Outcome::Success));
        assert!(screen.take_notice().is_none());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_amount_skips_network() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;

        for amount in ["", "abc"] {
            screen.set_amount(amount);
            screen.convert(&provider).await;

            let notice = screen.take_notice().unwrap();
            assert_eq!(notice.kind, NoticeKind::InvalidInput);
            assert_eq!(
                notice.to_string(),
                "Invalid Input: Please enter a valid amount."
            );
        }
        assert_eq!(provider.calls(), 1);
        assert_eq!(screen.status(), Status::Idle);
        assert!(screen.result().is_none());
    }

    #[tokio::test]
    async fn test_failed_convert_keeps_previous_result() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;
        screen.set_amount("10");
        screen.convert(&provider).await;

        let failing = MockRateProvider::failing();
        screen.set_amount("20");
        screen.convert(&failing).await;

        assert_eq!(screen.result().unwrap().to_string(), "10 USD = 9.00 EUR");
        assert_eq!(screen.status(), Status::Settled(Outcome::Error));
        assert_eq!(
            screen.take_notice().unwrap().to_string(),
            "Error: Failed to fetch exchange rates."
        );
    }

    #[tokio::test]
    async fn test_missing_target_rate_is_an_error() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;

        // JPY table is unknown to the mock provider
        assert!(screen.select_source("jpy"));
        screen.set_amount("5");
        screen.convert(&provider).await;

        assert!(screen.result().is_none());
        assert_eq!(screen.take_notice().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn test_loading_between_begin_and_finish() {
        let mut screen = Screen::new(&AppConfig::default());
        screen.set_amount("1");

        let ticket = screen.begin_convert().unwrap();
        assert!(screen.is_loading());
        screen.finish_convert(ticket, Err(anyhow!("timeout")));
        assert!(!screen.is_loading());

        let ticket = screen.begin_convert().unwrap();
        assert!(screen.is_loading());
        let rates = [("EUR".to_string(), 0.5)].into_iter().collect();
        screen.finish_convert(ticket, Ok(RateTable::new("USD", rates)));
        assert!(!screen.is_loading());
        assert_eq!(screen.result().unwrap().to_string(), "1 USD = 0.50 EUR");
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut screen = Screen::new(&AppConfig::default());
        let usd = |rate: f64| {
            let rates = [("EUR".to_string(), rate)].into_iter().collect();
            Ok(RateTable::new("USD", rates))
        };

        screen.set_amount("1");
        let first = screen.begin_convert().unwrap();
        screen.set_amount("2");
        let second = screen.begin_convert().unwrap();

        assert!(screen.finish_convert(second, usd(0.9)));
        assert!(!screen.finish_convert(first, usd(0.8)));

        assert_eq!(screen.result().unwrap().to_string(), "2 USD = 1.80 EUR");
        assert_eq!(screen.status(), Status::Settled(Outcome::Success));
    }

    #[tokio::test]
    async fn test_pickers_require_loaded_codes() {
        let provider = MockRateProvider::new();
        let mut screen = mounted_screen(&provider).await;

        assert!(screen.select_target(" jpy "));
        assert_eq!(screen.target(), "JPY");

        assert!(!screen.select_target("ALL"));
        assert_eq!(screen.target(), "JPY");
        let notice = screen.take_notice().unwrap();
        assert_eq!(notice.title, "Invalid Currency");
        assert_eq!(notice.message, "ALL is not an available currency.");

        screen.swap();
        assert_eq!(screen.source(), "JPY");
        assert_eq!(screen.target(), "USD");

        assert_eq!(screen.search("j"), vec!["JPY"]);
    }

    #[test]
    fn test_pickers_without_currency_list() {
        let mut screen = Screen::new(&AppConfig::default());
        assert!(!screen.select_source("EUR"));
        assert_eq!(screen.source(), "USD");
        assert_eq!(
            screen.take_notice().unwrap().message,
            "The currency list is not loaded."
        );
    }
}
