use crate::chain::{InstrumentChain, Quote};
use crate::config::AppConfig;
use crate::deribit::client::DeribitClient;
use crate::errors::EngineResult;
use crate::polymarket::client::GammaClient;
use crate::polymarket::discovery::TouchMarketParser;
use crate::scan::orchestrator::run_scan;
use crate::scan::report::ScanReport;
use crate::scan::ScanSettings;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct ScanCounters {
    pub scans_run: AtomicU64,
    pub observations_processed: AtomicU64,
    pub observations_skipped: AtomicU64,
    pub collaborator_errors: AtomicU64,
}

impl ScanCounters {
    pub fn new() -> Self {
        Self {
            scans_run: AtomicU64::new(0),
            observations_processed: AtomicU64::new(0),
            observations_skipped: AtomicU64::new(0),
            collaborator_errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            scans_run: self.scans_run.load(Ordering::Relaxed),
            observations_processed: self.observations_processed.load(Ordering::Relaxed),
            observations_skipped: self.observations_skipped.load(Ordering::Relaxed),
            collaborator_errors: self.collaborator_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for ScanCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CountersSnapshot {
    pub scans_run: u64,
    pub observations_processed: u64,
    pub observations_skipped: u64,
    pub collaborator_errors: u64,
}

// ── Application shared state (no cached market data) ──

pub struct AppState {
    pub config: AppConfig,
    pub deribit: DeribitClient,
    pub gamma: GammaClient,
    pub parser: TouchMarketParser,
    pub counters: ScanCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> EngineResult<Arc<Self>> {
        let deribit = DeribitClient::new(&config.deribit_base_url, config.http_timeout_secs);
        let gamma = GammaClient::new(&config.gamma_base_url, config.http_timeout_secs);
        let parser = TouchMarketParser::new(&config.underlying)?;
        Ok(Arc::new(Self {
            config,
            deribit,
            gamma,
            parser,
            counters: ScanCounters::new(),
        }))
    }

    /// Fetches the chain fresh. Nothing is kept between calls.
    pub async fn fetch_chain(&self) -> EngineResult<InstrumentChain> {
        self.deribit
            .get_option_chain(&self.config.underlying)
            .await
            .inspect_err(|_| self.record_error())
    }

    /// Fetches chain and markets concurrently, then runs one scan.
    pub async fn run_fresh_scan(&self) -> EngineResult<ScanReport> {
        let markets = async {
            self.gamma
                .get_active_markets(self.config.gamma_page_limit, self.config.gamma_max_markets)
                .await
                .inspect_err(|_| self.record_error())
        };
        let (chain, markets) = tokio::try_join!(self.fetch_chain(), markets)?;

        let observations = self.parser.observations(&markets);
        let as_of = chrono::Utc::now();
        let settings = ScanSettings::from(&self.config);
        let outcome = run_scan(&chain, &observations, as_of, &settings);

        self.counters.scans_run.fetch_add(1, Ordering::Relaxed);
        self.counters
            .observations_processed
            .fetch_add(outcome.results.len() as u64, Ordering::Relaxed);
        self.counters
            .observations_skipped
            .fetch_add(outcome.skipped.len() as u64, Ordering::Relaxed);

        let spot = chain.quotes().iter().find_map(Quote::spot);
        Ok(ScanReport::new(chain.underlying(), spot, chain.len(), as_of, outcome))
    }

    #[inline]
    fn record_error(&self) {
        self.counters.collaborator_errors.fetch_add(1, Ordering::Relaxed);
    }
}
