//! The ingest control loop
//!
//! One run handles one query: discover pages, collect links, reconcile them
//! against the corpus, tag what is known, fetch what is new, and checkpoint
//! along the way. Nothing survives between runs except what the store holds.

use crate::config::Config;
use crate::crawler::{DetailFetcher, LinkCollector, PageLister, PageLoader};
use crate::ingest::batch::PendingBatch;
use crate::ingest::checkpoint::CheckpointWriter;
use crate::ingest::planner::plan;
use crate::ingest::report::RunReport;
use crate::state::IngestPhase;
use crate::storage::Store;
use crate::url::SearchQuery;
use crate::{HarvestError, Result};
use std::time::Duration;

/// Pacing, timeout and checkpoint settings for the orchestrator
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Search endpoint queries are appended to
    pub base_url: String,
    /// Pause after every result-page load
    pub page_delay: Duration,
    /// Pause after every detail fetch attempt
    pub item_delay: Duration,
    /// Upper bound on one page load or detail fetch
    pub page_timeout: Duration,
    /// Successful fetches between checkpoints
    pub checkpoint_interval: usize,
    /// Consecutive checkpoint failures before they log at ERROR
    pub max_flush_failures: u32,
    /// Attempts at the final checkpoint before the run fails
    pub final_flush_attempts: u32,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;
        Self {
            base_url: config.source.base_url.clone(),
            page_delay: Duration::from_millis(crawler.page_delay_ms),
            item_delay: Duration::from_millis(crawler.item_delay_ms),
            page_timeout: Duration::from_secs(crawler.page_timeout_secs),
            checkpoint_interval: crawler.checkpoint_interval,
            max_flush_failures: crawler.max_flush_failures,
            final_flush_attempts: crawler.final_flush_attempts,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        let crawler = crate::config::CrawlerConfig::default();
        Self {
            base_url: crate::config::SourceConfig::default().base_url,
            page_delay: Duration::from_millis(crawler.page_delay_ms),
            item_delay: Duration::from_millis(crawler.item_delay_ms),
            page_timeout: Duration::from_secs(crawler.page_timeout_secs),
            checkpoint_interval: crawler.checkpoint_interval,
            max_flush_failures: crawler.max_flush_failures,
            final_flush_attempts: crawler.final_flush_attempts,
        }
    }
}

/// Runs queries against a page loader, a detail fetcher and a store
pub struct IngestOrchestrator<L, F, S> {
    loader: L,
    fetcher: F,
    store: S,
    settings: IngestSettings,
}

impl<L, F, S> IngestOrchestrator<L, F, S>
where
    L: PageLoader,
    F: DetailFetcher,
    S: Store,
{
    pub fn new(loader: L, fetcher: F, store: S, settings: IngestSettings) -> Self {
        Self {
            loader,
            fetcher,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Checks that the store and the detail backend are reachable
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Both answered
    /// * `Err(HarvestError::StoreUnavailable)` - The store could not be read
    /// * `Err(HarvestError::FetcherUnavailable)` - The probe failed or timed out
    pub async fn preflight(&self) -> Result<()> {
        self.store
            .count()
            .map_err(|e| HarvestError::StoreUnavailable(e.to_string()))?;

        tokio::time::timeout(self.settings.page_timeout, self.fetcher.probe())
            .await
            .map_err(|_| {
                HarvestError::FetcherUnavailable(format!(
                    "probe timed out after {:?}",
                    self.settings.page_timeout
                ))
            })?
            .map_err(|e| HarvestError::FetcherUnavailable(e.to_string()))?;

        Ok(())
    }

    /// Runs every query in order, one after the other
    ///
    /// Stops at the first fatal error; reports of the queries that finished
    /// before it are lost to the caller, but their records are stored.
    pub async fn run_all(&mut self, queries: &[SearchQuery]) -> Result<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(queries.len());
        for query in queries {
            reports.push(self.run(query).await?);
        }
        Ok(reports)
    }

    /// Ingests one query end to end
    ///
    /// Page, item and intermediate checkpoint failures are recorded in the
    /// report. Only an unreachable backend, a failed final checkpoint or an
    /// internal phase error fail the run.
    pub async fn run(&mut self, query: &SearchQuery) -> Result<RunReport> {
        let search_url = query.search_url(&self.settings.base_url)?;
        let token = query.token();
        let mut report = RunReport::new(&token);

        tracing::info!("Starting run for query '{}'", token);
        self.preflight().await?;

        advance(&mut report, IngestPhase::DiscoveringPages)?;
        let pages = PageLister::new(&self.loader, self.settings.page_timeout)
            .total_pages(&search_url)
            .await;
        report.total_pages = pages.total;
        report.pages_degraded = pages.degraded;

        advance(&mut report, IngestPhase::CollectingLinks)?;
        let collection = LinkCollector::new(
            &self.loader,
            self.settings.page_timeout,
            self.settings.page_delay,
        )
        .collect(&search_url, pages.total)
        .await;
        report.links_collected = collection.identifiers.len();
        report.failed_pages = collection.failed_pages;

        advance(&mut report, IngestPhase::Reconciling)?;
        let known = self
            .store
            .list_known()
            .map_err(|e| HarvestError::StoreUnavailable(e.to_string()))?;
        let plan = plan(&collection.identifiers, &known);
        report.known = plan.to_tag.len();
        report.to_fetch = plan.to_fetch.len();
        tracing::info!(
            "Query '{}': {} known, {} new",
            token,
            plan.to_tag.len(),
            plan.to_fetch.len()
        );

        advance(&mut report, IngestPhase::TaggingExisting)?;
        let mut batch = PendingBatch::new(&token);
        for identifier in &plan.to_tag {
            batch.queue_tag(identifier);
        }

        advance(&mut report, IngestPhase::FetchingNew)?;
        let mut writer = CheckpointWriter::new(self.settings.max_flush_failures);
        let interval = self.settings.checkpoint_interval.max(1);
        let total = plan.to_fetch.len();
        let mut successes = 0usize;

        for (i, identifier) in plan.to_fetch.iter().enumerate() {
            let fetched =
                tokio::time::timeout(self.settings.page_timeout, self.fetcher.fetch(identifier))
                    .await;

            let succeeded = match fetched {
                Ok(Ok(record)) => {
                    batch.queue_insert(record);
                    successes += 1;
                    tracing::debug!("Fetched {}/{}: {}", i + 1, total, identifier);
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        "Skipping {} for query '{}': {}",
                        identifier,
                        token,
                        e
                    );
                    report.skipped.push(identifier.clone());
                    false
                }
                Err(_) => {
                    tracing::warn!(
                        "Skipping {} for query '{}': timed out after {:?}",
                        identifier,
                        token,
                        self.settings.page_timeout
                    );
                    report.skipped.push(identifier.clone());
                    false
                }
            };

            tokio::time::sleep(self.settings.item_delay).await;

            let is_last = i + 1 == total;
            if succeeded && successes % interval == 0 && !is_last {
                advance(&mut report, IngestPhase::Flushing)?;
                self.checkpoint(&mut writer, &mut batch, &mut report, successes);
                advance(&mut report, IngestPhase::FetchingNew)?;
            }
        }

        advance(&mut report, IngestPhase::Flushing)?;
        self.final_checkpoint(&mut writer, &mut batch, &mut report, successes)
            .await?;

        advance(&mut report, IngestPhase::Done)?;
        report.finish();

        tracing::info!(
            "Finished query '{}': {} new, {} tagged, {} skipped, {} pages failed",
            token,
            report.new_records,
            report.tagged_records,
            report.skipped.len(),
            report.failed_pages.len()
        );

        Ok(report)
    }

    /// Intermediate checkpoint; a failure keeps the batch for the next one
    fn checkpoint(
        &mut self,
        writer: &mut CheckpointWriter,
        batch: &mut PendingBatch,
        report: &mut RunReport,
        position: usize,
    ) {
        match writer.flush(&mut self.store, batch) {
            Ok(flush) => {
                report.record_flush(position, &flush);
                batch.clear();
            }
            Err(_) => report.flush_failures += 1,
        }
    }

    /// Last checkpoint of a run, retried before giving up
    async fn final_checkpoint(
        &mut self,
        writer: &mut CheckpointWriter,
        batch: &mut PendingBatch,
        report: &mut RunReport,
        position: usize,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let attempts = self.settings.final_flush_attempts.max(1);
        let mut attempt = 1;

        loop {
            match writer.flush(&mut self.store, batch) {
                Ok(flush) => {
                    report.record_flush(position, &flush);
                    batch.clear();
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    report.flush_failures += 1;
                    tracing::warn!(
                        "Final checkpoint attempt {}/{} for query '{}' failed: {}",
                        attempt,
                        attempts,
                        batch.query(),
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.settings.item_delay).await;
                }
                Err(e) => {
                    report.flush_failures += 1;
                    return Err(HarvestError::Checkpoint {
                        query: batch.query().to_string(),
                        pending: batch.len(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// Moves the run into `next`, refusing transitions the pipeline never makes
fn advance(report: &mut RunReport, next: IngestPhase) -> Result<()> {
    let current = report.phase();
    if !current.can_transition_to(next) {
        return Err(HarvestError::InvalidTransition {
            from: current,
            to: next,
        });
    }
    tracing::debug!("Query '{}': {} -> {}", report.query, current, next);
    report.phases.push(next);
    Ok(())
}
