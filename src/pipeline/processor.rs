//! Poll cycle: fetch, filter, enrich, render, send, record.
//!
//! One `PollCycle` owns all per-process cycle state (in-flight flag, tick
//! counter, current phase). The timer and the `/check` endpoint both call
//! `trigger()`; a trigger that arrives mid-cycle returns `Skipped`.
//!
//! Delivery is idempotent: an identity is recorded only after the message
//! carrying it was sent, and recorded identities are never sent again.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Local;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::channels::{ChatSink, TelegramChannel};
use crate::config::{CycleConfig, NotifierConfig};
use crate::error::{self, PipelineError};
use crate::feed::{Deviation, DeviationFeed, FeedQuery, SlFeedClient};
use crate::pipeline::digest::{self, DigestRenderer};
use crate::pipeline::rules::{Classifier, CriticalityRules};
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::types::{ClassifiedReport, CycleOutcome, CyclePhase, CycleReport, Delivery};
use crate::store::{Ledger, LibSqlLedger};
use crate::translate::{GoogleTranslator, Translator};

/// Clears the in-flight flag when the cycle future completes or unwinds.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PollCycle {
    feed: Arc<dyn DeviationFeed>,
    sink: Arc<dyn ChatSink>,
    ledger: Arc<dyn Ledger>,
    destination: String,
    config: CycleConfig,
    summarizer: Summarizer,
    classifier: Classifier,
    renderer: DigestRenderer,
    running: AtomicBool,
    ticks: AtomicU64,
    phase: RwLock<CyclePhase>,
}

impl PollCycle {
    pub fn new(
        feed: Arc<dyn DeviationFeed>,
        translator: Arc<dyn Translator>,
        sink: Arc<dyn ChatSink>,
        ledger: Arc<dyn Ledger>,
        destination: impl Into<String>,
        config: CycleConfig,
    ) -> Self {
        let summarizer = Summarizer::new(
            translator,
            config.preferred_language.clone(),
            config.target_language.clone(),
        );
        let classifier = Classifier::new(CriticalityRules::default(), config.transport_mode.clone());

        Self {
            feed,
            sink,
            ledger,
            destination: destination.into(),
            config,
            summarizer,
            classifier,
            renderer: digest::build,
            running: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            phase: RwLock::new(CyclePhase::Idle),
        }
    }

    /// Open the ledger and build the SL feed, Google translator and Telegram
    /// clients described by `config`.
    pub async fn from_config(config: &NotifierConfig) -> error::Result<Self> {
        let ledger = LibSqlLedger::new_local(&config.state_db).await?;
        let feed = SlFeedClient::new()?;
        let translator = GoogleTranslator::new()?;
        let telegram = TelegramChannel::new(config.telegram.bot_token.clone())?;

        Ok(Self::new(
            Arc::new(feed),
            Arc::new(translator),
            Arc::new(telegram),
            Arc::new(ledger),
            config.telegram.chat_id.clone(),
            config.cycle.clone(),
        ))
    }

    /// Replace the criticality keyword lists and threshold.
    pub fn with_rules(mut self, rules: CriticalityRules) -> Self {
        self.classifier = Classifier::new(rules, self.config.transport_mode.clone());
        self
    }

    /// Replace the grouped digest renderer.
    pub fn with_renderer(mut self, renderer: DigestRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn phase(&self) -> CyclePhase {
        *self.phase.read().await
    }

    /// Completed (non-failed) cycles so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already in flight.
    pub async fn trigger(&self) -> CycleOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Poll cycle already running, skipping trigger");
            return CycleOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        let outcome = match self.run_cycle().await {
            Ok(report) => {
                info!(
                    fetched = report.fetched,
                    novel = report.novel,
                    unmapped = report.unmapped,
                    sent = report.sent,
                    recorded = report.recorded,
                    "Poll cycle finished"
                );
                self.finish_tick().await;
                CycleOutcome::Ran(report)
            }
            Err(e) => {
                error!(error = %e, "Poll cycle failed");
                CycleOutcome::Failed(e.to_string())
            }
        };

        *self.phase.write().await = CyclePhase::Idle;
        outcome
    }

    async fn enter(&self, report: &mut CycleReport, phase: CyclePhase) {
        debug!(phase = ?phase, "Poll cycle phase");
        *self.phase.write().await = phase;
        report.ended_in = Some(phase);
    }

    async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        let mut report = CycleReport::default();

        self.enter(&mut report, CyclePhase::Fetching).await;
        let query = FeedQuery {
            transport_mode: self.config.transport_mode.clone(),
            lines: self.config.lines.clone(),
            include_future: self.config.include_future,
        };
        info!(mode = %query.transport_mode, lines = ?query.lines, "Poll cycle started");
        let batch = self.feed.fetch(&query).await?;
        report.fetched = batch.len();

        self.enter(&mut report, CyclePhase::Filtering).await;
        let novel = self.filter_novel(batch).await?;
        report.novel = novel.len();
        if novel.is_empty() {
            debug!(fetched = report.fetched, "Nothing new");
            return Ok(report);
        }

        self.enter(&mut report, CyclePhase::Enriching).await;
        let mut classified = Vec::with_capacity(novel.len());
        for result in self.enrich(&novel).await {
            match result {
                Ok(item) => classified.push(item),
                Err(e) => {
                    error!(error = %e, "Dropping report from digest");
                    report.unmapped += 1;
                }
            }
        }
        if classified.is_empty() {
            warn!(unmapped = report.unmapped, "No report in this batch maps to a route group");
            return Ok(report);
        }

        self.enter(&mut report, CyclePhase::Rendering).await;
        let (critical, other) = digest::partition(classified);
        let text = match (self.renderer)(&critical, &other, Local::now().time()) {
            Ok(text) => text,
            Err(e) => {
                self.deliver_individually(&novel, e.to_string(), &mut report).await;
                return Ok(report);
            }
        };

        self.enter(&mut report, CyclePhase::Sending).await;
        if let Err(e) = self.sink.send(&self.destination, &text).await {
            error!(channel = self.sink.name(), error = %e, "Digest send failed");
            self.deliver_individually(&novel, e.to_string(), &mut report).await;
            return Ok(report);
        }
        report.sent = 1;
        report.delivery = Some(Delivery::Grouped);

        self.enter(&mut report, CyclePhase::Recording).await;
        for item in critical.iter().chain(&other) {
            if self.record(&item.identity()).await {
                report.recorded += 1;
            }
        }

        Ok(report)
    }

    /// Reports whose identity is not in the ledger, first occurrence only.
    async fn filter_novel(&self, batch: Vec<Deviation>) -> Result<Vec<Deviation>, PipelineError> {
        let mut seen = HashSet::new();
        let mut novel = Vec::new();
        for deviation in batch {
            let identity = deviation.identity();
            if !seen.insert(identity.clone()) {
                continue;
            }
            if self.ledger.already_notified(&identity).await? {
                continue;
            }
            novel.push(deviation);
        }
        Ok(novel)
    }

    /// Summarize and classify every report. Results follow input order.
    async fn enrich(&self, novel: &[Deviation]) -> Vec<Result<ClassifiedReport, PipelineError>> {
        let pending: Vec<BoxFuture<'_, Result<ClassifiedReport, PipelineError>>> = novel
            .iter()
            .map(|deviation| self.enrich_one(deviation).boxed())
            .collect();
        stream::iter(pending)
            .buffered(self.config.enrich_concurrency.max(1))
            .collect()
            .await
    }

    async fn enrich_one(&self, deviation: &Deviation) -> Result<ClassifiedReport, PipelineError> {
        let summary = self.summarizer.summarize(deviation).await;
        let classification = self.classifier.classify(deviation, &summary)?;
        Ok(ClassifiedReport::new(deviation.clone(), summary, classification))
    }

    /// One standalone message per novel report, each recorded right after
    /// its own send succeeds.
    async fn deliver_individually(&self, novel: &[Deviation], reason: String, report: &mut CycleReport) {
        warn!(reason = %reason, count = novel.len(), "Grouped digest unavailable, sending reports one by one");
        report.delivery = Some(Delivery::Fallback { reason });

        for deviation in novel {
            let identity = deviation.identity();
            let text = digest::render_single(deviation, &self.config.preferred_language);

            self.enter(report, CyclePhase::Sending).await;
            if let Err(e) = self.sink.send(&self.destination, &text).await {
                error!(identity = %identity, channel = self.sink.name(), error = %e, "Report send failed");
                continue;
            }
            report.sent += 1;

            self.enter(report, CyclePhase::Recording).await;
            if self.record(&identity).await {
                report.recorded += 1;
            }
        }
    }

    async fn record(&self, identity: &str) -> bool {
        match self.ledger.record_notified(identity).await {
            Ok(()) => true,
            Err(e) => {
                error!(identity, error = %e, "Sent but could not record in ledger");
                false
            }
        }
    }

    async fn finish_tick(&self) {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if tick % self.config.prune_every.max(1) != 0 {
            return;
        }
        match self.ledger.prune(self.config.prune_days).await {
            Ok(count) => info!(count, tick, "Ledger pruned"),
            Err(e) => warn!(error = %e, "Ledger prune failed"),
        }
    }
}
