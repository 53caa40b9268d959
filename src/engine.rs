//! Poll loop.
//!
//! One `Monitor` per process. `run` ticks every `poll_interval` and calls
//! `run_cycle`, which walks a snapshot of the active requests:
//! fetch → classify → deactivate → notify. Deactivation happens before the
//! notification and only the caller that actually flipped the request sends
//! it, so an owner hears about a request at most once.

use crate::config::SchedulerConfig;
use crate::error::FetchError;
use crate::messages;
use crate::services::{ActivityLogger, LogLevel, Notifier, Registry};
use crate::tools::classify::Classifier;
use crate::tools::fetch::PageFetcher;
use crate::types::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// Pause between two requests of one cycle.
    pub request_delay: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl MonitorOptions {
    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            request_delay: cfg.request_delay(),
        }
    }
}

/// Outcome of one pass over the active requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Another cycle was running; nothing was done.
    pub busy: bool,
    pub checked: usize,
    /// Deactivated between snapshot and check.
    pub skipped: usize,
    pub available: usize,
    pub failed: usize,
    pub notified: usize,
    pub notify_failures: usize,
}

/// Verdict plus the page it was drawn from.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub verdict: Verdict,
    pub page: PageContent,
}

/// Fetch and classify one target for one stay.
pub async fn inspect(
    fetcher: &dyn PageFetcher,
    classifier: &Classifier,
    target: &Target,
    params: &SearchParams,
) -> Result<Inspection, FetchError> {
    let page = fetcher.fetch(target.effective_url(), params).await?;
    let verdict = classifier.classify(&page.body);
    tracing::debug!(
        url = %page.final_url,
        available = verdict.available,
        rule = ?verdict.rule,
        reason = %verdict.reason,
        "classified"
    );
    Ok(Inspection { verdict, page })
}

pub struct Monitor {
    registry: Arc<dyn Registry>,
    fetcher: Arc<dyn PageFetcher>,
    classifier: Classifier,
    notifier: Arc<dyn Notifier>,
    opts: MonitorOptions,
    activity: Option<ActivityLogger>,
    cycle: Mutex<()>,
}

impl Monitor {
    pub fn new(
        registry: Arc<dyn Registry>,
        fetcher: Arc<dyn PageFetcher>,
        classifier: Classifier,
        notifier: Arc<dyn Notifier>,
        opts: MonitorOptions,
    ) -> Self {
        Self {
            registry,
            fetcher,
            classifier,
            notifier,
            opts,
            activity: None,
            cycle: Mutex::new(()),
        }
    }

    pub fn with_activity_log(mut self, logger: ActivityLogger) -> Self {
        self.activity = Some(logger);
        self
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.opts
    }

    pub(crate) fn record(&self, level: LogLevel, owner: Option<&Owner>, event: &str, details: &str) {
        if let Some(log) = &self.activity {
            log.record(level, owner.map(|o| o.0.as_str()), event, Some(details));
        }
    }

    pub async fn inspect(&self, request: &MonitoringRequest) -> Result<Inspection, FetchError> {
        inspect(
            self.fetcher.as_ref(),
            &self.classifier,
            &request.target,
            &request.params(),
        )
        .await
    }

    pub async fn check(&self, request: &MonitoringRequest) -> Result<Verdict, FetchError> {
        Ok(self.inspect(request).await?.verdict)
    }

    /// Re-read `id`; `None` (counted as skipped or failed) once it was stopped.
    fn still_active(&self, id: &RequestId, report: &mut CycleReport) -> Option<MonitoringRequest> {
        match self.registry.get(id) {
            Ok(Some(r)) if r.active => Some(r),
            Ok(_) => {
                report.skipped += 1;
                None
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "cannot re-read request");
                report.failed += 1;
                None
            }
        }
    }

    /// One pass over the active requests. Never overlaps with another pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let Ok(_running) = self.cycle.try_lock() else {
            tracing::warn!("previous cycle still running, skipping");
            return CycleReport {
                busy: true,
                ..CycleReport::default()
            };
        };

        let mut report = CycleReport::default();
        let started = Instant::now();
        let snapshot = match self.registry.list_active() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "cannot list active requests");
                report.failed += 1;
                return report;
            }
        };
        tracing::info!(active = snapshot.len(), "cycle started");

        for queued in &snapshot {
            let Some(mut request) = self.still_active(&queued.id, &mut report) else {
                continue;
            };
            // pace between pages actually fetched
            if report.checked > 0 && !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay).await;
                match self.still_active(&queued.id, &mut report) {
                    Some(r) => request = r,
                    None => continue,
                }
            }

            report.checked += 1;
            self.check_one(&request, &mut report).await;
        }

        tracing::info!(
            checked = report.checked,
            skipped = report.skipped,
            available = report.available,
            failed = report.failed,
            notified = report.notified,
            notify_failures = report.notify_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle finished"
        );
        if !snapshot.is_empty() {
            self.record(
                LogLevel::Info,
                None,
                "cycle",
                &format!(
                    "checked={} available={} failed={} notified={}",
                    report.checked, report.available, report.failed, report.notified
                ),
            );
        }
        report
    }

    async fn check_one(&self, request: &MonitoringRequest, report: &mut CycleReport) {
        let owner = &request.owner;
        let inspection = match self.inspect(request).await {
            Ok(i) => i,
            Err(e) => {
                tracing::warn!(id = %request.id, owner = %owner, error = %e, "check failed");
                report.failed += 1;
                self.record(LogLevel::Error, Some(owner), "fetch_failed", &e.to_string());
                return;
            }
        };

        if !inspection.verdict.available {
            tracing::debug!(id = %request.id, reason = %inspection.verdict.reason, "still unavailable");
            return;
        }
        report.available += 1;

        match self.registry.deactivate(&request.id, Deactivation::Available) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(id = %request.id, "already deactivated, not notifying");
                return;
            }
            Err(e) => {
                tracing::error!(id = %request.id, error = %e, "cannot deactivate request");
                report.failed += 1;
                return;
            }
        }
        self.record(
            LogLevel::Info,
            Some(owner),
            "available",
            &format!("{} {}", request.id, inspection.verdict.reason),
        );

        let text = messages::became_available(request, &inspection.page.final_url);
        match self.notifier.notify(owner, &text).await {
            Ok(()) => {
                report.notified += 1;
                tracing::info!(id = %request.id, owner = %owner, "owner notified");
                self.record(LogLevel::Info, Some(owner), "notified", &request.id.0);
            }
            Err(e) => {
                // request stays deactivated
                report.notify_failures += 1;
                tracing::error!(id = %request.id, owner = %owner, error = %e, "notification failed");
                self.record(
                    LogLevel::Error,
                    Some(owner),
                    "notify_failed",
                    &format!("{} {e}", request.id),
                );
            }
        }
    }

    /// Tick until `shutdown` turns true (or its sender goes away).
    /// The first cycle starts immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.opts.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = self.opts.poll_interval.as_secs(), "monitor started");

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                report = self.run_cycle() => {
                    tracing::debug!(?report, "cycle report");
                }
            }
        }
        tracing::info!("monitor stopped");
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
