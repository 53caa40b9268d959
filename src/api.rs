//! Command boundary: inbound chat text in, immediate reply out.
//!
//! Parsing, validation and registry reads happen inline. The first availability
//! check for a new watch runs in the background (bounded by a semaphore) and its
//! result reaches the owner through the notifier: acknowledge now, report later.

use crate::command::{Command, WatchCommand};
use crate::config::TargetConfig;
use crate::engine::Monitor;
use crate::error::*;
use crate::messages;
use crate::services::{LogLevel, Registry};
use crate::types::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Active requests of `owner`, oldest first.
pub fn active_for(registry: &dyn Registry, owner: &Owner) -> Result<Vec<MonitoringRequest>> {
    Ok(registry
        .list_by_owner(owner)?
        .into_iter()
        .filter(|r| r.active)
        .collect())
}

/// Cancel every active request of `owner`; returns the ones this call stopped.
pub fn stop_owner(registry: &dyn Registry, owner: &Owner) -> Result<Vec<MonitoringRequest>> {
    let mut stopped = Vec::new();
    for req in active_for(registry, owner)? {
        if registry.deactivate(&req.id, Deactivation::Cancelled)? {
            stopped.push(req);
        }
    }
    Ok(stopped)
}

/// An active request for the same owner, page and stay, if any.
pub fn find_duplicate(
    registry: &dyn Registry,
    candidate: &MonitoringRequest,
) -> Result<Option<MonitoringRequest>> {
    Ok(active_for(registry, &candidate.owner)?
        .into_iter()
        .find(|r| r.same_stay(candidate)))
}

/// First checks that have not settled yet. A stop removes the owner's
/// entries; a check whose entry is gone when it finishes registers nothing
/// and stays silent.
#[derive(Default)]
struct PendingChecks(Mutex<BTreeMap<RequestId, Owner>>);

impl PendingChecks {
    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<RequestId, Owner>>> {
        self.0
            .lock()
            .map_err(|_| RoomwatchError::storage_error("lock", "pending checks poisoned"))
    }

    fn insert(&self, request: &MonitoringRequest) -> Result<()> {
        self.entries()?
            .insert(request.id.clone(), request.owner.clone());
        Ok(())
    }

    /// Run `settle` if `id` is still pending, consuming the entry. The lock is
    /// held throughout, so a concurrent stop sees either the entry or the result.
    fn settle<T>(&self, id: &RequestId, settle: impl FnOnce() -> T) -> Result<Option<T>> {
        let mut entries = self.entries()?;
        if entries.remove(id).is_none() {
            return Ok(None);
        }
        Ok(Some(settle()))
    }

    /// Drop every pending check of `owner`, then run `stop` under the same lock.
    fn cancel_owner<T>(
        &self,
        owner: &Owner,
        stop: impl FnOnce() -> Result<T>,
    ) -> Result<(Vec<RequestId>, T)> {
        let mut entries = self.entries()?;
        let cancelled: Vec<RequestId> = entries
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &cancelled {
            entries.remove(id);
        }
        Ok((cancelled, stop()?))
    }
}

pub struct CommandHandler {
    monitor: Arc<Monitor>,
    default_target: Option<TargetConfig>,
    permits: Arc<Semaphore>,
    pending: Arc<PendingChecks>,
    tasks: Mutex<JoinSet<()>>,
}

impl CommandHandler {
    pub fn new(
        monitor: Arc<Monitor>,
        default_target: Option<TargetConfig>,
        max_background_checks: usize,
    ) -> Self {
        Self {
            monitor,
            default_target,
            permits: Arc::new(Semaphore::new(max_background_checks.max(1))),
            pending: Arc::default(),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Answer an inbound event. Must be called inside a tokio runtime.
    pub async fn handle(&self, event: InboundEvent) -> Reply {
        let text = match Command::parse(&event.text) {
            Ok(cmd) => match self.dispatch(&event.owner, cmd) {
                Ok(text) => text,
                Err(RoomwatchError::Validation(e)) => messages::invalid_input(&e.to_string()),
                Err(e) => {
                    tracing::error!(owner = %event.owner, error = %e, "command failed");
                    messages::internal_error(&e.to_string())
                }
            },
            Err(e) => {
                tracing::debug!(owner = %event.owner, error = %e, "rejected command");
                messages::invalid_input(&e.to_string())
            }
        };
        Reply {
            reply_token: event.reply_token,
            text,
        }
    }

    fn dispatch(&self, owner: &Owner, cmd: Command) -> Result<String> {
        let registry = self.monitor.registry().as_ref();
        let interval = self.monitor.options().poll_interval;
        match cmd {
            Command::Help => Ok(messages::HELP.to_string()),
            Command::Status => Ok(messages::status(&active_for(registry, owner)?, interval)),
            Command::Stop => {
                let (pending, stopped) = self
                    .pending
                    .cancel_owner(owner, || stop_owner(registry, owner))?;
                let ids = pending.iter().chain(stopped.iter().map(|req| &req.id));
                for id in ids {
                    self.monitor
                        .record(LogLevel::Info, Some(owner), "cancelled", &id.0);
                }
                let count = pending.len() + stopped.len();
                tracing::info!(owner = %owner, count, "monitoring stopped");
                Ok(messages::stopped(count))
            }
            Command::Watch(watch) => {
                let request = self.build_request(owner, watch)?;
                if let Some(existing) = find_duplicate(registry, &request)? {
                    return Ok(messages::already_watching(&existing));
                }
                self.spawn_first_check(request)?;
                Ok(messages::ACK.to_string())
            }
        }
    }

    fn build_request(&self, owner: &Owner, watch: WatchCommand) -> Result<MonitoringRequest> {
        let (target, default_room) = match (watch.target, &self.default_target) {
            (Some(t), _) => (t, None),
            (None, Some(cfg)) => (
                Target::new(&cfg.url)?.with_name(cfg.name.clone()),
                cfg.room_type.clone(),
            ),
            (None, None) => return Err(ValidationError::MissingTarget.into()),
        };
        Ok(
            MonitoringRequest::new(owner.clone(), target, watch.params)
                .with_room_type(watch.room_type.or(default_room)),
        )
    }

    fn spawn_first_check(&self, request: MonitoringRequest) -> Result<()> {
        let monitor = self.monitor.clone();
        let permits = self.permits.clone();
        let pending = self.pending.clone();
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| RoomwatchError::storage_error("spawn", "task set poisoned"))?;
        pending.insert(&request)?;
        // reap finished checks
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "first check task failed");
            }
        }
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            first_check(&monitor, &pending, request).await;
        });
        Ok(())
    }

    /// Checks still queued or running.
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Wait for every background check to finish.
    pub async fn shutdown(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "first check task failed");
            }
        }
    }
}

/// Immediate check for a new watch. Positive → tell the owner and register
/// nothing; otherwise register the request and say monitoring started. A check
/// stopped meanwhile does neither.
async fn first_check(monitor: &Monitor, pending: &PendingChecks, mut request: MonitoringRequest) {
    let owner = request.owner.clone();
    let interval = monitor.options().poll_interval;

    let outcome = monitor.inspect(&request).await;
    if let Ok(ins) = &outcome {
        if !ins.verdict.available && ins.page.resolved_url != request.target.url {
            request.target.resolved_url = Some(ins.page.resolved_url.clone());
        }
    }

    let settled = pending.settle(&request.id, || match &outcome {
        Ok(ins) if ins.verdict.available => {
            tracing::info!(
                owner = %owner,
                reason = %ins.verdict.reason,
                "available on first check"
            );
            monitor.record(
                LogLevel::Info,
                Some(&owner),
                "available_now",
                &ins.verdict.reason,
            );
            messages::available_now(&request, &ins.page.final_url)
        }
        Ok(_) => match register(monitor, &request) {
            Ok(None) => messages::monitoring_started(&request, interval),
            Ok(Some(existing)) => messages::already_watching(&existing),
            Err(e) => messages::internal_error(&e.to_string()),
        },
        Err(fetch_err) => {
            tracing::warn!(
                owner = %owner,
                error = %fetch_err,
                "first check failed, registering anyway"
            );
            match register(monitor, &request) {
                Ok(None) => {
                    messages::initial_check_failed(&request, &fetch_err.to_string(), interval)
                }
                Ok(Some(existing)) => messages::already_watching(&existing),
                Err(e) => messages::internal_error(&e.to_string()),
            }
        }
    });

    let text = match settled {
        Ok(Some(text)) => text,
        Ok(None) => {
            tracing::info!(owner = %owner, id = %request.id, "stopped before first check settled");
            return;
        }
        Err(e) => messages::internal_error(&e.to_string()),
    };

    if let Err(e) = monitor.notifier().notify(&owner, &text).await {
        tracing::error!(owner = %owner, error = %e, "cannot deliver first check result");
        monitor.record(LogLevel::Error, Some(&owner), "notify_failed", &e.to_string());
    }
}

/// Add `request` unless an identical one became active meanwhile.
fn register(
    monitor: &Monitor,
    request: &MonitoringRequest,
) -> Result<Option<MonitoringRequest>> {
    let registry = monitor.registry().as_ref();
    if let Some(existing) = find_duplicate(registry, request)? {
        return Ok(Some(existing));
    }
    registry.add(request.clone())?;
    tracing::info!(id = %request.id, owner = %request.owner, "monitoring request created");
    monitor.record(
        LogLevel::Info,
        Some(&request.owner),
        "watch",
        &format!(
            "{} {} {}..{} x{}",
            request.id,
            request.target.display_name(),
            request.checkin.format(DATE_FORMAT),
            request.checkout.format(DATE_FORMAT),
            request.occupancy.get()
        ),
    );
    Ok(None)
}
