//! Refresh scheduler.
//!
//! Owns the live [`CacheSnapshot`]. Once a day at the configured wall-clock
//! time it fetches every menu facility, builds and allocates their weeks,
//! and publishes the result through a `watch` channel. Failed attempts are
//! retried after a fixed delay; when retries run out the last persisted
//! snapshot is restored with its original fetch time. An empty snapshot is
//! never published over existing data.
//!
//! State machine per cycle:
//!
//! ```text
//! Idle → Fetching → Published → Idle
//!           ↓ ↑
//!        Retrying → Exhausted → FallbackRestored → Idle
//!                       ↓ (nothing to restore)
//!                    Retrying (indefinitely)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use netnutrition::CatalogSource;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::builder;
use crate::config::{FacilityConfig, RefreshConfig};
use crate::error::{DiningError, ErrorKind, Result};
use crate::model::FacilityMenu;
use crate::service::DiningService;
use crate::snapshot::{CacheSnapshot, SnapshotStore};

/// Where the scheduler is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
    /// Waiting out the delay after `attempt` consecutive failures.
    Retrying { attempt: u32 },
    Published,
    /// Retries ran out; looking for a snapshot to fall back to.
    Exhausted,
    FallbackRestored,
}

/// How a refresh cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh snapshot was published after `retries` failed attempts.
    Published { facilities: usize, retries: u32 },
    /// Retries ran out and the persisted snapshot was restored.
    FallbackRestored { fetched_at: DateTime<Utc> },
    /// Retries ran out and the live snapshot was newer than the persisted one.
    KeptCurrent { fetched_at: DateTime<Utc> },
    /// Another cycle was already in flight.
    AlreadyRunning,
    /// Retries ran out with nothing to fall back to and the policy does
    /// not keep retrying.
    Exhausted { attempts: u32 },
    /// A failure no retry can fix, such as a bad source configuration.
    Failed { kind: ErrorKind, reason: String },
    /// Shutdown was requested mid-cycle; nothing was published.
    Cancelled,
}

/// Timing and retry policy.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Local wall-clock time of the daily refresh.
    pub trigger_at: NaiveTime,
    /// Fixed delay between failed attempts.
    pub retry_delay: Duration,
    /// Failed attempts before falling back.
    pub max_retries: u32,
    /// Run a cycle as soon as the scheduler starts.
    pub refresh_on_startup: bool,
    /// Keep retrying past `max_retries` while there is no data at all.
    /// One-shot callers turn this off to get [`CycleOutcome::Exhausted`].
    pub retry_until_data: bool,
}

impl RefreshPolicy {
    pub fn from_config(config: &RefreshConfig) -> Result<Self> {
        Ok(Self {
            trigger_at: config.trigger_time()?,
            retry_delay: config.retry_delay(),
            max_retries: config.max_retries,
            refresh_on_startup: config.refresh_on_startup,
            retry_until_data: true,
        })
    }
}

struct Inner<S, P> {
    source: S,
    store: P,
    facilities: Vec<FacilityConfig>,
    policy: RefreshPolicy,
    snapshot_tx: watch::Sender<Arc<CacheSnapshot>>,
    state_tx: watch::Sender<SchedulerState>,
    in_flight: AtomicBool,
    retry_count: AtomicU32,
    cancel: CancellationToken,
}

impl<S, P> Inner<S, P> {
    fn set_state(&self, state: SchedulerState) {
        self.state_tx.send_replace(state);
    }
}

/// Clears the in-flight flag when a cycle ends, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Daily refresh loop over a catalog source and a snapshot store.
pub struct RefreshScheduler<S, P> {
    inner: Arc<Inner<S, P>>,
}

impl<S, P> Clone for RefreshScheduler<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CatalogSource, P: SnapshotStore> RefreshScheduler<S, P> {
    /// Create a scheduler for the facilities that publish menus.
    ///
    /// The live snapshot starts empty.
    pub fn new(source: S, store: P, facilities: Vec<FacilityConfig>, policy: RefreshPolicy) -> Self {
        let facilities = facilities.into_iter().filter(|f| f.menu).collect();
        let (snapshot_tx, _) = watch::channel(Arc::new(CacheSnapshot::default()));
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                facilities,
                policy,
                snapshot_tx,
                state_tx,
                in_flight: AtomicBool::new(false),
                retry_count: AtomicU32::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Token that stops the run loop and abandons any pending retry.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Receiver that always holds the live snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Query handle over the live snapshot.
    pub fn service(&self) -> DiningService {
        DiningService::new(self.subscribe())
    }

    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.inner.snapshot_tx.borrow())
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state_tx.subscribe()
    }

    /// Consecutive failed attempts in the current or last cycle.
    pub fn retry_count(&self) -> u32 {
        self.inner.retry_count.load(Ordering::Relaxed)
    }

    /// Run one refresh cycle now, unless one is already in flight.
    pub async fn trigger(&self) -> CycleOutcome {
        let inner = &*self.inner;
        if inner.in_flight.swap(true, Ordering::AcqRel) {
            debug!("refresh already in flight; trigger ignored");
            return CycleOutcome::AlreadyRunning;
        }
        let _guard = InFlight(&inner.in_flight);

        let span = info_span!("refresh", cycle = %Uuid::new_v4());
        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> CycleOutcome {
        let inner = &*self.inner;
        let cancel = &inner.cancel;
        inner.retry_count.store(0, Ordering::Relaxed);
        info!(facilities = inner.facilities.len(), "refresh started");

        let mut attempt: u32 = 0;
        let mut fallback_checked = false;
        loop {
            inner.set_state(SchedulerState::Fetching);
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(),
                fetched = self.fetch_all() => fetched,
            };

            match fetched {
                Ok(menus) => return self.publish(menus, attempt),
                Err(e) if !e.is_retryable() => return self.failed(&e),
                Err(e) => warn!(attempt = attempt + 1, error = %e, "refresh attempt failed"),
            }

            attempt += 1;
            inner.retry_count.store(attempt, Ordering::Relaxed);

            if attempt >= inner.policy.max_retries && !fallback_checked {
                fallback_checked = true;
                inner.set_state(SchedulerState::Exhausted);
                error!(attempts = attempt, "refresh retries exhausted");
                if let Some(outcome) = self.fall_back(attempt) {
                    return outcome;
                }
                if !inner.policy.retry_until_data {
                    inner.set_state(SchedulerState::Idle);
                    return CycleOutcome::Exhausted { attempts: attempt };
                }
                warn!("no snapshot to fall back to; retrying until the source recovers");
            }

            inner.set_state(SchedulerState::Retrying { attempt });
            debug!(delay = ?inner.policy.retry_delay, attempt, "waiting before retry");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(),
                () = tokio::time::sleep(inner.policy.retry_delay) => {}
            }
        }
    }

    /// Fetch every facility in turn.
    ///
    /// Facilities the upstream does not list are skipped and a non-retryable
    /// failure ends the attempt at once. The result is publishable when every
    /// other facility succeeded and at least one has meals, or when some
    /// failed but neither a live nor a persisted snapshot exists.
    async fn fetch_all(&self) -> Result<BTreeMap<String, FacilityMenu>> {
        let inner = &*self.inner;
        let mut menus = BTreeMap::new();
        let mut failed: Vec<&str> = Vec::new();
        let mut last_error = String::new();

        for facility in &inner.facilities {
            match builder::fetch_facility_menu(&inner.source, facility).await {
                Ok(menu) => {
                    menus.insert(facility.id.clone(), menu);
                }
                Err(DiningError::UnitNotFound { .. }) => {
                    warn!(facility = %facility.id, unit = %facility.unit, "unit not listed upstream; skipped");
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(facility = %facility.id, error = %e, "facility fetch failed");
                    failed.push(&facility.id);
                    last_error = e.to_string();
                }
            }
        }

        if menus.values().all(FacilityMenu::is_empty) {
            return Err(DiningError::SourceUnavailable {
                facility: "all facilities".into(),
                reason: if last_error.is_empty() {
                    "no facility listed any meals".into()
                } else {
                    last_error
                },
            });
        }
        if failed.is_empty() {
            return Ok(menus);
        }
        if inner.snapshot_tx.borrow().is_empty() && !self.has_persisted() {
            warn!(failed = ?failed, "publishing partial refresh; no earlier snapshot exists");
            return Ok(menus);
        }
        Err(DiningError::SourceUnavailable {
            facility: failed.join(", "),
            reason: last_error,
        })
    }

    fn has_persisted(&self) -> bool {
        matches!(self.inner.store.load(), Ok(Some(snapshot)) if !snapshot.is_empty())
    }

    fn publish(&self, facilities: BTreeMap<String, FacilityMenu>, retries: u32) -> CycleOutcome {
        let inner = &*self.inner;
        let snapshot = CacheSnapshot {
            facilities,
            fetched_at: Utc::now(),
            retry_count: retries,
        };
        let count = snapshot.facilities.len();

        if let Err(e) = inner.store.save(&snapshot) {
            error!(error = %e, "cannot persist snapshot");
        }
        inner.snapshot_tx.send_replace(Arc::new(snapshot));
        inner.retry_count.store(0, Ordering::Relaxed);
        inner.set_state(SchedulerState::Published);
        info!(facilities = count, retries, "snapshot published");
        inner.set_state(SchedulerState::Idle);

        CycleOutcome::Published {
            facilities: count,
            retries,
        }
    }

    /// Restore the persisted snapshot unless the live one is newer.
    ///
    /// Returns `None` when neither holds any data.
    fn fall_back(&self, attempts: u32) -> Option<CycleOutcome> {
        let inner = &*self.inner;
        let persisted = match inner.store.load() {
            Ok(snapshot) => snapshot.filter(|s| !s.is_empty()),
            Err(e) => {
                error!(error = %e, "cannot load persisted snapshot");
                None
            }
        };
        let current = Arc::clone(&inner.snapshot_tx.borrow());

        match persisted {
            Some(restored) if current.is_empty() || restored.fetched_at > current.fetched_at => {
                let fetched_at = restored.fetched_at;
                inner.snapshot_tx.send_replace(Arc::new(CacheSnapshot {
                    retry_count: attempts,
                    ..restored
                }));
                inner.set_state(SchedulerState::FallbackRestored);
                warn!(%fetched_at, "restored persisted snapshot");
                inner.set_state(SchedulerState::Idle);
                Some(CycleOutcome::FallbackRestored { fetched_at })
            }
            _ if !current.is_empty() => {
                warn!(fetched_at = %current.fetched_at, "keeping current snapshot");
                inner.set_state(SchedulerState::Idle);
                Some(CycleOutcome::KeptCurrent {
                    fetched_at: current.fetched_at,
                })
            }
            _ => None,
        }
    }

    fn failed(&self, e: &DiningError) -> CycleOutcome {
        error!(error = %e, "refresh failed; not retrying");
        self.inner.set_state(SchedulerState::Idle);
        CycleOutcome::Failed {
            kind: e.kind(),
            reason: e.to_string(),
        }
    }

    fn cancelled(&self) -> CycleOutcome {
        info!("refresh cancelled");
        self.inner.set_state(SchedulerState::Idle);
        CycleOutcome::Cancelled
    }

    /// Run the daily loop until the cancel token fires.
    pub async fn run(self) {
        let inner = &*self.inner;
        let cancel = inner.cancel.clone();
        info!(
            facilities = inner.facilities.len(),
            trigger = %inner.policy.trigger_at,
            "refresh scheduler started"
        );

        if inner.policy.refresh_on_startup && self.trigger().await == CycleOutcome::Cancelled {
            info!("refresh scheduler stopped");
            return;
        }

        loop {
            let now = Local::now();
            let next = next_trigger_after(&now, inner.policy.trigger_at);
            let wait = (next.clone() - now).to_std().unwrap_or_default();
            debug!(next = %next, "next refresh scheduled");

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
            if self.trigger().await == CycleOutcome::Cancelled {
                break;
            }
        }

        inner.set_state(SchedulerState::Idle);
        info!("refresh scheduler stopped");
    }
}

impl<S, P> RefreshScheduler<S, P>
where
    S: CatalogSource + 'static,
    P: SnapshotStore + 'static,
{
    /// Start the daily loop on a background task.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(scheduler.run())
    }
}

/// First instant at local wall-clock `at` strictly after `now`.
///
/// Ambiguous local times take the earlier instant; times inside a DST gap
/// move to the first valid minute after it.
pub fn next_trigger_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    (0..=2)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|date| resolve_local(&tz, date.and_time(at)))
        .find(|candidate| candidate > now)
        .unwrap_or_else(|| now.clone() + TimeDelta::days(1))
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest().or_else(|| {
        (1..=180).find_map(|minutes| {
            tz.from_local_datetime(&(naive + TimeDelta::minutes(minutes)))
                .earliest()
        })
    })
}
