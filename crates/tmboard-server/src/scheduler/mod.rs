//! Background refresh loop.
//!
//! Each cycle fetches the results and maps pages, extracts their rows and
//! replaces the cached snapshot of each table. Failures are logged per
//! table and never stop the loop; the previous snapshot simply stays in
//! place until a later cycle succeeds.

mod event_window;

pub use event_window::{DailyEventWindow, EventWindow};

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tmboard_core::{AppConfig, BoardTable, RefreshSettings};
use tmboard_db::{DbError, SnapshotStore};
use tmboard_scraper::{extract_table, ExtractError, ExtractOptions, PageFetcher, ScraperError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Source of snapshot timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Where to fetch from and how often.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub results_url: String,
    pub maps_url: String,
    pub refresh: RefreshSettings,
    /// Radius passed to [`EventWindow::is_event_imminent`].
    pub guard_secs: u64,
    pub extract: ExtractOptions,
}

impl SchedulerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            results_url: config.results_url.clone(),
            maps_url: config.maps_url.clone(),
            refresh: config.refresh,
            guard_secs: config.event.guard_secs,
            extract: ExtractOptions::with_policy(config.malformed_rows),
        }
    }

    fn url(&self, table: BoardTable) -> &str {
        match table {
            BoardTable::Results => &self.results_url,
            BoardTable::Maps => &self.maps_url,
        }
    }
}

/// Why one table was not refreshed this cycle.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ScraperError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("snapshot write failed: {0}")]
    Store(#[from] DbError),
}

#[derive(Debug)]
pub struct TableOutcome {
    pub table: BoardTable,
    /// Number of rows cached on success.
    pub result: Result<usize, RefreshError>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// The event window was imminent; nothing was fetched.
    Paused,
    Refreshed(Vec<TableOutcome>),
}

pub struct RefreshScheduler<F, S, W, C = SystemClock> {
    fetcher: F,
    store: S,
    window: W,
    clock: C,
    config: SchedulerConfig,
}

impl<F, S, W> RefreshScheduler<F, S, W, SystemClock>
where
    F: PageFetcher,
    S: SnapshotStore,
    W: EventWindow,
{
    pub fn new(fetcher: F, store: S, window: W, config: SchedulerConfig) -> Self {
        Self {
            fetcher,
            store,
            window,
            clock: SystemClock,
            config,
        }
    }
}

impl<F, S, W, C> RefreshScheduler<F, S, W, C>
where
    F: PageFetcher,
    S: SnapshotStore,
    W: EventWindow,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> RefreshScheduler<F, S, W, C2> {
        RefreshScheduler {
            fetcher: self.fetcher,
            store: self.store,
            window: self.window,
            clock,
            config: self.config,
        }
    }

    /// Runs exactly one cycle: both tables, in order, unless the event
    /// window is imminent.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.window.is_event_imminent(self.config.guard_secs) {
            tracing::info!(
                pause_secs = self.config.refresh.event_pause_secs,
                "scheduler: event window imminent; skipping refresh"
            );
            return CycleOutcome::Paused;
        }

        let mut tables = Vec::with_capacity(BoardTable::ALL.len());
        for table in BoardTable::ALL {
            let started = Instant::now();
            let result = self.refresh_table(table).await;
            let elapsed_ms = millis(started.elapsed());
            match &result {
                Ok(rows) => {
                    tracing::info!(%table, rows, elapsed_ms, "scheduler: snapshot refreshed");
                }
                Err(e) => {
                    tracing::error!(%table, elapsed_ms, error = %e, "scheduler: refresh failed");
                }
            }
            tables.push(TableOutcome { table, result });
        }

        CycleOutcome::Refreshed(tables)
    }

    async fn refresh_table(&self, table: BoardTable) -> Result<usize, RefreshError> {
        let body = self.fetcher.fetch_page(self.config.url(table)).await?;
        let rows = extract_table(table, &body, &self.config.extract)?;
        let snapshot = rows.to_snapshot(self.clock.now(), self.config.refresh.period_secs)?;
        self.store.put(table, &snapshot).await?;
        Ok(rows.len())
    }

    /// How long to sleep after a cycle that took `elapsed`.
    fn next_delay(&self, outcome: &CycleOutcome, elapsed: Duration) -> Duration {
        match outcome {
            CycleOutcome::Paused => Duration::from_secs(self.config.refresh.event_pause_secs),
            CycleOutcome::Refreshed(_) => {
                Duration::from_secs(self.config.refresh.period_secs).saturating_sub(elapsed)
            }
        }
    }

    /// Loops until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            period_secs = self.config.refresh.period_secs,
            "scheduler: refresh loop started"
        );

        while !*shutdown.borrow() {
            let started = Instant::now();
            let outcome = self.run_cycle().await;
            let elapsed = started.elapsed();
            let delay = self.next_delay(&outcome, elapsed);
            tracing::debug!(
                elapsed_ms = millis(elapsed),
                sleep_ms = millis(delay),
                "scheduler: cycle complete"
            );

            if sleep_or_shutdown(delay, &mut shutdown).await {
                break;
            }
        }

        tracing::info!("scheduler: refresh loop stopped");
    }
}

impl<F, S, W, C> RefreshScheduler<F, S, W, C>
where
    F: PageFetcher + 'static,
    S: SnapshotStore + 'static,
    W: EventWindow + 'static,
    C: Clock + 'static,
{
    /// Starts the loop on its own task.
    pub fn spawn(self) -> RefreshHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        RefreshHandle { shutdown, task }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Returns `true` when shutdown was requested before `delay` elapsed.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signals the loop and waits for the in-flight cycle, if any, to finish.
    pub async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            tracing::debug!("scheduler: loop already exited");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "scheduler: refresh task panicked");
        }
    }
}
