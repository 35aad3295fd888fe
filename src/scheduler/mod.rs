//! Bounded worker pool driving lookups for one worksheet
//!
//! A run moves through `Idle -> Loading -> Dispatching -> Draining -> Done`.
//! Records are claimed in input order, each by exactly one task; at most
//! `concurrency` tasks are in flight. A task that succeeds writes its result
//! to the sink and then marks the checkpoint.

pub mod pending;
pub mod summary;

pub use pending::{compute_pending, PendingSet};
pub use summary::{FailedRecord, FoundHandle, RunSummary};

use crate::checkpoint::CheckpointStore;
use crate::config::{FatalPolicy, SchedulerConfig};
use crate::errors::{AppError, CheckpointError};
use crate::logger::{self, LogTag};
use crate::lookup::{short, LookupClient, Record};
use crate::sheet::{RecordSource, ResultSink};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Loading,
    Dispatching,
    Draining,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Loading => "loading",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

pub struct Scheduler {
    lookup: Arc<LookupClient>,
    checkpoint: Arc<dyn CheckpointStore>,
    config: SchedulerConfig,
    shutdown: watch::Receiver<bool>,
    phase: Mutex<RunPhase>,
}

/// Everything a task needs, shared by all tasks of one run
struct TaskContext {
    queue: String,
    lookup: Arc<LookupClient>,
    checkpoint: Arc<dyn CheckpointStore>,
    sink: Arc<dyn ResultSink>,
    fatal_policy: FatalPolicy,
    tally: Mutex<Tally>,
}

#[derive(Default)]
struct Tally {
    summary: RunSummary,
    in_flight: usize,
}

impl Scheduler {
    pub fn new(
        lookup: Arc<LookupClient>,
        checkpoint: Arc<dyn CheckpointStore>,
        config: SchedulerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            lookup,
            checkpoint,
            config,
            shutdown,
            phase: Mutex::new(RunPhase::Idle),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: RunPhase) {
        *self.phase.lock() = phase;
        logger::debug(LogTag::Scheduler, &format!("Phase -> {}", phase));
    }

    /// Process every pending record of `source`, writing results to `sink`
    ///
    /// Errors are returned only for failures before dispatch (records or
    /// checkpoint unreadable). Per-record failures end up in the summary.
    pub async fn run(
        &self,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        let queue = source.name().to_string();

        self.enter(RunPhase::Loading);
        let loaded = self.load(source.as_ref()).await;
        let (pending, total) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.enter(RunPhase::Done);
                return Err(e);
            }
        };

        let mut summary = RunSummary::new(&queue);
        summary.total_records = total;
        summary.pending = pending.records.len();
        summary.skipped = pending.skipped;
        summary.deferred = pending.deferred;

        let concurrency = self.config.concurrency();
        logger::info(
            LogTag::Scheduler,
            &format!(
                "🚀 '{}': {} wallets to process ({} already done{}), {} worker(s)",
                queue,
                pending.records.len(),
                pending.skipped,
                if pending.deferred > 0 {
                    format!(", {} deferred by limit", pending.deferred)
                } else {
                    String::new()
                },
                concurrency
            ),
        );

        let ctx = Arc::new(TaskContext {
            queue,
            lookup: self.lookup.clone(),
            checkpoint: self.checkpoint.clone(),
            sink,
            fatal_policy: self.config.fatal_policy,
            tally: Mutex::new(Tally {
                summary,
                in_flight: 0,
            }),
        });

        self.enter(RunPhase::Dispatching);
        let mut shutdown = self.shutdown.clone();
        let mut tasks = JoinSet::new();
        let mut interrupted =
            self.dispatch(&ctx, pending.records, concurrency, &mut tasks, &mut shutdown)
                .await;
        if interrupted {
            abort_in_flight(&mut tasks);
        }

        self.enter(RunPhase::Draining);
        while !tasks.is_empty() {
            tokio::select! {
                joined = tasks.join_next() => {
                    if let Some(Err(e)) = joined {
                        if e.is_panic() {
                            logger::error(LogTag::Scheduler, &format!("Lookup task panicked: {}", e));
                        }
                    }
                }
                _ = cancelled(&mut shutdown), if !interrupted => {
                    abort_in_flight(&mut tasks);
                    interrupted = true;
                }
            }
        }

        let mut summary = std::mem::take(&mut ctx.tally.lock().summary);
        summary.interrupted = interrupted;
        summary.elapsed = started.elapsed();

        self.enter(RunPhase::Done);
        Ok(summary)
    }

    async fn load(&self, source: &dyn RecordSource) -> Result<(PendingSet, usize), AppError> {
        let records = source.load_records().await?;
        let total = records.len();

        let done = self.checkpoint.load(source.name())?;

        Ok((
            compute_pending(
                records,
                &done,
                self.config.skip_marked_rows,
                self.config.limit,
            ),
            total,
        ))
    }

    /// Spawn tasks until the records run out or shutdown is requested;
    /// returns true when interrupted
    async fn dispatch(
        &self,
        ctx: &Arc<TaskContext>,
        records: Vec<Record>,
        concurrency: usize,
        tasks: &mut JoinSet<()>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let delay = Duration::from_secs(self.config.request_delay_secs);
        let sequential = concurrency == 1;
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            if *shutdown.borrow() {
                return true;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return false,
                },
                _ = cancelled(shutdown) => return true,
            };

            if sequential && index > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = cancelled(shutdown) => return true,
                }
            }

            logger::info(
                LogTag::Scheduler,
                &format!(
                    "🔍 [{}/{}] Row {}: {}",
                    index + 1,
                    total,
                    record.row,
                    short(&record.wallet)
                ),
            );

            let ctx = ctx.clone();
            tasks.spawn(async move {
                let _permit = permit;
                process_record(&ctx, record).await;
            });
        }
        false
    }
}

fn abort_in_flight(tasks: &mut JoinSet<()>) {
    if tasks.is_empty() {
        return;
    }
    logger::warning(
        LogTag::Scheduler,
        &format!("🛑 Interrupted, aborting {} in-flight lookup(s)", tasks.len()),
    );
    tasks.abort_all();
}

/// Resolves once shutdown has been requested; never if the sender is gone
pub(crate) async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn process_record(ctx: &TaskContext, record: Record) {
    {
        let mut tally = ctx.tally.lock();
        tally.in_flight += 1;
        tally.summary.peak_in_flight = tally.summary.peak_in_flight.max(tally.in_flight);
    }
    let _slot = SlotGuard(&ctx.tally);

    match ctx.lookup.lookup(&record.wallet).await {
        Ok(result) => {
            if let Err(e) = ctx.sink.write(record.row, &result).await {
                logger::error(
                    LogTag::Sheets,
                    &format!("❌ Row {}: write failed, left pending: {}", record.row, e),
                );
                ctx.tally
                    .lock()
                    .summary
                    .record_failure(&record, format!("sheet write failed: {}", e));
                return;
            }

            if let Err(e) = mark_done(ctx, &record.wallet).await {
                // The row is written; only resumability is affected
                logger::error(LogTag::Checkpoint, &format!("Row {}: {}", record.row, e));
            }

            logger::info(
                LogTag::Scheduler,
                &format!(
                    "✅ Row {}: {} -> {} ({})",
                    record.row,
                    short(&record.wallet),
                    if result.exists {
                        result.handle.as_deref().unwrap_or("owner unknown")
                    } else {
                        "no posts"
                    },
                    result.confidence
                ),
            );
            ctx.tally.lock().summary.record_success(&record, &result);
        }
        Err(e) => {
            let resolution = match ctx.fatal_policy {
                FatalPolicy::LeavePending => "left pending".to_string(),
                FatalPolicy::MarkDone => match mark_done(ctx, &record.wallet).await {
                    Ok(_) => "marked done without a result".to_string(),
                    Err(ce) => format!("could not be marked done: {}", ce),
                },
            };
            logger::error(
                LogTag::Scheduler,
                &format!(
                    "❌ Row {} ({}): {} [{}]",
                    record.row,
                    short(&record.wallet),
                    e,
                    resolution
                ),
            );
            ctx.tally
                .lock()
                .summary
                .record_failure(&record, e.to_string());
        }
    }
}

/// Append to the checkpoint on the blocking pool
///
/// The store fsyncs every append. Once started, the append completes even if
/// the task awaiting it is aborted.
async fn mark_done(ctx: &TaskContext, wallet: &str) -> Result<bool, CheckpointError> {
    let checkpoint = ctx.checkpoint.clone();
    let queue = ctx.queue.clone();
    let wallet = wallet.to_string();

    tokio::task::spawn_blocking(move || checkpoint.mark_done(&queue, &wallet))
        .await
        .map_err(|e| CheckpointError::Background(e.to_string()))?
}

/// Releases the in-flight count even when the task is aborted
struct SlotGuard<'a>(&'a Mutex<Tally>);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}
