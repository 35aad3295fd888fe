/// Run orchestration: wiring and the multi-worksheet loop
///
/// Worksheets are processed one after another and share one oracle rate
/// limiter, so the request window holds across the whole run. A worksheet
/// that cannot be opened is logged and skipped. Configuration, credential and
/// spreadsheet access problems abort the run.
use crate::apis::{SheetsClient, XaiOracle};
use crate::checkpoint::FileCheckpointStore;
use crate::config::Config;
use crate::errors::AppError;
use crate::logger::{self, LogTag};
use crate::lookup::LookupClient;
use crate::paths;
use crate::retry::RetryPolicy;
use crate::scheduler::{self, RunSummary, Scheduler};
use crate::sheet::{RecordSource, ResultSink, SheetsWorksheet};
use crate::throttle::RateLimiter;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub summaries: Vec<RunSummary>,
    /// Worksheets that could not be opened, with the reason
    pub skipped_worksheets: Vec<(String, String)>,
    pub interrupted: bool,
}

impl RunOutcome {
    pub fn overall(&self) -> RunSummary {
        RunSummary::combine("ALL WORKSHEETS", &self.summaries)
    }
}

/// Build every component from `config` and process all worksheets
pub async fn run(config: Config, shutdown: watch::Receiver<bool>) -> Result<RunOutcome, AppError> {
    let oracle = XaiOracle::new(&config.oracle).map_err(AppError::Oracle)?;
    let limiter = Arc::new(RateLimiter::from_config("xai", &config.rate_limit));
    let lookup = Arc::new(LookupClient::new(
        Arc::new(oracle),
        limiter,
        RetryPolicy::from_config(&config.retry),
    ));

    let sheets = Arc::new(SheetsClient::new(
        &config.sheets,
        &config.rate_limit,
        &config.retry,
    )?);

    let titles = sheets.worksheet_titles().await?;
    logger::info(
        LogTag::Sheets,
        &format!(
            "✅ Spreadsheet {} reachable, {} worksheet(s)",
            sheets.spreadsheet_id(),
            titles.len()
        ),
    );
    for name in config.sheets.worksheets.iter().filter(|w| !titles.contains(w)) {
        logger::warning(
            LogTag::Sheets,
            &format!("⚠️ Worksheet '{}' not found in the spreadsheet", name),
        );
    }

    let checkpoint_dir = paths::get_checkpoint_directory(config.checkpoint.dir.as_deref());
    let checkpoint = Arc::new(FileCheckpointStore::new(&checkpoint_dir));

    log_startup(&config, &checkpoint_dir.display().to_string());

    let scheduler = Scheduler::new(
        lookup,
        checkpoint,
        config.scheduler.clone(),
        shutdown.clone(),
    );

    let pause = Duration::from_secs(config.sheets.worksheet_pause_secs);
    process_worksheets(
        &scheduler,
        &config.sheets.worksheets,
        pause,
        shutdown,
        |name| {
            let sheets = sheets.clone();
            async move {
                SheetsWorksheet::open(sheets, &name)
                    .await
                    .map(Arc::new)
                    .map_err(AppError::from)
            }
        },
    )
    .await
}

/// Run `scheduler` over each worksheet in order
///
/// A worksheet-level failure skips that worksheet; an error for which
/// `AppError::aborts_run` holds stops the run and is returned.
pub async fn process_worksheets<W, F, Fut>(
    scheduler: &Scheduler,
    worksheets: &[String],
    pause: Duration,
    mut shutdown: watch::Receiver<bool>,
    open: F,
) -> Result<RunOutcome, AppError>
where
    W: RecordSource + ResultSink + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Arc<W>, AppError>>,
{
    let mut outcome = RunOutcome::default();
    let names: Vec<&String> = worksheets.iter().filter(|w| !w.trim().is_empty()).collect();

    for (index, name) in names.iter().enumerate() {
        if *shutdown.borrow() {
            outcome.interrupted = true;
            break;
        }

        if index > 0 && !pause.is_zero() {
            logger::info(
                LogTag::System,
                &format!("⏸️ Pausing {}s before the next worksheet", pause.as_secs()),
            );
            tokio::select! {
                _ = sleep(pause) => {}
                _ = scheduler::cancelled(&mut shutdown) => {
                    outcome.interrupted = true;
                    break;
                }
            }
        }

        logger::info(
            LogTag::System,
            &format!("📊 Worksheet {}/{}: {}", index + 1, names.len(), name),
        );

        let worksheet = match open(name.to_string()).await {
            Ok(worksheet) => worksheet,
            Err(e) if e.aborts_run() => {
                logger::error(
                    LogTag::System,
                    &format!("❌ Spreadsheet unreachable at '{}', stopping: {}", name, e),
                );
                return Err(e);
            }
            Err(e) => {
                logger::error(
                    LogTag::System,
                    &format!("❌ Skipping worksheet '{}': {}", name, e),
                );
                outcome
                    .skipped_worksheets
                    .push((name.to_string(), e.to_string()));
                continue;
            }
        };

        match scheduler.run(worksheet.clone(), worksheet).await {
            Ok(summary) => {
                summary.log();
                let interrupted = summary.interrupted;
                outcome.summaries.push(summary);
                if interrupted {
                    outcome.interrupted = true;
                    break;
                }
            }
            Err(e) if e.aborts_run() => {
                logger::error(
                    LogTag::System,
                    &format!("❌ Worksheet '{}' failed before dispatch, stopping: {}", name, e),
                );
                return Err(e);
            }
            Err(e) => {
                logger::error(
                    LogTag::System,
                    &format!("❌ Worksheet '{}' failed before dispatch: {}", name, e),
                );
                outcome
                    .skipped_worksheets
                    .push((name.to_string(), e.to_string()));
            }
        }
    }

    if outcome.summaries.len() > 1 {
        outcome.overall().log();
    }
    Ok(outcome)
}

fn log_startup(config: &Config, checkpoint_dir: &str) {
    logger::info(
        LogTag::Config,
        &format!(
            "🤖 Oracle: xai model {} | window {} req / {}s | backoff {}s..{}s",
            config.oracle.model,
            config.rate_limit.max_requests_per_window,
            config.rate_limit.window_secs,
            config.rate_limit.error_delay_secs,
            config.rate_limit.max_backoff_secs
        ),
    );
    logger::info(
        LogTag::Config,
        &format!(
            "⚙️ Workers: {} ({}) | limit: {} | fatal records: {:?}",
            config.scheduler.concurrency(),
            if config.scheduler.use_parallel {
                "parallel"
            } else {
                "sequential"
            },
            if config.scheduler.limit == 0 {
                "all".to_string()
            } else {
                config.scheduler.limit.to_string()
            },
            config.scheduler.fatal_policy
        ),
    );
    logger::info(
        LogTag::Config,
        &format!(
            "📁 Checkpoints: {} | worksheets: {}",
            checkpoint_dir,
            config.sheets.worksheets.join(", ")
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointStore;
    use crate::config::SchedulerConfig;
    use crate::errors::SheetsError;
    use crate::testing::{MemorySheet, ScriptedOracle};
    use std::collections::HashMap;
    use tokio::time::Instant;

    fn scheduler(
        dir: &std::path::Path,
        shutdown: watch::Receiver<bool>,
    ) -> (Scheduler, Arc<ScriptedOracle>, Arc<FileCheckpointStore>) {
        let oracle = Arc::new(ScriptedOracle::new());
        let limiter = Arc::new(RateLimiter::new(
            "test",
            100,
            Duration::from_secs(60),
            Duration::from_secs(60),
            Duration::from_secs(300),
        ));
        let lookup = Arc::new(LookupClient::new(
            oracle.clone(),
            limiter,
            RetryPolicy::default(),
        ));
        let checkpoint = Arc::new(FileCheckpointStore::new(dir));
        let config = SchedulerConfig {
            use_parallel: false,
            request_delay_secs: 0,
            ..SchedulerConfig::default()
        };
        (
            Scheduler::new(lookup, checkpoint.clone(), config, shutdown),
            oracle,
            checkpoint,
        )
    }

    fn book() -> HashMap<String, Arc<MemorySheet>> {
        let mut sheets = HashMap::new();
        sheets.insert(
            "Sheet A".to_string(),
            Arc::new(MemorySheet::new("Sheet A", &["0xA1", "0xA2"])),
        );
        sheets.insert(
            "Sheet B".to_string(),
            Arc::new(MemorySheet::new("Sheet B", &["0xB1"])),
        );
        sheets
    }

    fn opener(
        book: &HashMap<String, Arc<MemorySheet>>,
    ) -> impl Fn(String) -> std::future::Ready<Result<Arc<MemorySheet>, AppError>> + '_ {
        move |name| {
            std::future::ready(book.get(&name).cloned().ok_or_else(|| {
                AppError::Sheets(SheetsError::Api {
                    status: 400,
                    message: format!("Unable to parse range: '{}'", name),
                })
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worksheets_run_in_order_with_pause() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = watch::channel(false);
        let (scheduler, oracle, checkpoint) = scheduler(dir.path(), rx.clone());
        let book = book();
        let names = vec![
            "Sheet A".to_string(),
            "Missing".to_string(),
            "Sheet B".to_string(),
        ];
        let start = Instant::now();

        let outcome =
            process_worksheets(&scheduler, &names, Duration::from_secs(5), rx, opener(&book))
                .await
                .unwrap();

        assert!(!outcome.interrupted);
        assert_eq!(outcome.summaries.len(), 2);
        assert_eq!(outcome.summaries[0].worksheet, "Sheet A");
        assert_eq!(outcome.summaries[1].worksheet, "Sheet B");
        assert_eq!(outcome.skipped_worksheets.len(), 1);
        assert_eq!(outcome.skipped_worksheets[0].0, "Missing");
        assert_eq!(outcome.overall().completed, 3);
        assert_eq!(oracle.total_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        // Checkpoints are kept per worksheet
        assert_eq!(checkpoint.load("Sheet A").unwrap().len(), 2);
        assert_eq!(checkpoint.load("Sheet B").unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_pause_stops_remaining_worksheets() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);
        let (scheduler, oracle, _) = scheduler(dir.path(), rx.clone());
        let book = book();
        let names = vec!["Sheet A".to_string(), "Sheet B".to_string()];

        let stopper = tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            tx.send(true).unwrap();
            tx
        });
        let outcome =
            process_worksheets(&scheduler, &names, Duration::from_secs(30), rx, opener(&book))
                .await
                .unwrap();
        let _tx = stopper.await.unwrap();

        assert!(outcome.interrupted);
        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(oracle.existence_calls("0xB1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_spreadsheet_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = watch::channel(false);
        let (scheduler, oracle, _) = scheduler(dir.path(), rx.clone());
        let names = vec!["Sheet A".to_string(), "Sheet B".to_string()];

        for status in [403u16, 404] {
            let result = process_worksheets(
                &scheduler,
                &names,
                Duration::from_secs(5),
                rx.clone(),
                |_name| {
                    std::future::ready(Err::<Arc<MemorySheet>, _>(AppError::Sheets(
                        SheetsError::from_status(status, "Requested entity was not found".into()),
                    )))
                },
            )
            .await;

            assert!(matches!(result, Err(AppError::Sheets(_))), "status {}", status);
        }
        assert_eq!(oracle.total_calls(), 0);
    }
}
