//! Scripted fakes shared by unit tests

use crate::errors::{OracleError, SheetsError, Stage};
use crate::lookup::{Confidence, LookupResult, Oracle, Ownership, Record};
use crate::sheet::{RecordSource, ResultSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted oracle outcome
#[derive(Debug, Clone)]
pub enum Reply {
    Exists(bool),
    Owner(&'static str, Confidence),
    Anonymous(Confidence),
    Throttled,
    Transient,
    Fatal,
}

/// Oracle answering from per-wallet, per-stage queues
///
/// Unscripted wallets have no posts; an unscripted ownership call returns an
/// anonymous Medium answer.
pub struct ScriptedOracle {
    scripts: Mutex<HashMap<(String, Stage), VecDeque<Reply>>>,
    calls: Mutex<HashMap<(String, Stage), usize>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Every call takes `latency` (use with a paused clock)
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            latency,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn script_exists(&self, wallet: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .insert((wallet.to_string(), Stage::Existence), replies.into());
    }

    pub fn script_ownership(&self, wallet: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .insert((wallet.to_string(), Stage::Ownership), replies.into());
    }

    pub fn existence_calls(&self, wallet: &str) -> usize {
        self.call_count(wallet, Stage::Existence)
    }

    pub fn ownership_calls(&self, wallet: &str) -> usize {
        self.call_count(wallet, Stage::Ownership)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of simultaneous calls observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn call_count(&self, wallet: &str, stage: Stage) -> usize {
        self.calls
            .lock()
            .get(&(wallet.to_string(), stage))
            .copied()
            .unwrap_or(0)
    }

    async fn next_reply(&self, wallet: &str, stage: Stage) -> Option<Reply> {
        let key = (wallet.to_string(), stage);
        *self.calls.lock().entry(key.clone()).or_insert(0) += 1;

        let _guard = InFlight::enter(&self.in_flight, &self.peak);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let reply = self
            .scripts
            .lock()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());
        reply
    }
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

fn failure(reply: &Reply) -> Option<OracleError> {
    let provider = "scripted".to_string();
    match reply {
        Reply::Throttled => Some(OracleError::RateLimited {
            provider,
            retry_after_ms: None,
        }),
        Reply::Transient => Some(OracleError::Network {
            provider,
            message: "connection reset".to_string(),
        }),
        Reply::Fatal => Some(OracleError::Auth {
            provider,
            message: "Invalid API key".to_string(),
        }),
        _ => None,
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn post_exists(&self, wallet: &str) -> Result<bool, OracleError> {
        let reply = self
            .next_reply(wallet, Stage::Existence)
            .await
            .unwrap_or(Reply::Exists(false));
        if let Some(err) = failure(&reply) {
            return Err(err);
        }
        Ok(!matches!(reply, Reply::Exists(false)))
    }

    async fn analyze_ownership(&self, wallet: &str) -> Result<Ownership, OracleError> {
        let reply = self
            .next_reply(wallet, Stage::Ownership)
            .await
            .unwrap_or(Reply::Anonymous(Confidence::Medium));
        if let Some(err) = failure(&reply) {
            return Err(err);
        }
        Ok(match reply {
            Reply::Owner(name, confidence) => Ownership {
                username: Some(name.to_string()),
                confidence,
            },
            Reply::Anonymous(confidence) => Ownership {
                username: None,
                confidence,
            },
            _ => Ownership {
                username: None,
                confidence: Confidence::Medium,
            },
        })
    }
}

/// Output cells of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    pub post_exists: String,
    pub handle: String,
    pub confidence: String,
    pub script_run: String,
}

/// In-memory worksheet
pub struct MemorySheet {
    name: String,
    records: Vec<Record>,
    rows: Mutex<HashMap<usize, RowCells>>,
    writes: AtomicUsize,
    failing_rows: Mutex<HashSet<usize>>,
}

impl MemorySheet {
    /// Wallets land on rows 2, 3, ... in the given order
    pub fn new(name: &str, wallets: &[&str]) -> Self {
        let records = wallets
            .iter()
            .enumerate()
            .map(|(i, wallet)| Record::new(*wallet, i + 2))
            .collect();
        Self::with_records(name, records)
    }

    pub fn with_records(name: &str, records: Vec<Record>) -> Self {
        Self {
            name: name.to_string(),
            records,
            rows: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            failing_rows: Mutex::new(HashSet::new()),
        }
    }

    /// Writes to `row` fail with an API error
    pub fn fail_writes_to(&self, row: usize) {
        self.failing_rows.lock().insert(row);
    }

    pub fn row(&self, row: usize) -> Option<RowCells> {
        self.rows.lock().get(&row).cloned()
    }

    pub fn written_rows(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_records(&self) -> Result<Vec<Record>, SheetsError> {
        Ok(self.records.clone())
    }
}

#[async_trait]
impl ResultSink for MemorySheet {
    async fn write(&self, row: usize, result: &LookupResult) -> Result<(), SheetsError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_rows.lock().contains(&row) {
            return Err(SheetsError::Api {
                status: 400,
                message: format!("row {} is protected", row),
            });
        }
        self.rows.lock().insert(
            row,
            RowCells {
                post_exists: result.post_exists_cell().to_string(),
                handle: result.handle_cell().to_string(),
                confidence: result.confidence.as_str().to_string(),
                script_run: "true".to_string(),
            },
        );
        Ok(())
    }
}
