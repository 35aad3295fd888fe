/// Per-worksheet and overall run reporting
use crate::logger::{self, LogTag};
use crate::lookup::{short, LookupResult, Record};
use std::time::Duration;

const SHOWN_HANDLES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundHandle {
    pub row: usize,
    pub wallet: String,
    pub handle: Option<String>,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub row: usize,
    pub wallet: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub worksheet: String,
    pub total_records: usize,
    pub pending: usize,
    pub skipped: usize,
    pub deferred: usize,
    pub completed: usize,
    pub found: usize,
    pub no_posts: usize,
    pub failed: Vec<FailedRecord>,
    pub found_handles: Vec<FoundHandle>,
    pub interrupted: bool,
    pub elapsed: Duration,
    /// Most tasks in flight at once
    pub peak_in_flight: usize,
}

impl RunSummary {
    pub fn new(worksheet: &str) -> Self {
        Self {
            worksheet: worksheet.to_string(),
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, record: &Record, result: &LookupResult) {
        self.completed += 1;
        if result.exists {
            self.found += 1;
            self.found_handles.push(FoundHandle {
                row: record.row,
                wallet: record.wallet.clone(),
                handle: result.handle.clone(),
                confidence: result.confidence.to_string(),
            });
        } else {
            self.no_posts += 1;
        }
    }

    pub fn record_failure(&mut self, record: &Record, reason: String) {
        self.failed.push(FailedRecord {
            row: record.row,
            wallet: record.wallet.clone(),
            reason,
        });
    }

    /// Seconds per completed record
    pub fn average_secs(&self) -> Option<f64> {
        if self.completed == 0 {
            None
        } else {
            Some(self.elapsed.as_secs_f64() / self.completed as f64)
        }
    }

    /// Sum of several worksheet summaries
    pub fn combine(label: &str, parts: &[RunSummary]) -> Self {
        let mut total = RunSummary::new(label);
        for part in parts {
            total.total_records += part.total_records;
            total.pending += part.pending;
            total.skipped += part.skipped;
            total.deferred += part.deferred;
            total.completed += part.completed;
            total.found += part.found;
            total.no_posts += part.no_posts;
            total.failed.extend(part.failed.iter().cloned());
            total.found_handles.extend(part.found_handles.iter().cloned());
            total.interrupted |= part.interrupted;
            total.elapsed += part.elapsed;
            total.peak_in_flight = total.peak_in_flight.max(part.peak_in_flight);
        }
        total
    }

    pub fn log(&self) {
        let status = if self.interrupted {
            "⚠️ INTERRUPTED"
        } else {
            "📊 SUMMARY"
        };
        logger::info(
            LogTag::Summary,
            &format!("{} for {}", status, self.worksheet),
        );
        logger::info(
            LogTag::Summary,
            &format!(
                "   Records: {} | already done: {} | pending: {} | deferred by limit: {}",
                self.total_records, self.skipped, self.pending, self.deferred
            ),
        );
        logger::info(
            LogTag::Summary,
            &format!(
                "   Completed: {} | posts found: {} | no posts: {} | failed: {}",
                self.completed,
                self.found,
                self.no_posts,
                self.failed.len()
            ),
        );

        let average = self
            .average_secs()
            .map(|avg| format!("{:.2}s per wallet", avg))
            .unwrap_or_else(|| "n/a".to_string());
        logger::info(
            LogTag::Summary,
            &format!(
                "   Time: {:.1}s ({:.2} min), average {}",
                self.elapsed.as_secs_f64(),
                self.elapsed.as_secs_f64() / 60.0,
                average
            ),
        );

        if !self.found_handles.is_empty() {
            logger::info(LogTag::Summary, "📋 Wallets with posts found:");
            for found in self.found_handles.iter().take(SHOWN_HANDLES) {
                logger::info(
                    LogTag::Summary,
                    &format!(
                        "   Row {}: {} -> {} ({})",
                        found.row,
                        short(&found.wallet),
                        found.handle.as_deref().unwrap_or("N/A"),
                        found.confidence
                    ),
                );
            }
            if self.found_handles.len() > SHOWN_HANDLES {
                logger::info(
                    LogTag::Summary,
                    &format!(
                        "   ... and {} more",
                        self.found_handles.len() - SHOWN_HANDLES
                    ),
                );
            }
        }

        for failed in &self.failed {
            logger::warning(
                LogTag::Summary,
                &format!(
                    "   ❌ Row {} ({}): {}",
                    failed.row,
                    failed.wallet,
                    failed.reason
                ),
            );
        }
    }
}
