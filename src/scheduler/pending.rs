/// Pending-set computation
use crate::lookup::Record;
use std::collections::HashSet;

/// Records eligible for this run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    /// In input order
    pub records: Vec<Record>,
    /// Records excluded because they were already done
    pub skipped: usize,
    /// Eligible records left out by the limit
    pub deferred: usize,
}

/// `records` minus `done`, optionally minus rows already marked, then
/// truncated to `limit` (0 = unlimited). Input order is preserved.
pub fn compute_pending(
    records: Vec<Record>,
    done: &HashSet<String>,
    skip_marked_rows: bool,
    limit: usize,
) -> PendingSet {
    let total = records.len();
    let mut eligible: Vec<Record> = records
        .into_iter()
        .filter(|r| !done.contains(&r.wallet))
        .filter(|r| !(skip_marked_rows && r.processed))
        .collect();

    let skipped = total - eligible.len();
    let mut deferred = 0;
    if limit > 0 && eligible.len() > limit {
        deferred = eligible.len() - limit;
        eligible.truncate(limit);
    }

    PendingSet {
        records: eligible,
        skipped,
        deferred,
    }
}
