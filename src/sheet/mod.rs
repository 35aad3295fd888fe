//! Spreadsheet side of the pipeline
//!
//! `RecordSource` yields the wallets of one worksheet, `ResultSink` writes a
//! classification back to a row. `SheetsWorksheet` implements both over the
//! Google Sheets API.

pub mod columns;
mod worksheet;

pub use columns::{cell_ref, column_letter, ColumnMap, MissingHeader};
pub use worksheet::SheetsWorksheet;

use crate::errors::SheetsError;
use crate::lookup::{LookupResult, Record};
use async_trait::async_trait;

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Worksheet name, also the checkpoint queue name
    fn name(&self) -> &str;

    /// Every record in input order
    async fn load_records(&self) -> Result<Vec<Record>, SheetsError>;
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Overwrite the output cells of `row` with `result`
    ///
    /// Writing the same result twice leaves the same final state.
    async fn write(&self, row: usize, result: &LookupResult) -> Result<(), SheetsError>;
}
