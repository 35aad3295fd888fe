/// One Google Sheets worksheet as a record source and result sink
use super::columns::{ColumnMap, MissingHeader};
use super::{RecordSource, ResultSink};
use crate::apis::sheets::{quote_worksheet, SheetsClient, ValueRange};
use crate::errors::SheetsError;
use crate::logger::{self, LogTag};
use crate::lookup::{LookupResult, Record};
use async_trait::async_trait;
use std::sync::Arc;

pub struct SheetsWorksheet {
    client: Arc<SheetsClient>,
    name: String,
    columns: ColumnMap,
}

impl SheetsWorksheet {
    /// Read the header row, create missing output columns and map them
    pub async fn open(client: Arc<SheetsClient>, name: &str) -> Result<Self, SheetsError> {
        let header_range = format!("{}!1:1", quote_worksheet(name));
        let headers = client
            .get_values(&header_range)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(SheetsError::EmptyWorksheet {
                worksheet: name.to_string(),
            });
        }

        let (columns, missing) = ColumnMap::from_headers(name, &headers)?;
        if !missing.is_empty() {
            create_headers(&client, name, &missing).await?;
        }

        logger::info(
            LogTag::Sheets,
            &format!(
                "✅ Worksheet '{}' connected (wallet: {}, post exist: {}, handle: {}, confidence: {}, script run: {})",
                name,
                super::column_letter(columns.wallet),
                super::column_letter(columns.post_exists),
                super::column_letter(columns.handle),
                super::column_letter(columns.confidence),
                super::column_letter(columns.script_run),
            ),
        );

        Ok(Self {
            client,
            name: name.to_string(),
            columns,
        })
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }
}

async fn create_headers(
    client: &SheetsClient,
    worksheet: &str,
    missing: &[MissingHeader],
) -> Result<(), SheetsError> {
    let quoted = quote_worksheet(worksheet);
    let data = missing
        .iter()
        .map(|header| ValueRange {
            range: format!("{}!{}", quoted, super::cell_ref(header.column, 1)),
            major_dimension: Some("ROWS".to_string()),
            values: vec![vec![header.title.to_string()]],
        })
        .collect();

    client.batch_update(data).await?;

    let titles: Vec<&str> = missing.iter().map(|h| h.title).collect();
    logger::info(
        LogTag::Sheets,
        &format!("➕ Added column(s) to '{}': {}", worksheet, titles.join(", ")),
    );
    Ok(())
}

/// Ranges of one result write; every output cell is set, blanks included,
/// so repeating the same write leaves the row unchanged
fn row_update(
    worksheet: &str,
    columns: &ColumnMap,
    row: usize,
    result: &LookupResult,
) -> Vec<ValueRange> {
    let quoted = quote_worksheet(worksheet);
    columns
        .output_cells(row, result)
        .into_iter()
        .map(|(cell, value)| ValueRange {
            range: format!("{}!{}", quoted, cell),
            major_dimension: Some("ROWS".to_string()),
            values: vec![vec![value]],
        })
        .collect()
}

#[async_trait]
impl RecordSource for SheetsWorksheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_records(&self) -> Result<Vec<Record>, SheetsError> {
        let rows = self.client.get_values(&quote_worksheet(&self.name)).await?;
        let records = self.columns.records(&rows);
        logger::info(
            LogTag::Sheets,
            &format!(
                "📄 '{}': {} data rows, {} with a wallet address",
                self.name,
                rows.len().saturating_sub(1),
                records.len()
            ),
        );
        Ok(records)
    }
}

#[async_trait]
impl ResultSink for SheetsWorksheet {
    async fn write(&self, row: usize, result: &LookupResult) -> Result<(), SheetsError> {
        let data = row_update(&self.name, &self.columns, row, result);
        self.client.batch_update(data).await?;
        logger::debug(
            LogTag::Sheets,
            &format!("💾 Updated row {} in '{}'", row, self.name),
        );
        Ok(())
    }
}
