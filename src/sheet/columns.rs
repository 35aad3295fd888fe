/// Header detection and A1 addressing for a wallet worksheet
use crate::errors::SheetsError;
use crate::lookup::{LookupResult, Record};

pub const POST_EXISTS_HEADER: &str = "Post Exist?";
pub const HANDLE_HEADER: &str = "Twitter Handle";
pub const CONFIDENCE_HEADER: &str = "Confidence Score";
pub const SCRIPT_RUN_HEADER: &str = "Script Run";

/// 1-based column numbers of every column the pipeline reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub wallet: usize,
    pub post_exists: usize,
    pub handle: usize,
    pub confidence: usize,
    pub script_run: usize,
}

/// Header cells that must be created before the map is usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingHeader {
    pub column: usize,
    pub title: &'static str,
}

impl ColumnMap {
    /// Build the map from row 1
    ///
    /// Each header is assigned to the first kind it matches; later duplicates
    /// of a kind win, as the sheet is read left to right. Output columns that
    /// are absent get placed after the last header, in a fixed order.
    pub fn from_headers(
        worksheet: &str,
        headers: &[String],
    ) -> Result<(ColumnMap, Vec<MissingHeader>), SheetsError> {
        let mut wallet = None;
        let mut post_exists = None;
        let mut handle = None;
        let mut confidence = None;
        let mut script_run = None;

        for (i, header) in headers.iter().enumerate() {
            let lower = header.to_lowercase();
            let column = i + 1;
            if lower.contains("wallet") && lower.contains("address") {
                wallet = Some(column);
            } else if lower.contains("post exist") || lower.contains("post_exist") {
                post_exists = Some(column);
            } else if lower.contains("twitter") && lower.contains("handle") {
                handle = Some(column);
            } else if lower.contains("confidence") && lower.contains("score") {
                confidence = Some(column);
            } else if lower.contains("script") && lower.contains("run") {
                script_run = Some(column);
            }
        }

        let wallet = wallet.ok_or_else(|| SheetsError::MissingWalletColumn {
            worksheet: worksheet.to_string(),
        })?;

        let mut next_free = headers.len();
        let mut missing = Vec::new();
        let mut place = |found: Option<usize>, title: &'static str| {
            found.unwrap_or_else(|| {
                next_free += 1;
                missing.push(MissingHeader {
                    column: next_free,
                    title,
                });
                next_free
            })
        };

        let map = ColumnMap {
            wallet,
            post_exists: place(post_exists, POST_EXISTS_HEADER),
            handle: place(handle, HANDLE_HEADER),
            confidence: place(confidence, CONFIDENCE_HEADER),
            script_run: place(script_run, SCRIPT_RUN_HEADER),
        };
        Ok((map, missing))
    }

    /// Records from data rows (row 1 is the header and is skipped)
    ///
    /// Rows with a blank wallet cell are ignored; the sheet API trims trailing
    /// empty cells, so short rows are normal.
    pub fn records(&self, rows: &[Vec<String>]) -> Vec<Record> {
        rows.iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, row)| {
                let wallet = cell(row, self.wallet).trim();
                if wallet.is_empty() {
                    return None;
                }
                Some(Record {
                    wallet: wallet.to_string(),
                    row: i + 1,
                    processed: cell(row, self.script_run).trim().eq_ignore_ascii_case("true"),
                })
            })
            .collect()
    }

    /// The four output cells of `row` as (A1 cell, value)
    pub fn output_cells(&self, row: usize, result: &LookupResult) -> Vec<(String, String)> {
        vec![
            (
                cell_ref(self.post_exists, row),
                result.post_exists_cell().to_string(),
            ),
            (cell_ref(self.handle, row), result.handle_cell().to_string()),
            (
                cell_ref(self.confidence, row),
                result.confidence.as_str().to_string(),
            ),
            (cell_ref(self.script_run, row), "true".to_string()),
        ]
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column.saturating_sub(1))
        .map(String::as_str)
        .unwrap_or("")
}

/// 1 -> A, 26 -> Z, 27 -> AA
pub fn column_letter(column: usize) -> String {
    let mut n = column.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 reference of a single cell, e.g. `C5`
pub fn cell_ref(column: usize, row: usize) -> String {
    format!("{}{}", column_letter(column), row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{Confidence, Ownership};

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(8), "H");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
        assert_eq!(cell_ref(3, 17), "C17");
    }

    #[test]
    fn test_full_header_row() {
        let headers = strings(&[
            "Rank",
            "Wallet Address",
            "Balance",
            "Post Exist?",
            "Twitter Handle",
            "Confidence Score",
            "",
            "Script Run",
        ]);
        let (map, missing) = ColumnMap::from_headers("Gigabud Holders", &headers).unwrap();
        assert!(missing.is_empty());
        assert_eq!(
            map,
            ColumnMap {
                wallet: 2,
                post_exists: 4,
                handle: 5,
                confidence: 6,
                script_run: 8,
            }
        );
    }

    #[test]
    fn test_missing_output_columns_are_appended() {
        let headers = strings(&["wallet_address", "Notes", "confidence score"]);
        let (map, missing) = ColumnMap::from_headers("Sheet", &headers).unwrap();

        assert_eq!(map.wallet, 1);
        assert_eq!(map.confidence, 3);
        assert_eq!(map.post_exists, 4);
        assert_eq!(map.handle, 5);
        assert_eq!(map.script_run, 6);
        assert_eq!(
            missing,
            vec![
                MissingHeader {
                    column: 4,
                    title: POST_EXISTS_HEADER
                },
                MissingHeader {
                    column: 5,
                    title: HANDLE_HEADER
                },
                MissingHeader {
                    column: 6,
                    title: SCRIPT_RUN_HEADER
                },
            ]
        );
    }

    #[test]
    fn test_missing_wallet_column_is_an_error() {
        let headers = strings(&["Address", "Twitter Handle"]);
        let err = ColumnMap::from_headers("Sheet", &headers).unwrap_err();
        assert!(matches!(err, SheetsError::MissingWalletColumn { .. }));
    }

    #[test]
    fn test_records_skip_blank_wallets_and_read_flag() {
        let map = ColumnMap {
            wallet: 1,
            post_exists: 2,
            handle: 3,
            confidence: 4,
            script_run: 5,
        };
        let rows = vec![
            strings(&["Wallet Address", "Post Exist?", "Twitter Handle", "Confidence Score", "Script Run"]),
            strings(&[" 0xAAA "]),
            strings(&[""]),
            strings(&["0xCCC", "true", "@x", "High", "TRUE"]),
            vec![],
            strings(&["0xEEE", "", "", "", "false"]),
        ];

        let records = map.records(&rows);
        assert_eq!(
            records,
            vec![
                Record {
                    wallet: "0xAAA".to_string(),
                    row: 2,
                    processed: false
                },
                Record {
                    wallet: "0xCCC".to_string(),
                    row: 4,
                    processed: true
                },
                Record {
                    wallet: "0xEEE".to_string(),
                    row: 6,
                    processed: false
                },
            ]
        );
    }

    #[test]
    fn test_output_cells() {
        let map = ColumnMap {
            wallet: 2,
            post_exists: 4,
            handle: 5,
            confidence: 6,
            script_run: 8,
        };

        let none = map.output_cells(3, &LookupResult::no_posts());
        assert_eq!(
            none,
            vec![
                ("D3".to_string(), "false".to_string()),
                ("E3".to_string(), "".to_string()),
                ("F3".to_string(), "None".to_string()),
                ("H3".to_string(), "true".to_string()),
            ]
        );

        let found = LookupResult::found(Ownership {
            username: Some("owner".to_string()),
            confidence: Confidence::High,
        });
        let cells = map.output_cells(9, &found);
        assert_eq!(cells[0].1, "true");
        assert_eq!(cells[1].1, "@owner");
        assert_eq!(cells[2].1, "High");
    }
}
