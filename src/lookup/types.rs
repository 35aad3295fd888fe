/// Lookup data model: input records and classification results
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Wallet address, the unique identifier of the record
    pub wallet: String,
    /// 1-based sheet row the result is written back to
    pub row: usize,
    /// The row already carries a completed run marker
    pub processed: bool,
}

impl Record {
    pub fn new(wallet: impl Into<String>, row: usize) -> Self {
        Self {
            wallet: wallet.into(),
            row,
            processed: false,
        }
    }
}

/// How strongly the oracle ties a wallet to a handle
///
/// The string forms are an external contract and are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::None => "None",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of the ownership stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Handle without the leading "@"
    pub username: Option<String>,
    pub confidence: Confidence,
}

/// Final classification of one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub exists: bool,
    /// Always "@"-prefixed when present
    pub handle: Option<String>,
    pub confidence: Confidence,
    pub processed_at: DateTime<Utc>,
}

impl LookupResult {
    /// No post references the wallet
    pub fn no_posts() -> Self {
        Self {
            exists: false,
            handle: None,
            confidence: Confidence::None,
            processed_at: Utc::now(),
        }
    }

    /// Posts exist; `ownership` names the most likely owner, if any
    pub fn found(ownership: Ownership) -> Self {
        Self {
            exists: true,
            handle: ownership.username.as_deref().and_then(normalize_handle),
            confidence: ownership.confidence,
            processed_at: Utc::now(),
        }
    }

    /// Cell value of the Post-Exists column
    pub fn post_exists_cell(&self) -> &'static str {
        if self.exists {
            "true"
        } else {
            "false"
        }
    }

    /// Cell value of the Twitter-Handle column
    pub fn handle_cell(&self) -> &str {
        self.handle.as_deref().unwrap_or("")
    }
}

/// "@"-prefixed handle, or None for blank input
pub fn normalize_handle(raw: &str) -> Option<String> {
    let bare = raw.trim().trim_start_matches('@').trim();
    if bare.is_empty() {
        None
    } else {
        Some(format!("@{}", bare))
    }
}
