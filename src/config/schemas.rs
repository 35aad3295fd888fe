/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use crate::config_struct;
use serde::{Deserialize, Serialize};

// ============================================================================
// ORACLE CONFIGURATION
// ============================================================================

config_struct! {
    /// AI search oracle (xAI) settings
    pub struct OracleConfig {
        /// API key (XAI_API_KEY / xai_key)
        api_key: String = String::new(),
        /// Model used for both lookup stages (GROK_MODEL)
        model: String = "grok-4-fast".to_string(),
        base_url: String = "https://api.x.ai/v1".to_string(),
        /// Live search calls are slow, keep this generous
        request_timeout_secs: u64 = 120,
    }
}

// ============================================================================
// SPREADSHEET CONFIGURATION
// ============================================================================

config_struct! {
    /// Google Sheets settings
    pub struct SheetsConfig {
        /// Spreadsheet key (GOOGLE_SHEET_ID)
        sheet_id: String = String::new(),
        /// Inline service account JSON (GOOGLE_CREDENTIALS_JSON)
        credentials_json: Option<String> = None,
        /// Path to a service account JSON file (GOOGLE_CREDENTIALS_FILE)
        credentials_file: Option<String> = None,
        /// Worksheets processed in order (WORKSHEET_NAME / WORKSHEETS_TO_PROCESS)
        worksheets: Vec<String> = vec!["Gigabud Holders".to_string()],
        /// Pause between two worksheets
        worksheet_pause_secs: u64 = 5,
        request_timeout_secs: u64 = 30,

        // Sheets API quota guard
        window_secs: u64 = 60,
        max_requests_per_window: usize = 60,
    }
}

// ============================================================================
// SCHEDULER CONFIGURATION
// ============================================================================

/// What happens to a record whose lookup failed permanently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Not written, not checkpointed; reported and retried next run
    LeavePending,
    /// Checkpointed without a sheet write, never retried
    MarkDone,
}

impl FatalPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "leave_pending" | "pending" | "surface" => Some(FatalPolicy::LeavePending),
            "mark_done" | "done" | "skip" => Some(FatalPolicy::MarkDone),
            _ => None,
        }
    }
}

config_struct! {
    /// Worker pool settings
    pub struct SchedulerConfig {
        /// Maximum records per worksheet per run, 0 = unlimited (WALLET_LIMIT)
        limit: usize = 0,
        /// Run lookups concurrently (USE_PARALLEL)
        use_parallel: bool = true,
        /// Worker slots when parallel (MAX_CONCURRENT_REQUESTS)
        max_concurrent: usize = 5,
        /// Politeness delay between sequential dispatches (RATE_LIMIT_DELAY)
        request_delay_secs: u64 = 1,
        /// Also skip rows whose Script Run cell already says "true"
        skip_marked_rows: bool = false,
        fatal_policy: FatalPolicy = FatalPolicy::LeavePending,
    }
}

impl SchedulerConfig {
    /// Effective number of worker slots
    pub fn concurrency(&self) -> usize {
        if self.use_parallel {
            self.max_concurrent.max(1)
        } else {
            1
        }
    }
}

// ============================================================================
// RATE LIMIT CONFIGURATION
// ============================================================================

config_struct! {
    /// Oracle request window and throttling backoff
    pub struct RateLimitConfig {
        /// Trailing window length (RATE_LIMIT_WINDOW)
        window_secs: u64 = 60,
        /// Admitted requests per window (MAX_REQUESTS_PER_WINDOW)
        max_requests_per_window: usize = 50,
        /// First backoff delay after a throttling error (RATE_LIMIT_ERROR_DELAY)
        error_delay_secs: u64 = 60,
        /// Backoff ceiling (MAX_BACKOFF_DELAY)
        max_backoff_secs: u64 = 300,
    }
}

config_struct! {
    /// Per-call retry budget
    pub struct RetryConfig {
        max_throttled_attempts: u32 = 4,
        max_transient_attempts: u32 = 3,
        transient_delay_secs: u64 = 2,
    }
}

// ============================================================================
// PERSISTENCE / LOGGING
// ============================================================================

config_struct! {
    /// Checkpoint files location
    pub struct CheckpointConfig {
        /// Directory for checkpoint files (CHECKPOINT_DIR / RAILWAY_VOLUME_MOUNT_PATH)
        dir: Option<String> = None,
    }
}

config_struct! {
    pub struct LoggingConfig {
        file_logging: bool = true,
        log_dir: Option<String> = None,
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        oracle: OracleConfig = OracleConfig::default(),
        sheets: SheetsConfig = SheetsConfig::default(),
        scheduler: SchedulerConfig = SchedulerConfig::default(),
        rate_limit: RateLimitConfig = RateLimitConfig::default(),
        retry: RetryConfig = RetryConfig::default(),
        checkpoint: CheckpointConfig = CheckpointConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
