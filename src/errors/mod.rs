/// Error taxonomy for walletscout
///
/// Oracle failures classify themselves into a `FailureClass` that drives
/// retries; everything else is either a per-record failure (`LookupError`)
/// or a startup failure that aborts the run (`AppError`).
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// FAILURE CLASSES
// =============================================================================

/// How a failed oracle call should be treated by the retry driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Caller exceeded the permitted request rate, retry with backoff
    Throttled,
    /// Network-level hiccup, retry with a short fixed delay
    Transient,
    /// Not retried
    Fatal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Throttled => write!(f, "throttled"),
            FailureClass::Transient => write!(f, "transient"),
            FailureClass::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors the retry driver knows how to treat
pub trait Classify {
    fn class(&self) -> FailureClass;

    /// Server-suggested wait before the next attempt
    fn retry_after_ms(&self) -> Option<u64> {
        None
    }
}

// =============================================================================
// ORACLE ERRORS
// =============================================================================

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("[{provider}] Rate limited{}", retry_hint(.retry_after_ms))]
    RateLimited {
        provider: String,
        retry_after_ms: Option<u64>,
    },

    #[error("[{provider}] Request timeout ({timeout_ms}ms)")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("[{provider}] Network error: {message}")]
    Network { provider: String, message: String },

    #[error("[{provider}] Server error {status}: {message}")]
    Server {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("[{provider}] Auth error: {message}")]
    Auth { provider: String, message: String },

    #[error("[{provider}] Invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("[{provider}] Parse error: {message}")]
    Parse { provider: String, message: String },

    #[error("[{provider}] API error {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
}

fn retry_hint(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(" (retry after {}ms)", ms),
        None => String::new(),
    }
}

impl OracleError {
    pub fn class(&self) -> FailureClass {
        match self {
            OracleError::RateLimited { .. } => FailureClass::Throttled,
            OracleError::Timeout { .. }
            | OracleError::Network { .. }
            | OracleError::Server { .. } => FailureClass::Transient,
            OracleError::Auth { .. }
            | OracleError::InvalidResponse { .. }
            | OracleError::Parse { .. }
            | OracleError::Api { .. } => FailureClass::Fatal,
        }
    }

    /// Server-suggested wait, if the provider sent one
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            OracleError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Map a non-success HTTP status and body to an error
    ///
    /// Some gateways report throttling with a generic status and a textual body,
    /// so the body is checked for rate-limit wording before the status.
    pub fn from_status(
        provider: &str,
        status: u16,
        body: String,
        retry_after_ms: Option<u64>,
    ) -> Self {
        let provider = provider.to_string();
        if status == 429 || mentions_rate_limit(&body) {
            return OracleError::RateLimited {
                provider,
                retry_after_ms,
            };
        }
        match status {
            401 | 403 => OracleError::Auth {
                provider,
                message: body,
            },
            500..=599 => OracleError::Server {
                provider,
                status,
                message: body,
            },
            _ => OracleError::Api {
                provider,
                status,
                message: body,
            },
        }
    }
}

impl Classify for OracleError {
    fn class(&self) -> FailureClass {
        OracleError::class(self)
    }

    fn retry_after_ms(&self) -> Option<u64> {
        OracleError::retry_after_ms(self)
    }
}

/// True when an error text describes throttling
pub fn mentions_rate_limit(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("resource_exhausted")
}

// =============================================================================
// LOOKUP ERRORS
// =============================================================================

/// Which oracle call of the two-stage protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Existence,
    Ownership,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Existence => write!(f, "existence"),
            Stage::Ownership => write!(f, "ownership"),
        }
    }
}

/// Per-record failure surfaced to the scheduler
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("{stage} stage failed: {source}")]
    Fatal { stage: Stage, source: OracleError },

    #[error("{stage} stage gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        stage: Stage,
        attempts: u32,
        source: OracleError,
    },
}

impl LookupError {
    pub fn stage(&self) -> Stage {
        match self {
            LookupError::Fatal { stage, .. } | LookupError::RetriesExhausted { stage, .. } => {
                *stage
            }
        }
    }

    /// Class of the last underlying failure
    pub fn class(&self) -> FailureClass {
        match self {
            LookupError::Fatal { source, .. } | LookupError::RetriesExhausted { source, .. } => {
                source.class()
            }
        }
    }
}

// =============================================================================
// SPREADSHEET ERRORS
// =============================================================================

#[derive(Debug, Clone, Error)]
pub enum SheetsError {
    #[error("Sheets auth error: {0}")]
    Auth(String),

    #[error("Sheets request failed: {0}")]
    Network(String),

    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Sheets response could not be decoded: {0}")]
    Parse(String),

    #[error("Worksheet '{worksheet}' has no wallet address column")]
    MissingWalletColumn { worksheet: String },

    #[error("Worksheet '{worksheet}' is empty (no header row)")]
    EmptyWorksheet { worksheet: String },
}

impl SheetsError {
    /// Map a non-success HTTP status and body to an error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => SheetsError::Auth(message),
            _ => SheetsError::Api { status, message },
        }
    }

    /// The spreadsheet itself is unreachable (bad credentials, no access,
    /// unknown id), so every worksheet would fail the same way
    pub fn is_spreadsheet_level(&self) -> bool {
        matches!(
            self,
            SheetsError::Auth(_) | SheetsError::Api { status: 404, .. }
        )
    }
}

impl Classify for SheetsError {
    fn class(&self) -> FailureClass {
        match self {
            SheetsError::Network(_) => FailureClass::Transient,
            SheetsError::Api { status: 429, .. } => FailureClass::Throttled,
            SheetsError::Api { message, .. } if mentions_rate_limit(message) => {
                FailureClass::Throttled
            }
            SheetsError::Api { status, .. } if *status >= 500 => FailureClass::Transient,
            _ => FailureClass::Fatal,
        }
    }
}

// =============================================================================
// CHECKPOINT ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to read checkpoint {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to append to checkpoint {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Checkpoint update did not complete: {0}")]
    Background(String),
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config '{field}': {hint}")]
    Missing { field: String, hint: String },

    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to read config file '{path}': {reason}")]
    File { path: String, reason: String },
}

impl ConfigError {
    pub fn missing(field: &str, hint: &str) -> Self {
        ConfigError::Missing {
            field: field.to_string(),
            hint: hint.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TOP LEVEL
// =============================================================================

/// Errors that end a whole run (or a whole worksheet) before dispatch
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Spreadsheet error: {0}")]
    Sheets(#[from] SheetsError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Oracle setup error: {0}")]
    Oracle(String),
}

impl AppError {
    /// False only for problems confined to one worksheet
    pub fn aborts_run(&self) -> bool {
        match self {
            AppError::Sheets(e) => e.is_spreadsheet_level(),
            _ => true,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
