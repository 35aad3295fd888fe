//! Centralized path resolution for walletscout
//!
//! ## Path Strategy
//!
//! - Logs live under the platform data directory:
//!   - **macOS**: `~/Library/Application Support/walletscout/logs`
//!   - **Windows**: `%LOCALAPPDATA%\walletscout\logs`
//!   - **Linux**: `$XDG_DATA_HOME/walletscout/logs` (fallback `~/.local/share/...`)
//! - Checkpoints default to the system scratch directory (`/tmp` on Linux),
//!   which is what container platforms mount a persistent volume over.
//!
//! ```text
//! <checkpoint dir>/
//! ├── checkpoint_gigabud_holders_f1b7d935.txt
//! └── checkpoint_<worksheet slug>_<name digest>.txt
//! ```

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "walletscout";

/// Lazy-initialized base directory (thread-safe)
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

fn resolve_base_directory() -> PathBuf {
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(dir) = dirs::home_dir() {
        return dir.join(format!(".{}", APP_DIR));
    }

    PathBuf::from(APP_DIR)
}

/// Returns the base directory for walletscout data
pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the log directory, honoring an explicit override
pub fn get_logs_directory(configured: Option<&str>) -> PathBuf {
    match configured {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => BASE_DIRECTORY.join("logs"),
    }
}

/// Returns the checkpoint directory, honoring an explicit override
pub fn get_checkpoint_directory(configured: Option<&str>) -> PathBuf {
    match configured {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// File-system friendly form of a worksheet name
///
/// Lowercased; every run of characters outside `[a-z0-9]` becomes one `_`.
pub fn worksheet_slug(worksheet: &str) -> String {
    let mut slug = String::with_capacity(worksheet.len());
    let mut pending_separator = false;

    for ch in worksheet.trim().chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("default");
    }
    slug
}

/// First 8 hex digits of the SHA-256 of the exact worksheet name
fn name_digest(worksheet: &str) -> String {
    Sha256::digest(worksheet.as_bytes())
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Checkpoint file for one worksheet inside `dir`
///
/// The slug keeps the name readable; the digest keeps names that slug the
/// same ("Q3 Airdrop", "q3/airdrop") in separate files.
pub fn get_checkpoint_path(dir: &Path, worksheet: &str) -> PathBuf {
    dir.join(format!(
        "checkpoint_{}_{}.txt",
        worksheet_slug(worksheet),
        name_digest(worksheet)
    ))
}
