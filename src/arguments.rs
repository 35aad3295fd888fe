/// Centralized argument handling for walletscout
///
/// Features:
/// - Process-wide CMD_ARGS storage with thread-safe access
/// - Flag and value lookups used by the logger and by `main`
/// - Translation of command-line flags into configuration overrides
use crate::config::Overrides;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::env;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Replace the stored arguments (tests and embedding callers)
pub fn set_cmd_args(args: Vec<String>) {
    *CMD_ARGS.lock() = args;
}

/// Copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    CMD_ARGS.lock().clone()
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following the first occurrence of `flag`
pub fn get_arg_value(flag: &str) -> Option<String> {
    get_arg_values(flag).into_iter().next()
}

/// Values following every occurrence of `flag` (repeatable flags)
pub fn get_arg_values(flag: &str) -> Vec<String> {
    values_for(&get_cmd_args(), flag)
}

fn values_for(args: &[String], flag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let prefix = format!("{}=", flag);
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == flag {
            if let Some(next) = iter.peek() {
                if !next.starts_with("--") {
                    values.push((*next).clone());
                    iter.next();
                }
            }
        } else if let Some(value) = arg.strip_prefix(&prefix) {
            values.push(value.to_string());
        }
    }
    values
}

// =============================================================================
// LOGGER FLAGS
// =============================================================================

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

pub fn is_file_logging_disabled() -> bool {
    has_arg("--no-log-file")
}

/// Tags named by `--debug-<tag>` flags (`--debug-all` yields "all")
pub fn get_debug_tags() -> Vec<String> {
    get_cmd_args()
        .iter()
        .filter_map(|a| a.strip_prefix("--debug-"))
        .map(|tag| tag.to_lowercase())
        .collect()
}

// =============================================================================
// CONFIGURATION OVERRIDES
// =============================================================================

/// Build configuration overrides from the stored arguments
pub fn get_config_overrides() -> Result<Overrides, String> {
    overrides_from(&get_cmd_args())
}

fn overrides_from(args: &[String]) -> Result<Overrides, String> {
    let number = |flag: &str| -> Result<Option<usize>, String> {
        match values_for(args, flag).into_iter().next() {
            Some(raw) => raw
                .parse::<usize>()
                .map(Some)
                .map_err(|_| format!("{} expects a number, got '{}'", flag, raw)),
            None => Ok(None),
        }
    };

    // Zero or negative means every wallet
    let limit = match values_for(args, "--limit").into_iter().next() {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map(|n| usize::try_from(n.max(0)).unwrap_or(usize::MAX))
                .map_err(|_| format!("--limit expects a number, got '{}'", raw))?,
        ),
        None => None,
    };

    Ok(Overrides {
        config_path: values_for(args, "--config").into_iter().next(),
        worksheets: values_for(args, "--worksheet"),
        limit,
        sequential: args.iter().any(|a| a == "--sequential"),
        max_concurrent: number("--max-concurrent")?,
        checkpoint_dir: values_for(args, "--checkpoint-dir").into_iter().next(),
    })
}

/// Print usage information
pub fn print_help() {
    println!("walletscout - find the X/Twitter owner of wallet addresses listed in a Google Sheet");
    println!();
    println!("USAGE:");
    println!("    walletscout [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>          TOML configuration file (default: walletscout.toml if present)");
    println!("    --worksheet <name>       Worksheet to process, repeatable (overrides WORKSHEET_NAME)");
    println!("    --limit <n>              Max wallets per worksheet, 0 or less = all (overrides WALLET_LIMIT)");
    println!("    --sequential             Process one wallet at a time");
    println!("    --max-concurrent <n>     Worker slots (overrides MAX_CONCURRENT_REQUESTS)");
    println!("    --checkpoint-dir <dir>   Checkpoint directory (overrides CHECKPOINT_DIR)");
    println!("    --debug-<tag>            Debug logs for a tag: scheduler, ratelimit, checkpoint, oracle, sheets, config, all");
    println!("    --verbose                Very detailed logs");
    println!("    --quiet                  Warnings and errors only");
    println!("    --no-log-file            Console logging only");
    println!("    -h, --help               Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    XAI_API_KEY, GROK_MODEL, GOOGLE_SHEET_ID, GOOGLE_CREDENTIALS_JSON, GOOGLE_CREDENTIALS_FILE,");
    println!("    WORKSHEET_NAME, WORKSHEETS_TO_PROCESS, WALLET_LIMIT, USE_PARALLEL, MAX_CONCURRENT_REQUESTS,");
    println!("    RATE_LIMIT_DELAY, RATE_LIMIT_ERROR_DELAY, MAX_BACKOFF_DELAY, RATE_LIMIT_WINDOW,");
    println!("    MAX_REQUESTS_PER_WINDOW, FATAL_POLICY, CHECKPOINT_DIR, RAILWAY_VOLUME_MOUNT_PATH");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_values_for_repeatable_and_inline() {
        let argv = args(&[
            "walletscout",
            "--worksheet",
            "Sheet A",
            "--worksheet=Sheet B",
            "--worksheet",
            "--verbose",
        ]);
        assert_eq!(
            values_for(&argv, "--worksheet"),
            vec!["Sheet A".to_string(), "Sheet B".to_string()]
        );
    }

    #[test]
    fn test_overrides_from_args() {
        let argv = args(&[
            "walletscout",
            "--limit",
            "10",
            "--sequential",
            "--checkpoint-dir=/data",
        ]);
        let overrides = overrides_from(&argv).unwrap();
        assert_eq!(overrides.limit, Some(10));
        assert!(overrides.sequential);
        assert_eq!(overrides.checkpoint_dir.as_deref(), Some("/data"));
        assert!(overrides.worksheets.is_empty());
        assert_eq!(overrides.max_concurrent, None);
    }

    #[test]
    fn test_negative_limit_means_unlimited() {
        let argv = args(&["walletscout", "--limit", "-1"]);
        assert_eq!(overrides_from(&argv).unwrap().limit, Some(0));
    }

    #[test]
    fn test_bad_number_is_reported() {
        let argv = args(&["walletscout", "--max-concurrent", "many"]);
        let err = overrides_from(&argv).unwrap_err();
        assert!(err.contains("--max-concurrent"));
    }
}
