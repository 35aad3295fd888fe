/// Configuration utilities - loading, environment overrides and validation
///
/// Load order (later wins):
/// 1. Schema defaults
/// 2. TOML file (`--config <path>`, or `walletscout.toml` when present)
/// 3. Process environment (after `.env` has been merged into it by `main`)
/// 4. Command-line overrides
///
/// Validation runs last; any failure aborts the run before a single lookup
/// is dispatched.
use super::schemas::{Config, FatalPolicy};
use crate::errors::ConfigError;
use std::path::Path;
use std::str::FromStr;

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "walletscout.toml";

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<String>,
    pub worksheets: Vec<String>,
    pub limit: Option<usize>,
    pub sequential: bool,
    pub max_concurrent: Option<usize>,
    pub checkpoint_dir: Option<String>,
}

/// Load, merge and validate the full configuration
pub fn load_config(overrides: &Overrides) -> Result<Config, ConfigError> {
    let mut config = match &overrides.config_path {
        Some(path) => load_config_from_path(path)?,
        None if Path::new(CONFIG_FILE_PATH).exists() => load_config_from_path(CONFIG_FILE_PATH)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    apply_overrides(&mut config, overrides);
    validate(&config)?;

    Ok(config)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    toml::from_str::<Config>(&contents).map_err(|e| ConfigError::File {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Apply environment variables on top of `config`
///
/// `env` resolves a variable name to its value; `main` passes the process
/// environment, tests pass a map.
pub fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    // Oracle
    if let Some(key) = get("XAI_API_KEY").or_else(|| get("xai_key")) {
        config.oracle.api_key = key;
    }
    if let Some(model) = get("GROK_MODEL") {
        config.oracle.model = model;
    }

    // Sheets
    if let Some(sheet_id) = get("GOOGLE_SHEET_ID") {
        config.sheets.sheet_id = sheet_id;
    }
    if let Some(json) = get("GOOGLE_CREDENTIALS_JSON") {
        config.sheets.credentials_json = Some(json);
    }
    if let Some(file) = get("GOOGLE_CREDENTIALS_FILE") {
        config.sheets.credentials_file = Some(file);
    }
    if let Some(list) = get("WORKSHEETS_TO_PROCESS") {
        config.sheets.worksheets = split_worksheets(&list);
    } else if let Some(name) = get("WORKSHEET_NAME") {
        config.sheets.worksheets = vec![name];
    }

    // Scheduler
    // Zero or negative means every wallet
    if let Some(limit) = parse_var::<i64>(&get, "WALLET_LIMIT")? {
        config.scheduler.limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    }
    if let Some(parallel) = get("USE_PARALLEL") {
        config.scheduler.use_parallel = parse_bool("USE_PARALLEL", &parallel)?;
    }
    if let Some(max) = parse_var::<usize>(&get, "MAX_CONCURRENT_REQUESTS")? {
        config.scheduler.max_concurrent = max;
    }
    if let Some(delay) = parse_var::<u64>(&get, "RATE_LIMIT_DELAY")? {
        config.scheduler.request_delay_secs = delay;
    }
    if let Some(policy) = get("FATAL_POLICY") {
        config.scheduler.fatal_policy = FatalPolicy::from_str(&policy).ok_or_else(|| {
            ConfigError::invalid("FATAL_POLICY", "expected 'leave_pending' or 'mark_done'")
        })?;
    }

    // Rate limiting
    if let Some(delay) = parse_var::<u64>(&get, "RATE_LIMIT_ERROR_DELAY")? {
        config.rate_limit.error_delay_secs = delay;
    }
    if let Some(max) = parse_var::<u64>(&get, "MAX_BACKOFF_DELAY")? {
        config.rate_limit.max_backoff_secs = max;
    }
    if let Some(window) = parse_var::<u64>(&get, "RATE_LIMIT_WINDOW")? {
        config.rate_limit.window_secs = window;
    }
    if let Some(max) = parse_var::<usize>(&get, "MAX_REQUESTS_PER_WINDOW")? {
        config.rate_limit.max_requests_per_window = max;
    }

    // Checkpoints
    if let Some(dir) = get("CHECKPOINT_DIR").or_else(|| get("RAILWAY_VOLUME_MOUNT_PATH")) {
        config.checkpoint.dir = Some(dir);
    }

    Ok(())
}

/// Apply command-line overrides on top of `config`
pub fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if !overrides.worksheets.is_empty() {
        config.sheets.worksheets = overrides.worksheets.clone();
    }
    if let Some(limit) = overrides.limit {
        config.scheduler.limit = limit;
    }
    if overrides.sequential {
        config.scheduler.use_parallel = false;
    }
    if let Some(max) = overrides.max_concurrent {
        config.scheduler.max_concurrent = max;
    }
    if let Some(dir) = &overrides.checkpoint_dir {
        config.checkpoint.dir = Some(dir.clone());
    }
}

/// Check everything a run needs before touching the network
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.oracle.api_key.trim().is_empty() {
        return Err(ConfigError::missing(
            "oracle.api_key",
            "set XAI_API_KEY (or xai_key) in the environment or .env file",
        ));
    }
    if config.oracle.model.trim().is_empty() {
        return Err(ConfigError::invalid("oracle.model", "model name cannot be empty"));
    }
    if config.sheets.sheet_id.trim().is_empty() {
        return Err(ConfigError::missing("sheets.sheet_id", "set GOOGLE_SHEET_ID"));
    }

    match (&config.sheets.credentials_json, &config.sheets.credentials_file) {
        (Some(json), _) => {
            if normalize_credentials_json(json).is_none() {
                return Err(ConfigError::invalid(
                    "sheets.credentials_json",
                    "no JSON object found in GOOGLE_CREDENTIALS_JSON",
                ));
            }
        }
        (None, Some(file)) => {
            if !Path::new(file).exists() {
                return Err(ConfigError::invalid(
                    "sheets.credentials_file",
                    format!("credentials file not found: {}", file),
                ));
            }
        }
        (None, None) => {
            return Err(ConfigError::missing(
                "sheets.credentials",
                "set GOOGLE_CREDENTIALS_JSON or GOOGLE_CREDENTIALS_FILE",
            ));
        }
    }

    if config.sheets.worksheets.iter().all(|w| w.trim().is_empty()) {
        return Err(ConfigError::missing("sheets.worksheets", "set WORKSHEET_NAME"));
    }
    if config.sheets.max_requests_per_window == 0 || config.sheets.window_secs == 0 {
        return Err(ConfigError::invalid(
            "sheets.max_requests_per_window",
            "sheets quota window must be non-empty",
        ));
    }
    if config.scheduler.max_concurrent == 0 {
        return Err(ConfigError::invalid("scheduler.max_concurrent", "must be at least 1"));
    }
    if config.rate_limit.max_requests_per_window == 0 {
        return Err(ConfigError::invalid(
            "rate_limit.max_requests_per_window",
            "must be at least 1",
        ));
    }
    if config.rate_limit.window_secs == 0 {
        return Err(ConfigError::invalid("rate_limit.window_secs", "must be positive"));
    }
    if config.rate_limit.error_delay_secs > config.rate_limit.max_backoff_secs {
        return Err(ConfigError::invalid(
            "rate_limit.error_delay_secs",
            format!(
                "base backoff {}s exceeds maximum {}s",
                config.rate_limit.error_delay_secs, config.rate_limit.max_backoff_secs
            ),
        ));
    }
    if config.retry.max_throttled_attempts == 0 || config.retry.max_transient_attempts == 0 {
        return Err(ConfigError::invalid("retry", "attempt limits must be at least 1"));
    }

    Ok(())
}

/// Extract the JSON object from a credentials value
///
/// Deployment dashboards sometimes wrap the pasted JSON in extra text; when
/// the value does not start with `{` the first `{` .. last `}` span is used.
pub fn normalize_credentials_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return Some(trimmed.to_string());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        Some(trimmed[start..=end].to_string())
    } else {
        None
    }
}

/// Split a comma-separated worksheet list
pub fn split_worksheets(list: &str) -> Vec<String> {
    list.split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a valid number", value))),
        None => Ok(None),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("'{}' is not a boolean", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.oracle.api_key = "xai-test".to_string();
        config.sheets.sheet_id = "sheet-123".to_string();
        config.sheets.credentials_json = Some("{\"type\":\"service_account\"}".to_string());
        config
    }

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.oracle.model, "grok-4-fast");
        assert_eq!(config.sheets.worksheets, vec!["Gigabud Holders".to_string()]);
        assert_eq!(config.scheduler.max_concurrent, 5);
        assert_eq!(config.scheduler.limit, 0);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests_per_window, 50);
        assert_eq!(config.rate_limit.error_delay_secs, 60);
        assert_eq!(config.rate_limit.max_backoff_secs, 300);
        assert_eq!(config.scheduler.fatal_policy, FatalPolicy::LeavePending);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let env = env_from(&[
            ("xai_key", "key-from-alias"),
            ("GOOGLE_SHEET_ID", "abc"),
            ("WORKSHEETS_TO_PROCESS", "Gigabud Holders, Other Holders ,,"),
            ("WORKSHEET_NAME", "ignored"),
            ("WALLET_LIMIT", "25"),
            ("USE_PARALLEL", "false"),
            ("MAX_REQUESTS_PER_WINDOW", "10"),
            ("RAILWAY_VOLUME_MOUNT_PATH", "/data"),
            ("FATAL_POLICY", "mark_done"),
        ]);

        apply_env_overrides(&mut config, env).unwrap();

        assert_eq!(config.oracle.api_key, "key-from-alias");
        assert_eq!(config.sheets.sheet_id, "abc");
        assert_eq!(
            config.sheets.worksheets,
            vec!["Gigabud Holders".to_string(), "Other Holders".to_string()]
        );
        assert_eq!(config.scheduler.limit, 25);
        assert!(!config.scheduler.use_parallel);
        assert_eq!(config.scheduler.concurrency(), 1);
        assert_eq!(config.rate_limit.max_requests_per_window, 10);
        assert_eq!(config.checkpoint.dir.as_deref(), Some("/data"));
        assert_eq!(config.scheduler.fatal_policy, FatalPolicy::MarkDone);
    }

    #[test]
    fn test_non_positive_wallet_limit_means_unlimited() {
        for raw in ["-1", "0", "-250"] {
            let mut config = valid_config();
            config.scheduler.limit = 7;
            apply_env_overrides(&mut config, env_from(&[("WALLET_LIMIT", raw)])).unwrap();
            assert_eq!(config.scheduler.limit, 0, "WALLET_LIMIT={}", raw);
        }
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, env_from(&[("WALLET_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("WALLET_LIMIT"));
    }

    #[test]
    fn test_toml_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scheduler]
            max_concurrent = 8
            fatal_policy = "mark_done"

            [rate_limit]
            window_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.max_concurrent, 8);
        assert_eq!(config.scheduler.fatal_policy, FatalPolicy::MarkDone);
        assert!(config.scheduler.use_parallel);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.rate_limit.max_requests_per_window, 50);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = valid_config();
        apply_overrides(
            &mut config,
            &Overrides {
                worksheets: vec!["Sheet B".to_string()],
                limit: Some(3),
                sequential: true,
                checkpoint_dir: Some("/scratch".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(config.sheets.worksheets, vec!["Sheet B".to_string()]);
        assert_eq!(config.scheduler.limit, 3);
        assert_eq!(config.scheduler.concurrency(), 1);
        assert_eq!(config.checkpoint.dir.as_deref(), Some("/scratch"));
    }

    #[test]
    fn test_validation() {
        assert!(validate(&valid_config()).is_ok());

        let mut missing_key = valid_config();
        missing_key.oracle.api_key.clear();
        assert!(matches!(
            validate(&missing_key),
            Err(ConfigError::Missing { .. })
        ));

        let mut no_creds = valid_config();
        no_creds.sheets.credentials_json = None;
        assert!(validate(&no_creds).is_err());

        let mut bad_backoff = valid_config();
        bad_backoff.rate_limit.error_delay_secs = 600;
        assert!(validate(&bad_backoff).is_err());

        let mut zero_workers = valid_config();
        zero_workers.scheduler.max_concurrent = 0;
        assert!(validate(&zero_workers).is_err());
    }

    #[test]
    fn test_credentials_json_extraction() {
        assert_eq!(
            normalize_credentials_json("  {\"a\":1}  ").as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            normalize_credentials_json("GOOGLE_CREDENTIALS_JSON={\"a\":{\"b\":2}}\n# pasted").as_deref(),
            Some("{\"a\":{\"b\":2}}")
        );
        assert_eq!(normalize_credentials_json("not json"), None);
    }
}
