//! Configuration system
//!
//! - `macros`: the `config_struct!` macro (struct + defaults in one place)
//! - `schemas`: every configuration section with its defaults
//! - `utils`: file/env/CLI merging and startup validation

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{
    CheckpointConfig, Config, FatalPolicy, LoggingConfig, OracleConfig, RateLimitConfig,
    RetryConfig, SchedulerConfig, SheetsConfig,
};
pub use utils::{load_config, load_config_from_path, normalize_credentials_json, Overrides};
