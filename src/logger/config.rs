/// Logger runtime configuration
///
/// Built once from command-line flags by `init_from_args`, readable from any
/// thread afterwards.
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,
    /// Tags with debug output enabled ("all" enables every tag)
    pub debug_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Configure levels and debug tags from --verbose/--quiet/--debug-<tag>
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if arguments::is_verbose_enabled() {
        config.min_level = LogLevel::Verbose;
    } else if arguments::is_quiet_enabled() {
        config.min_level = LogLevel::Warning;
    }

    config.debug_tags = arguments::get_debug_tags().into_iter().collect();
    if !config.debug_tags.is_empty() && config.min_level < LogLevel::Debug {
        config.min_level = LogLevel::Debug;
    }

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(config: &LoggerConfig, tag: &LogTag) -> bool {
    config.debug_tags.contains("all") || config.debug_tags.contains(&tag.to_debug_key())
}
