/// Log tags - one per subsystem
///
/// The debug key of a tag is what `--debug-<key>` enables.
use colored::{ColoredString, Colorize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Scheduler,
    RateLimit,
    Checkpoint,
    Oracle,
    Sheets,
    Summary,
}

impl LogTag {
    /// Key used by `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Scheduler => "scheduler",
            LogTag::RateLimit => "ratelimit",
            LogTag::Checkpoint => "checkpoint",
            LogTag::Oracle => "oracle",
            LogTag::Sheets => "sheets",
            LogTag::Summary => "summary",
        }
        .to_string()
    }

    /// Uncolored label used in log files
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Scheduler => "SCHEDULER",
            LogTag::RateLimit => "RATELIMIT",
            LogTag::Checkpoint => "CHECKPOINT",
            LogTag::Oracle => "ORACLE",
            LogTag::Sheets => "SHEETS",
            LogTag::Summary => "SUMMARY",
        }
        .to_string()
    }

    /// Padded, colored label for the console
    pub fn colored(&self, width: usize) -> ColoredString {
        let label = format!("{:<width$}", self.to_plain_string(), width = width);
        match self {
            LogTag::System => label.bright_yellow().bold(),
            LogTag::Config => label.bright_white().bold(),
            LogTag::Scheduler => label.bright_green().bold(),
            LogTag::RateLimit => label.bright_red().bold(),
            LogTag::Checkpoint => label.bright_blue().bold(),
            LogTag::Oracle => label.bright_magenta().bold(),
            LogTag::Sheets => label.bright_cyan().bold(),
            LogTag::Summary => label.bright_white().bold(),
        }
    }
}
