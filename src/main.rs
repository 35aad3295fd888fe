use anyhow::Context;
use tokio::sync::watch;
use walletscout::{
    arguments::{self, print_help},
    config,
    logger::{self, LogTag},
    paths, run,
};

/// Exit status after Ctrl-C, as shells report for SIGINT
const EXIT_INTERRUPTED: i32 = 130;

/// Exit status when at least one worksheet could not be processed
const EXIT_WORKSHEETS_SKIPPED: i32 = 2;

#[tokio::main]
async fn main() {
    // .env values land in the process environment; real env vars win
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init();

    if arguments::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "🚀 walletscout starting up...");
    if dotenv_loaded {
        logger::debug(LogTag::Config, "Loaded .env file");
    }

    let code = match run_app().await {
        Ok(code) => code,
        Err(e) => {
            logger::error(LogTag::System, &format!("❌ {:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(code);
}

async fn run_app() -> anyhow::Result<i32> {
    let overrides = arguments::get_config_overrides().map_err(anyhow::Error::msg)?;
    let config = config::load_config(&overrides).context("Invalid configuration")?;

    if config.logging.file_logging && !arguments::is_file_logging_disabled() {
        let dir = paths::get_logs_directory(config.logging.log_dir.as_deref());
        match logger::init_file_logging(&dir) {
            Ok(path) => logger::info(
                LogTag::System,
                &format!("📝 Logging to {}", path.display()),
            ),
            Err(e) => logger::warning(
                LogTag::System,
                &format!("File logging disabled: {}", e),
            ),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        if *shutdown_tx.borrow() {
            // Second Ctrl-C: stop waiting for in-flight work
            logger::flush();
            std::process::exit(EXIT_INTERRUPTED);
        }
        logger::warning(
            LogTag::System,
            "🛑 Ctrl-C received, finishing up (press again to force quit)",
        );
        let _ = shutdown_tx.send(true);
    })
    .context("Failed to install Ctrl-C handler")?;

    let outcome = run::run(config, shutdown_rx).await?;

    if outcome.interrupted {
        logger::warning(
            LogTag::System,
            "⚠️ Run interrupted. Progress is saved; run again to resume.",
        );
        return Ok(EXIT_INTERRUPTED);
    }

    if !outcome.skipped_worksheets.is_empty() {
        for (name, reason) in &outcome.skipped_worksheets {
            logger::warning(
                LogTag::System,
                &format!("⚠️ Worksheet '{}' was skipped: {}", name, reason),
            );
        }
        return Ok(EXIT_WORKSHEETS_SKIPPED);
    }

    logger::info(LogTag::System, "✅ All worksheets processed");
    Ok(0)
}
