//! Bulk Fetcher CLI application
//!
//! Downloads a list of URLs in parallel into a local directory or HDFS.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use bulk_fetcher::cli::{handle_hdfs, handle_local, Cli, Commands};
use bulk_fetcher::config::{AppConfig, LoggingConfig};
use bulk_fetcher::constants::exit;
use bulk_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(category = e.category(), "{}", e);
            eprintln!("Error: {}", e);
            exit::FATAL
        }
    };

    process::exit(code);
}

/// Main application logic
async fn run() -> Result<i32> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = match AppConfig::load(cli.global.config.clone()).await {
        Ok(config) => config,
        Err(e) => {
            // Logging still has to be up for the error report in `main`
            init_logging(&cli, &LoggingConfig::default().level);
            return Err(e.into());
        }
    };

    init_logging(&cli, &config.logging.level);
    info!("Bulk Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Local => {
            info!("Executing local command");
            handle_local(&cli.global, &config).await
        }
        Commands::Hdfs(args) => {
            info!("Executing hdfs command");
            handle_hdfs(&cli.global, args, &config).await
        }
    }
}

/// Initialize logging from RUST_LOG, the verbosity flags or the config file
fn init_logging(cli: &Cli, default_level: &str) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| default_level.to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bulk_fetcher={}", level)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
