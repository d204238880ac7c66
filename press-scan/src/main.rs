//! press-scan - Repost sales announcements from monitored Bluesky accounts
//!
//! Runs a single scan pass and exits; schedule repeated invocations externally.

use clap::Parser;
use libpressbot::config::BlueskyConfig;
use libpressbot::logging::{LogFormat, LoggingConfig};
use libpressbot::platforms::bluesky::BlueskyClient;
use libpressbot::{run_once, Config, Result, RunOptions, SeenStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "press-scan")]
#[command(version)]
#[command(about = "Repost sales announcements from monitored Bluesky accounts")]
#[command(long_about = "\
press-scan - Repost sales announcements from monitored Bluesky accounts

DESCRIPTION:
    press-scan reads the members of a Bluesky list, fetches each member's
    recent posts, and reposts the ones that mention a sales keyword. Post
    identifiers already evaluated are remembered in a JSON state file so
    nothing is reposted twice across runs.

    Each invocation performs one pass and exits. Run it from cron or a CI
    schedule, keeping the state file between runs.

CONFIGURATION (environment):
    BLUESKY_USERNAME            Login handle (required)
    BLUESKY_PASSWORD            App password (required)
    UNIVERSITY_PRESS_LIST_URI   AT URI of the monitored list (required)
    SALES_KEYWORDS              Comma-separated keywords
                                (default: sale,discount,offer,special,promotion,deal)
    BLUESKY_SERVICE             Service URL (default: https://bsky.social)
    PRESSBOT_STATE_FILE         Seen-post file (default: data/processed_posts.json)
    PRESSBOT_CONFIG             Optional TOML file with a [policy] table
    PRESSBOT_HIGH_WATER_MARK    Seen-set size that triggers trimming (default: 10000)
    PRESSBOT_EVICT_BATCH        Oldest entries dropped per trim (default: 5000)
    PRESSBOT_POSTS_PER_ACCOUNT  Recent posts fetched per account (default: 20)
    PRESSBOT_LIST_PAGE_LIMIT    List members fetched (default: 100)
    PRESSBOT_ACCOUNT_DELAY      Pause between accounts (default: 1s)

EXIT CODES:
    0 - Run completed (individual account failures are logged only)
    1 - Configuration error or fatal run error
    2 - Authentication failed
")]
struct Cli {
    /// Seen-post state file (overrides PRESSBOT_STATE_FILE)
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Log output format (text, json, or pretty)
    #[arg(long, env = "PRESSBOT_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Log level filter (e.g. info, debug, libpressbot=trace)
    #[arg(long, env = "PRESSBOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(cli.log_format, cli.log_level.clone(), cli.verbose).init();

    // Run the main logic and handle errors
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(path) = cli.state_file {
        config.state_file = path;
    }

    let store = SeenStore::new(config.state_file.clone());
    let options = RunOptions::from(&config);

    let BlueskyConfig {
        username,
        password,
        service,
    } = config.bluesky;
    let mut client = BlueskyClient::new(&service, username, password)?;

    let report = run_once(&mut client, &store, &options).await?;
    if !report.failures.is_empty() {
        info!(
            "Skipped accounts: {}",
            report
                .failures
                .iter()
                .map(|f| f.handle.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}
