use clap::Parser;

use crate::storypark::endpoints::DEFAULT_BASE_URL;
use crate::storypark::session::DEFAULT_TIMEOUT;
use crate::types::LogLevel;

/// Every option can also be set through the environment variable named in
/// its help text, which is how the tool is usually run (cron, containers).
#[derive(Parser, Debug)]
#[command(
    name = "storypark-sync",
    version,
    about = "Mirror a child's Storypark stories and media to local storage"
)]
pub struct Cli {
    /// Storypark child ID whose stories are downloaded
    #[arg(short = 'c', long, env = "CHILDID")]
    pub child_id: Option<String>,

    /// Storypark account email address
    #[arg(short = 'u', long, env = "UNAME")]
    pub username: Option<String>,

    /// Storypark password.
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the PASSWORD environment variable instead.
    #[arg(short = 'p', long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output directory [default: `stories` next to the executable]
    #[arg(short = 'd', long, env = "ROOTPATH")]
    pub root_path: Option<String>,

    /// Storypark origin, for staging hosts or local testing
    #[arg(long, env = "BASEURL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log level (overridden by RUST_LOG when set)
    #[arg(long, env = "LOGLEVEL", value_enum, ignore_case = true, default_value = "info")]
    pub log_level: LogLevel,

    /// Per-request timeout in seconds
    #[arg(long, env = "TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Retries for transient failures (timeouts, 429, 5xx) per request
    #[arg(long, env = "MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay in seconds for exponential retry backoff
    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = 5)]
    pub retry_delay: u64,

    /// Print the child's story IDs and exit without downloading
    #[arg(long)]
    pub list_stories: bool,
}
