use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryConfig;
use crate::types::ChildId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} must be provided with --{flag} or the {env} environment variable")]
    Missing {
        what: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("cannot locate the program directory for the default download path: {0}")]
    NoProgramDir(#[source] std::io::Error),

    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Validated run configuration.
pub struct Config {
    pub child_id: ChildId,
    pub username: String,
    pub password: String,
    pub root_path: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub list_stories: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("child_id", &self.child_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("root_path", &self.root_path)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Treat unset and blank settings alike.
fn required(
    value: Option<String>,
    what: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { what, flag, env })
}

/// `stories` beside the running executable.
fn default_root_path() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::NoProgramDir)?;
    let dir = exe.parent().ok_or_else(|| {
        ConfigError::NoProgramDir(std::io::Error::other("executable path has no parent"))
    })?;
    Ok(dir.join("stories"))
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> Result<Self, ConfigError> {
        let child_id = required(cli.child_id, "A child ID", "child-id", "CHILDID")?;
        let username = required(cli.username, "A username", "username", "UNAME")?;
        let password = required(cli.password, "A password", "password", "PASSWORD")?;

        if cli.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let root_path = match cli.root_path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => {
                let path = expand_tilde(p);
                tracing::info!("Using download path {}", path.display());
                path
            }
            _ => {
                let path = default_root_path()?;
                tracing::warn!(
                    "No download path specified in ROOTPATH, using {}",
                    path.display()
                );
                path
            }
        };

        Ok(Self {
            child_id: ChildId::new(child_id.trim()),
            username,
            password,
            root_path,
            base_url: cli.base_url,
            timeout: Duration::from_secs(cli.timeout_secs),
            retry: RetryConfig {
                max_retries: cli.max_retries,
                base_delay_secs: cli.retry_delay,
                ..RetryConfig::default()
            },
            list_stories: cli.list_stories,
        })
    }
}
