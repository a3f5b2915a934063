//! `mailbridge` - sends one email described by a JSON command on stdin.
//!
//! ```text
//! echo '{"subject":"Report","body":"<p>Done</p>","recipients":"ops@bob.com","delimiter":";"}' \
//!     | mailbridge [appsettings.json]
//! ```
//!
//! Settings come from the given file (or `<config dir>/mailbridge/appsettings.json`
//! when present), overridden by `MAILBRIDGE_Smtp__*` environment variables.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use mailbridge_core::{
    EnvConfig, JsonConfig, LayeredConfig, Mailer, SendEmailCommand, SendEmailHandler,
    SmtpTransport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "MAILBRIDGE_";

/// Limit for connecting and for each SMTP round-trip.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailbridge=info,mailbridge_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(
        explicit.as_deref(),
        default_config_path().as_deref(),
        EnvConfig::with_prefix(ENV_PREFIX),
    )?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read command from stdin")?;
    let command: SendEmailCommand =
        serde_json::from_str(&input).context("Invalid send-email command")?;

    let mailer = Mailer::new(
        Arc::new(config),
        SmtpTransport::new().with_timeout(SMTP_TIMEOUT),
    );
    SendEmailHandler::new(mailer)
        .handle(command)
        .await
        .context("Failed to send email")?;

    info!("Done");
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mailbridge").join("appsettings.json"))
}

/// Builds the configuration stack: JSON file first, `env` on top.
///
/// An explicit path must exist; the default path is skipped when absent.
fn load_config(
    explicit: Option<&Path>,
    default: Option<&Path>,
    env: EnvConfig,
) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::new();

    let file = match explicit {
        Some(path) => Some(path),
        None => default.filter(|path| path.exists()),
    };
    if let Some(path) = file {
        let json = JsonConfig::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        debug!(path = %path.display(), "Loaded settings file");
        config = config.with_source(json);
    }

    Ok(config.with_source(env))
}
