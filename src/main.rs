//! Job Push Notifier CLI
//!
//! Called by the job scheduler with the trigger name and the execution record
//! (JSON, from a file or stdin).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use job_push_notifier::{NotifierConfig, PushNotifier, PushoverChannel, SendResult};

#[derive(Parser)]
#[command(name = "jpn")]
#[command(about = "Job Push Notifier - send job execution events to Pushover")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render and send a notification
    Notify {
        #[command(flatten)]
        input: EventInput,
        /// Config file (default: ~/.config/job-push-notifier/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Application API token (overrides config and environment)
        #[arg(long)]
        app_token: Option<String>,
        /// User key (overrides config and environment)
        #[arg(long)]
        user_key: Option<String>,
        /// Render only, do not send
        #[arg(long)]
        dry_run: bool,
    },
    /// Render a notification and print it
    Render {
        #[command(flatten)]
        input: EventInput,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct EventInput {
    /// Trigger name (start, success, failure, retryablefailure, onavgduration, ...)
    #[arg(long, short)]
    trigger: String,
    /// Execution event JSON file (default: stdin)
    #[arg(long, short)]
    event: Option<PathBuf>,
}

impl EventInput {
    fn read_event(&self) -> Result<serde_json::Value> {
        let content = match &self.event {
            Some(path) => read_file(path)?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read execution event from stdin")?;
                buf
            }
        };
        serde_json::from_str(&content).context("Execution event is not valid JSON")
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_push_notifier=info,jpn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Notify {
            input,
            config,
            app_token,
            user_key,
            dry_run,
        } => {
            let mut config = NotifierConfig::load(config.as_deref())?;
            if let Some(token) = app_token {
                config.app_api_token = token;
            }
            if let Some(user) = user_key {
                config.user_id_token = user;
            }

            let execution = input.read_event()?;
            let channel = PushoverChannel::new(config.pushover())?;
            let notifier = PushNotifier::new(config.credentials(), Arc::new(channel))
                .with_dry_run(dry_run);

            match notifier.notify(Some(&input.trigger), &execution)? {
                SendResult::Sent => info!(trigger = %input.trigger, "Notification sent"),
                SendResult::Skipped(reason) => {
                    info!(trigger = %input.trigger, %reason, "Notification skipped")
                }
                SendResult::Failed(reason) => {
                    error!(trigger = %input.trigger, error = %reason, "Notification not sent");
                    std::process::exit(1);
                }
            }
        }
        Commands::Render { input, json } => {
            let execution = input.read_event()?;
            let event = job_push_notifier::normalize(&execution)?;
            let rendered = job_push_notifier::render(Some(&input.trigger), &event);

            if json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!("{}", rendered.title);
                println!("priority: {}", rendered.priority);
                println!();
                println!("{}", rendered.body);
            }
        }
    }

    Ok(())
}
