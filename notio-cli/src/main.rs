use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notio_engine::database::{self, DbPool};
use notio_engine::{
    Attachment, DeliveryLogRepository, DeliveryStatus, NotificationConfig, NotificationManager,
    NotificationMessage, SqlxDeliveryLogRepository, detect_channel,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-channel notification dispatcher", long_about = None)]
struct Args {
    /// Path to a JSON config file; the environment is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delivery log database URL (defaults to $DATABASE_URL)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Also write daily-rolling log files to this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a notification
    Send {
        /// Recipient: email address, phone number, @username, #channel, id
        recipient: String,

        /// Message title
        #[arg(short, long)]
        title: String,

        /// Message body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Channel name; detected from the recipient shape when omitted
        #[arg(short, long)]
        channel: Option<String>,

        /// Structured data entries
        #[arg(short, long = "data", value_name = "KEY=VALUE")]
        data: Vec<String>,

        /// File attachments (delivered by the email channel)
        #[arg(short, long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List channels and their configuration state
    Channels,

    /// Show recent delivery log entries
    History {
        /// Maximum number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: i64,

        /// Filter by status (pending, sent, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by channel name
        #[arg(short, long)]
        channel: Option<String>,

        /// Filter by recipient
        #[arg(short, long)]
        recipient: Option<String>,
    },

    /// Show which channel a recipient would route to
    Detect {
        /// Recipient to classify
        recipient: String,
    },
}

fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notio=info,notio_engine=info,sqlx=warn".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    match log_dir {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "notio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<NotificationConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        }
        None => Ok(NotificationConfig::from_env()),
    }
}

async fn open_database(database_url: Option<&str>) -> anyhow::Result<DbPool> {
    let database_url = match database_url {
        Some(url) => url.to_string(),
        None => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:notio.db?mode=rwc".to_string()),
    };

    let pool = database::init_pool(&database_url).await?;
    database::run_migrations(&pool).await?;
    Ok(pool)
}

fn parse_data_entries(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .with_context(|| format!("Invalid data entry '{}', expected KEY=VALUE", entry))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(args.log_dir.as_deref());

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Send {
            recipient,
            title,
            body,
            channel,
            data,
            attachments,
            json,
        } => {
            let pool = open_database(args.database_url.as_deref()).await?;
            let repository = Arc::new(SqlxDeliveryLogRepository::new(pool));
            let manager = NotificationManager::new(&config, Some(repository));

            let mut message = NotificationMessage::new(title, body);
            for (key, value) in parse_data_entries(&data)? {
                message = message.with_data_entry(key, value);
            }
            if !attachments.is_empty() {
                message = message
                    .with_attachments(attachments.into_iter().map(Attachment::new).collect());
            }

            let response = manager.send(&recipient, &message, channel.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                if response.is_failure() {
                    std::process::exit(1);
                }
            } else if response.is_success() {
                println!(
                    "sent via {} (message id: {})",
                    response.channel.as_deref().unwrap_or("unknown"),
                    response.message_id.as_deref().unwrap_or("unknown"),
                );
            } else {
                anyhow::bail!(
                    "delivery via {} failed: {}",
                    response.channel.as_deref().unwrap_or("unknown"),
                    response.error.as_deref().unwrap_or("unknown error"),
                );
            }
        }

        Command::Channels => {
            let manager = NotificationManager::new(&config, None);
            println!("default channel: {}", manager.default_channel());
            for name in manager.available_channels() {
                let adapter = manager.registry().get(name)?;
                let state = if adapter.is_configured() {
                    "configured"
                } else {
                    "not configured"
                };
                println!("{:<12} {}", name, state);
            }
        }

        Command::History {
            limit,
            status,
            channel,
            recipient,
        } => {
            let pool = open_database(args.database_url.as_deref()).await?;
            let repository = SqlxDeliveryLogRepository::new(pool);

            let status = status
                .map(|s| {
                    DeliveryStatus::parse(&s)
                        .with_context(|| format!("Unknown status '{}'", s))
                })
                .transpose()?;

            let mut logs = if let Some(recipient) = recipient.as_deref() {
                repository.list_for_recipient(recipient, limit).await?
            } else if let Some(channel) = channel.as_deref() {
                repository.list_for_channel(channel, status, limit).await?
            } else if let Some(status) = status {
                repository.list_by_status(status, limit).await?
            } else {
                repository.list_recent(limit).await?
            };

            // Recipient is the primary filter; narrow its results in memory.
            if recipient.is_some() {
                if let Some(status) = status {
                    logs.retain(|log| log.status == status.as_str());
                }
                if let Some(channel) = channel.as_deref() {
                    logs.retain(|log| log.channel.as_deref() == Some(channel));
                }
            }

            if logs.is_empty() {
                println!("no delivery log entries");
            }
            for log in logs {
                let outcome = match (&log.message_id, &log.error) {
                    (Some(id), _) => format!("id={}", id),
                    (None, Some(error)) => format!("error={}", error),
                    (None, None) => String::new(),
                };
                println!(
                    "{}  {:<7} {:<10} {:<28} {}  {}",
                    log.created_at,
                    log.status,
                    log.channel.as_deref().unwrap_or("-"),
                    log.recipient,
                    log.title,
                    outcome,
                );
            }
        }

        Command::Detect { recipient } => {
            match detect_channel(&recipient) {
                Some(channel) => println!("{}", channel),
                None => println!("{} (default)", config.default_channel),
            }
        }
    }

    Ok(())
}
