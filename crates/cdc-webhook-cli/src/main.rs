//! cdc-webhook - operator tool for the CDC webhook trigger engine
//!
//! Registers, inspects and drops webhook triggers and performs manual test
//! firings against the configured metadata database.

mod commands;
mod utils;

use cdc_webhook_core::CdcConfig;
use cdc_webhook_engine::{TriggerExecutor, TriggerRegistry, WebhookDispatcher};
use cdc_webhook_metadata::MetadataStore;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::CommandContext;

#[derive(Parser)]
#[command(name = "cdc-webhook")]
#[command(version = cdc_webhook_core::VERSION)]
#[command(about = "Manage CDC webhook triggers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Metadata database URL
    #[arg(long, global = true, env = "CDC_WEBHOOK_DATABASE_URL")]
    database_url: Option<String>,

    /// Schema assumed when a trigger or table reference omits one
    #[arg(long, global = true, env = "CDC_WEBHOOK_DEFAULT_SCHEMA")]
    default_schema: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CDC_WEBHOOK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true, env = "CDC_WEBHOOK_LOG_FORMAT")]
    log_format: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Register (or replace) a trigger
    Register(commands::register::RegisterArgs),

    /// Drop a trigger and its credentials
    Drop {
        /// Trigger as [schema.]table.name
        trigger: String,
    },

    /// List triggers, optionally for one table
    List {
        /// Table as [schema.]table
        table: Option<String>,
    },

    /// Show the inspectable definition of a trigger
    Show {
        /// Trigger as [schema.]table.name
        trigger: String,
    },

    /// Show the stored endpoint of a PRIVATE trigger
    Credentials {
        /// Trigger as [schema.]table.name
        trigger: String,

        /// Print the URL and header values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Replace the endpoint of a PRIVATE trigger
    Rotate {
        /// Trigger as [schema.]table.name
        trigger: String,

        /// New webhook URL
        #[arg(long)]
        url: String,

        /// Header as "Name: value" (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// Fire a trigger once with a hand-written row change
    Fire(commands::fire::FireArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        CdcConfig::from_file(config_path)?
    } else {
        CdcConfig::from_env()
    };

    // Override with CLI args
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(schema) = cli.default_schema {
        config.registry.default_schema = schema;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_logging(&config);

    let store = MetadataStore::connect(&config.database).await?;
    let registry = TriggerRegistry::from_config(Arc::new(store), &config.registry);
    let dispatcher = WebhookDispatcher::http(&config.dispatch)?;

    let ctx = CommandContext {
        executor: TriggerExecutor::new(registry, dispatcher),
        output_format: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Register(args) => commands::register::execute(&ctx, args).await,
        Commands::Drop { trigger } => commands::drop::execute(&ctx, &trigger).await,
        Commands::List { table } => commands::list::execute(&ctx, table.as_deref()).await,
        Commands::Show { trigger } => commands::show::execute(&ctx, &trigger).await,
        Commands::Credentials { trigger, reveal } => {
            commands::credentials::show(&ctx, &trigger, reveal).await
        }
        Commands::Rotate {
            trigger,
            url,
            headers,
        } => commands::credentials::rotate(&ctx, &trigger, url, &headers).await,
        Commands::Fire(args) => commands::fire::execute(&ctx, args).await,
    }
}

fn init_logging(config: &CdcConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
