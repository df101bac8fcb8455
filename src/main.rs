//! sqleng CLI
//!
//! Runs SQL with macros against a SQLite database and prints the resulting
//! frames as JSON:
//! - Query a database
//! - Check connectivity
//! - Print the default config

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqleng::engine::{DataPluginConfiguration, DataSourceHandler, HealthStatus};
use sqleng::macros::parse_interval;
use sqleng::query::{DataQuery, Format, QueryDataRequest, TimeRange};
use sqleng::{Config, Dialect, SqliteConnection};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sqleng")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run dashboard-style SQL with time macros against a database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overrides the configured URL
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more queries
    Query {
        /// SQL statements; each becomes its own RefID (A, B, ...)
        #[arg(required = true)]
        sql: Vec<String>,
        /// Time range ending now (e.g. 1h, 7d)
        #[arg(short, long, default_value = "1h")]
        last: String,
        /// Explicit range start (RFC 3339), overrides --last
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Explicit range end (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Value for $__interval
        #[arg(short, long, default_value = "1m")]
        interval: String,
        /// Output format
        #[arg(short, long, value_enum, default_value = "time-series")]
        format: OutputFormat,
    },

    /// Check database connectivity
    Health {
        /// Show the full driver error on failure
        #[arg(long)]
        verbose: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    TimeSeries,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => Format::Table,
            OutputFormat::TimeSeries => Format::TimeSeries,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(database) = cli.database {
        config.datasource.url = database;
    }
    init_logging(&config);

    match cli.command {
        Commands::Query {
            sql,
            last,
            from,
            to,
            interval,
            format,
        } => {
            let handler = connect(&config)?;
            let range = match (from, to) {
                (Some(from), Some(to)) => TimeRange::new(from, to),
                (Some(from), None) => TimeRange::new(from, Utc::now()),
                _ => TimeRange::last(parse_interval(&last).context("invalid --last")?),
            };
            let interval = parse_interval(&interval).context("invalid --interval")?;

            let queries = sql
                .into_iter()
                .enumerate()
                .map(|(i, sql)| {
                    DataQuery::new(ref_id(i), sql, range)
                        .format(format.into())
                        .interval(interval)
                })
                .collect();

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, canceling queries");
                    ctrl_c.cancel();
                }
            });

            let response = handler
                .query_data(&QueryDataRequest::new(queries), &cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Health { verbose } => {
            let handler = connect(&config)?;
            let result = handler.check_health(verbose).await;
            println!("{}", result.message);
            if result.status == HealthStatus::Error {
                std::process::exit(1);
            }
        }

        Commands::Config { output } => {
            let content = sqleng::generate_default_config();
            if let Some(path) = output {
                std::fs::write(&path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("Config written to {:?}", path);
            } else {
                println!("{}", content);
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sqleng={}", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn connect(config: &Config) -> anyhow::Result<DataSourceHandler> {
    if config.datasource.dialect != Dialect::Sqlite {
        anyhow::bail!(
            "the sqleng binary only ships a SQLite driver, configured dialect is {}",
            config.datasource.dialect
        );
    }
    let conn = SqliteConnection::from_info(&config.datasource)
        .with_context(|| format!("opening {}", config.datasource.url))?;
    Ok(DataSourceHandler::for_dialect(
        Dialect::Sqlite,
        DataPluginConfiguration::from_config(config),
        Arc::new(conn),
    ))
}

/// A, B, ..., Z, AA, AB, ...
fn ref_id(index: usize) -> String {
    let mut n = index + 1;
    let mut id = Vec::new();
    while n > 0 {
        n -= 1;
        id.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}
