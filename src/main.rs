//! Neurodiss CLI - serve and inspect the study dissociation service

use clap::{Parser, Subcommand};
use neurodiss::config::{self, DatabaseUrl, ServiceConfig};
use neurodiss::query::{self, DiagnosticFailure};
use neurodiss::storage::{schema, ConnectionPool, ConnectionProvider};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "neurodiss")]
#[command(version)]
#[command(about = "Dissociation queries over neuroimaging study terms and coordinates")]
#[command(long_about = r#"
Neurodiss serves read-only queries over study metadata, term annotations and
activation coordinates:
  • Studies with term A but not term B
  • Studies near location A but not near location B
  • Store diagnostics

The connection string is read from DB_URL (or DATABASE_URL), e.g.
  DB_URL=sqlite:///var/lib/neurodiss/ns.db neurodiss serve --port 5000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Connection string (overrides config file, not the environment)
        #[arg(short, long)]
        database: Option<String>,

        /// Image served at /img
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Report store reachability, row counts and samples
    Diagnose {
        /// Connection string (overrides config file, not the environment)
        #[arg(short, long)]
        database: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create the relations in an empty development database
    InitSchema {
        /// Connection string
        #[arg(short, long)]
        database: Option<String>,
    },
}

fn with_database(mut config: ServiceConfig, database: Option<String>) -> ServiceConfig {
    if database.is_some() {
        config.database_url = database;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Serve { port, bind, database, image } => {
            let mut config = with_database(config, database);
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(image) = image {
                config.image_path = image;
            }
            neurodiss::server::start_server(&config).await?;
        }

        Commands::Diagnose { database, format } => {
            let config = with_database(config, database);
            let provider = ConnectionProvider::new(config);

            let outcome = tokio::task::spawn_blocking(move || {
                provider.pool()?.read_scope(query::run_probes)
            })
            .await?;

            match outcome {
                Ok(report) if format == "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?)
                }
                Ok(report) => neurodiss::ui::print_report(&report),
                Err(e) => {
                    let failure = DiagnosticFailure::new(&e);
                    if format == "json" {
                        println!("{}", serde_json::to_string_pretty(&failure)?);
                    } else {
                        neurodiss::ui::print_failure(&failure);
                    }
                    std::process::exit(1);
                }
            }
        }

        Commands::InitSchema { database } => {
            let config = with_database(config, database);
            let raw = config
                .database_url()
                .ok_or_else(|| anyhow::anyhow!(config::MISSING_DATABASE_URL))?;
            let url = DatabaseUrl::parse(&raw)?;

            let mut options = config.pool_options();
            options.create_if_missing = true;
            options.max_size = 1;

            tracing::info!("Creating schema in {}", url);
            let pool = ConnectionPool::open(url, options)?;
            let conn = pool.get()?;
            schema::initialize(&conn)?;
            println!("✅ Schema ready in {}", pool.url());
        }
    }

    Ok(())
}
